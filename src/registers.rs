//! DS1302 register map and the clock burst frame codec.
//!
//! Every clock register holds a BCD digit pair, tens in the high nibble and
//! ones in the low nibble. Spare high bits carry flags (clock halt, 12/24 hour
//! mode, AM/PM, write protect) or read back as zero.

// Command bytes for the clock registers. Bit 7 is always set and bit 0 is the
// read bit, so these are the write commands and `| READ_BIT` gives the reads.
pub const SECONDS: u8 = 0x80;
pub const MINUTES: u8 = 0x82;
pub const HOURS: u8 = 0x84;
pub const DATE: u8 = 0x86;
pub const MONTH: u8 = 0x88;
pub const DAY: u8 = 0x8A;
pub const YEAR: u8 = 0x8C;
pub const CONTROL: u8 = 0x8E; // WriteProtection bit7 = 0 to enable write.
pub const TRICKLE: u8 = 0x90;

pub const CLOCK_BURST_WRITE: u8 = 0xBE;
pub const CLOCK_BURST_READ: u8 = 0xBF;

pub const READ_BIT: u8 = 0x01;

/// Seconds, minutes, hour, date, month, day, year, control.
pub const CLOCK_BURST_LEN: usize = 8;

/// Bit 7 of the seconds register. Set means the oscillator is stopped.
pub const CLOCK_HALT: u8 = 0x80;
/// Bit 7 of the control register.
pub const WRITE_PROTECT: u8 = 0x80;
/// Bit 7 of the hour register. Set selects the 12 hour layout.
pub const HOUR_12: u8 = 0x80;
/// Bit 5 of the hour register in the 12 hour layout.
pub const HOUR_PM: u8 = 0x20;

// Width of the tens digit per register.
const SECONDS_TENS: u8 = 0x07;
const MINUTES_TENS: u8 = 0x07;
const HOUR_24_TENS: u8 = 0x03;
const HOUR_12_TENS: u8 = 0x01;
const DATE_TENS: u8 = 0x03;
const MONTH_TENS: u8 = 0x01;
const YEAR_TENS: u8 = 0x0F;
const WEEKDAY_MASK: u8 = 0x07;

pub fn bcd_to_binary(tens: u8, ones: u8) -> u8 {
    tens.wrapping_mul(10).wrapping_add(ones)
}

/// Tens digit of `val`. No range check: values above 99 give a tens digit
/// that does not fit a nibble and is truncated when packed.
pub fn bcd_tens(val: u8) -> u8 {
    val / 10
}

pub fn bcd_ones(val: u8) -> u8 {
    val % 10
}

/// A BCD digit pair as stored in one register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bcd {
    pub tens: u8,
    pub ones: u8,
}

impl Bcd {
    pub fn from_binary(val: u8) -> Self {
        Bcd {
            tens: bcd_tens(val),
            ones: bcd_ones(val),
        }
    }

    pub fn to_binary(self) -> u8 {
        bcd_to_binary(self.tens, self.ones)
    }

    fn unpack(byte: u8, tens_mask: u8) -> Self {
        Bcd {
            tens: (byte >> 4) & tens_mask,
            ones: byte & 0x0F,
        }
    }

    fn pack(self, tens_mask: u8) -> u8 {
        ((self.tens & tens_mask) << 4) | (self.ones & 0x0F)
    }
}

/// The hour register. Both layouts share one byte and bit 7 picks one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HourField {
    /// 0-23, two bits of tens.
    TwentyFourHour(Bcd),
    /// 1-12, one bit of tens, bit 5 is PM.
    TwelveHour { hour: Bcd, pm: bool },
}

impl Default for HourField {
    fn default() -> Self {
        HourField::TwentyFourHour(Bcd::default())
    }
}

impl From<u8> for HourField {
    fn from(byte: u8) -> Self {
        if byte & HOUR_12 != 0 {
            HourField::TwelveHour {
                hour: Bcd::unpack(byte, HOUR_12_TENS),
                pm: byte & HOUR_PM != 0,
            }
        } else {
            HourField::TwentyFourHour(Bcd::unpack(byte, HOUR_24_TENS))
        }
    }
}

impl From<HourField> for u8 {
    fn from(hour: HourField) -> Self {
        match hour {
            HourField::TwentyFourHour(h) => h.pack(HOUR_24_TENS),
            HourField::TwelveHour { hour, pm } => {
                hour.pack(HOUR_12_TENS) | HOUR_12 | if pm { HOUR_PM } else { 0 }
            }
        }
    }
}

/// The eight byte clock burst, unpacked into its fields.
///
/// Reserved bits are dropped on unpack and written as zero on pack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterFrame {
    pub seconds: Bcd,
    pub clock_halt: bool,
    pub minutes: Bcd,
    pub hour: HourField,
    pub date: Bcd,
    pub month: Bcd,
    /// 1-7, which day is 1 is up to the user. Not validated by the chip.
    pub weekday: u8,
    pub year: Bcd,
    pub write_protect: bool,
}

impl RegisterFrame {
    pub fn from_bytes(data: &[u8; CLOCK_BURST_LEN]) -> Self {
        RegisterFrame {
            seconds: Bcd::unpack(data[0], SECONDS_TENS),
            clock_halt: data[0] & CLOCK_HALT != 0,
            minutes: Bcd::unpack(data[1], MINUTES_TENS),
            hour: HourField::from(data[2]),
            date: Bcd::unpack(data[3], DATE_TENS),
            month: Bcd::unpack(data[4], MONTH_TENS),
            weekday: data[5] & WEEKDAY_MASK,
            year: Bcd::unpack(data[6], YEAR_TENS),
            write_protect: data[7] & WRITE_PROTECT != 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; CLOCK_BURST_LEN] {
        [
            self.seconds.pack(SECONDS_TENS) | if self.clock_halt { CLOCK_HALT } else { 0 },
            self.minutes.pack(MINUTES_TENS),
            u8::from(self.hour),
            self.date.pack(DATE_TENS),
            self.month.pack(MONTH_TENS),
            self.weekday & WEEKDAY_MASK,
            self.year.pack(YEAR_TENS),
            if self.write_protect { WRITE_PROTECT } else { 0 },
        ]
    }
}
