//! DS1302 RTC driver.
//!
//! Talks to the chip through any [`BusDs1302`], usually the bit-banged
//! [`BitBangDs1302`](crate::BitBangDs1302). Whole-clock reads and writes use
//! burst mode so no digit can roll over between two registers.

use crate::calendar::{self, CalendarRecord, Field};
use crate::ds1302_bitbang::BusDs1302;
use crate::registers::{RegisterFrame, CLOCK_HALT, CONTROL, SECONDS, TRICKLE, WRITE_PROTECT};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// A pin operation failed.
    Bus(E),
    /// A calendar field does not fit the chip's registers.
    OutOfRange(Field),
}

impl<E> From<Field> for Error<E> {
    fn from(field: Field) -> Self {
        Error::OutOfRange(field)
    }
}

pub struct Ds1302<BUS> {
    bus: BUS,
}

impl<BUS> Ds1302<BUS>
where
    BUS: BusDs1302,
{
    pub fn new(bus: BUS) -> Self {
        Ds1302 { bus }
    }

    pub fn release(self) -> BUS {
        self.bus
    }

    /// True for every constructed driver. There is no presence detection on
    /// this bus; an absent chip reads as all zeros or all ones.
    pub fn present(&self) -> bool {
        true
    }

    /// Reads the eight clock registers in one burst.
    pub fn read_frame(&mut self) -> Result<RegisterFrame, Error<BUS::Error>> {
        let data = self.bus.burst_read_clock().map_err(Error::Bus)?;
        trace!("{}, {}, {}, {}, {}, {}, {}, {}", data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7]);
        Ok(RegisterFrame::from_bytes(&data))
    }

    /// Current time. Does not look at the clock halt bit: a halted or never
    /// set clock is returned as it reads.
    pub fn get_time(&mut self) -> Result<CalendarRecord, Error<BUS::Error>> {
        let frame = self.read_frame()?;
        Ok(calendar::decode(&frame))
    }

    /// Sets the clock and starts it.
    ///
    /// Write protect is cleared and the trickle charger switched off before
    /// the burst write. Nothing is sent if a field is out of range.
    pub fn set_time(&mut self, time: &CalendarRecord) -> Result<(), Error<BUS::Error>> {
        let frame = calendar::encode(time).map_err(|field| {
            warn!("rejected {:?} in {:?}", field, time);
            field
        })?;
        debug!("set time {:?}", time);

        self.enable_write()?;
        self.bus.write_register(TRICKLE, 0x00).map_err(Error::Bus)?;
        self.bus
            .burst_write_clock(&frame.to_bytes())
            .map_err(Error::Bus)
    }

    /// Seconds since 1970, the clock taken as UTC.
    pub fn get(&mut self) -> Result<i64, Error<BUS::Error>> {
        let time = self.get_time()?;
        Ok(time.to_unix_timestamp()?)
    }

    pub fn set(&mut self, timestamp: i64) -> Result<(), Error<BUS::Error>> {
        let time = CalendarRecord::from_unix_timestamp(timestamp)?;
        self.set_time(&time)
    }

    /// Stops the oscillator by setting the clock halt bit. The seconds digits
    /// are kept.
    pub fn halt(&mut self) -> Result<(), Error<BUS::Error>> {
        self.update_seconds(|s| s | CLOCK_HALT)?;
        info!("clock halted");
        Ok(())
    }

    /// Restarts the oscillator from the stored time.
    pub fn resume(&mut self) -> Result<(), Error<BUS::Error>> {
        self.update_seconds(|s| s & !CLOCK_HALT)?;
        info!("clock resumed");
        Ok(())
    }

    pub fn is_halted(&mut self) -> Result<bool, Error<BUS::Error>> {
        let seconds = self.bus.read_register(SECONDS).map_err(Error::Bus)?;
        Ok(seconds & CLOCK_HALT != 0)
    }

    pub fn set_write_protect(&mut self, protect: bool) -> Result<(), Error<BUS::Error>> {
        let control = if protect { WRITE_PROTECT } else { 0 };
        self.bus.write_register(CONTROL, control).map_err(Error::Bus)
    }

    pub fn is_write_protected(&mut self) -> Result<bool, Error<BUS::Error>> {
        let control = self.bus.read_register(CONTROL).map_err(Error::Bus)?;
        Ok(control & WRITE_PROTECT != 0)
    }

    fn enable_write(&mut self) -> Result<(), Error<BUS::Error>> {
        self.set_write_protect(false)
    }

    fn update_seconds(&mut self, f: impl FnOnce(u8) -> u8) -> Result<(), Error<BUS::Error>> {
        self.enable_write()?;
        let seconds = self.bus.read_register(SECONDS).map_err(Error::Bus)?;
        self.bus
            .write_register(SECONDS, f(seconds))
            .map_err(Error::Bus)
    }
}
