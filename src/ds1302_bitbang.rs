//! Bit-banged transport for the DS1302 3-wire bus.
//!
//! The bus is not SPI, not I2C and not 1-Wire: one bidirectional I/O line,
//! a serial clock and a chip-enable line (called /RST on older datasheets).
//! Every byte is shifted LSB first. The chip samples I/O on the rising clock
//! edge and drives I/O after the falling edge when it is being read.
//!
//! All delays below are datasheet minimums at 2V. Faster hosts must keep them.

use embedded_hal_1::delay::DelayNs;
use embedded_hal_1::digital::{InputPin, OutputPin, PinState};

use crate::registers::{CLOCK_BURST_LEN, CLOCK_BURST_READ, CLOCK_BURST_WRITE, READ_BIT};

/// CE high to first clock edge (tCC).
pub const T_CC_US: u32 = 4;
/// CE inactive time between two transfers (tCWH).
pub const T_CWH_US: u32 = 4;
/// Clock high and clock low time (tCH, tCL). Also covers tDC and tCDD.
pub const T_HALF_CLOCK_US: u32 = 1;

/// The bidirectional data line.
///
/// A pin that can be driven and sampled, and switched between the two at
/// runtime (a "flex" pin on most HALs).
pub trait IoLine: OutputPin + InputPin {
    fn set_as_output(&mut self) -> Result<(), Self::Error>;
    fn set_as_input(&mut self) -> Result<(), Self::Error>;
}

/// Bus trait that _only_ supports the bus operations of the RTC chip DS1302.
/// Implementors are expected to hold CE high for the whole of one call, and
/// low between calls.
pub trait BusDs1302 {
    type Error;

    /// Issues a write command on the bus.
    /// First byte of `write` is expected to be a command byte.
    fn cmd_write(&mut self, write: &[u8]) -> Result<(), Self::Error>;

    /// Issues a read command on the bus.
    /// `cmd` is the 8 bit command byte, `read` receives the response of the
    /// device. Works for single byte reads and burst mode (`read.len() == 8`
    /// for the clock).
    fn cmd_read(&mut self, cmd: u8, read: &mut [u8]) -> Result<(), Self::Error>;

    /// Reads one register. The read bit of `address` is forced on.
    fn read_register(&mut self, address: u8) -> Result<u8, Self::Error> {
        let mut data = [0u8];
        self.cmd_read(address | READ_BIT, &mut data)?;
        Ok(data[0])
    }

    /// Writes one register. The read bit of `address` is forced off.
    fn write_register(&mut self, address: u8, data: u8) -> Result<(), Self::Error> {
        self.cmd_write(&[address & !READ_BIT, data])
    }

    /// Reads the eight clock registers in one burst.
    ///
    /// The chip copies the clock into a latch when the command arrives, so the
    /// frame cannot tear across a rollover.
    fn burst_read_clock(&mut self) -> Result<[u8; CLOCK_BURST_LEN], Self::Error> {
        let mut frame = [0u8; CLOCK_BURST_LEN];
        self.cmd_read(CLOCK_BURST_READ, &mut frame)?;
        Ok(frame)
    }

    /// Writes the eight clock registers in one burst.
    fn burst_write_clock(&mut self, frame: &[u8; CLOCK_BURST_LEN]) -> Result<(), Self::Error> {
        let mut write = [0u8; CLOCK_BURST_LEN + 1];
        write[0] = CLOCK_BURST_WRITE;
        write[1..].copy_from_slice(frame);
        self.cmd_write(&write)
    }
}

impl<T: BusDs1302 + ?Sized> BusDs1302 for &mut T {
    type Error = T::Error;

    fn cmd_write(&mut self, write: &[u8]) -> Result<(), Self::Error> {
        T::cmd_write(self, write)
    }

    fn cmd_read(&mut self, cmd: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        T::cmd_read(self, cmd, read)
    }
}

/// DS1302 bus driven from three GPIOs and a microsecond delay.
pub struct BitBangDs1302<IO, CLK, CE, D> {
    io: IO,
    clk: CLK,
    ce: CE,
    delay: D,
}

impl<IO, CLK, CE, D, E> BitBangDs1302<IO, CLK, CE, D>
where
    IO: IoLine<Error = E>,
    CLK: OutputPin<Error = E>,
    CE: OutputPin<Error = E>,
    D: DelayNs,
{
    /// No pin setup happens here; `start` configures the pins on every
    /// transfer. The chip has internal pull-downs on CE and SCLK, so floating
    /// pins keep it disabled until then.
    pub fn new(io: IO, clk: CLK, ce: CE, delay: D) -> Self {
        Self { io, clk, ce, delay }
    }

    pub fn release(self) -> (IO, CLK, CE, D) {
        (self.io, self.clk, self.ce, self.delay)
    }

    /// Start condition. CE low, clock low, I/O as output, then CE high.
    pub fn start(&mut self) -> Result<(), E> {
        self.ce.set_low()?;
        self.clk.set_low()?;
        self.io.set_as_output()?;
        self.ce.set_high()?;
        self.delay.delay_us(T_CC_US);
        Ok(())
    }

    /// Stop condition. CE low and hold for tCWH.
    pub fn stop(&mut self) -> Result<(), E> {
        self.ce.set_low()?;
        self.delay.delay_us(T_CWH_US);
        Ok(())
    }

    /// Shifts one bit out. With `release` the I/O line goes to input while the
    /// clock is still high and the clock is left high; the chip starts
    /// driving I/O on the next falling edge.
    pub fn transfer_bit(&mut self, bit: bool, release: bool) -> Result<(), E> {
        self.io.set_state(PinState::from(bit))?;
        self.delay.delay_us(T_HALF_CLOCK_US);

        self.clk.set_high()?;
        self.delay.delay_us(T_HALF_CLOCK_US);

        if release {
            self.io.set_as_input()?;
        } else {
            self.clk.set_low()?;
            self.delay.delay_us(T_HALF_CLOCK_US);
        }
        Ok(())
    }

    /// Clocks one bit in. Expects the clock high, as left by a releasing
    /// `transfer_bit` or a previous `read_bit`.
    pub fn read_bit(&mut self) -> Result<bool, E> {
        self.clk.set_high()?;
        self.delay.delay_us(T_HALF_CLOCK_US);

        self.clk.set_low()?;
        self.delay.delay_us(T_HALF_CLOCK_US);

        self.io.is_high()
    }

    pub fn write_byte(&mut self, byte: u8, release: bool) -> Result<(), E> {
        for i in 0..8 {
            self.transfer_bit(byte & (1 << i) != 0, release && i == 7)?;
        }
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, E> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    /// Shifts out `write` without releasing the line. CE must already be high.
    pub fn write(&mut self, write: &[u8]) -> Result<(), E> {
        for b in write {
            self.write_byte(*b, false)?;
        }
        Ok(())
    }

    /// Shifts out `cmd`, releases the line and reads `read.len()` bytes.
    /// CE must already be high.
    pub fn read(&mut self, cmd: u8, read: &mut [u8]) -> Result<(), E> {
        self.write_byte(cmd, true)?;
        for b in read.iter_mut() {
            *b = self.read_byte()?;
        }
        Ok(())
    }
}

impl<IO, CLK, CE, D, E> BusDs1302 for BitBangDs1302<IO, CLK, CE, D>
where
    IO: IoLine<Error = E>,
    CLK: OutputPin<Error = E>,
    CE: OutputPin<Error = E>,
    D: DelayNs,
{
    type Error = E;

    fn cmd_write(&mut self, write: &[u8]) -> Result<(), E> {
        trace!("cmd write {:?}", write);
        self.start()?;
        let result = self.write(write);
        // CE goes low even when a pin failed halfway.
        let stopped = self.stop();
        result.and(stopped)
    }

    fn cmd_read(&mut self, cmd: u8, read: &mut [u8]) -> Result<(), E> {
        self.start()?;
        let result = self.read(cmd, read);
        let stopped = self.stop();
        result.and(stopped)?;
        trace!("cmd read {:#x} -> {:?}", cmd, read);
        Ok(())
    }
}
