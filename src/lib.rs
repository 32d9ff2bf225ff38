//! Driver for the DS1302 trickle-charge timekeeping chip.
//!
//! The DS1302 talks over a 3-wire bus of its own (chip enable, serial clock,
//! bidirectional I/O), so the bus is bit-banged from three GPIOs:
//!
//! ```ignore
//! use ds1302_rtc::{BitBangDs1302, CalendarRecord, Ds1302};
//!
//! // `io` must implement `IoLine`, `sclk` and `ce` are plain output pins.
//! let bus = BitBangDs1302::new(io, sclk, ce, delay);
//! let mut rtc = Ds1302::new(bus);
//!
//! rtc.set_time(&CalendarRecord {
//!     second: 0,
//!     minute: 30,
//!     hour: 14,
//!     weekday: 4,
//!     day: 5,
//!     month: 3,
//!     year: 53, // 2023, years count from 1970
//! })?;
//! let now = rtc.get_time()?;
//! ```
//!
//! Not covered: the 31 bytes of battery backed RAM and trickle charger
//! configuration (the charger is switched off whenever the time is set).

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod calendar;
pub mod ds1302;
pub mod ds1302_bitbang;
pub mod registers;

pub use calendar::{CalendarRecord, Field};
pub use ds1302::{Ds1302, Error};
pub use ds1302_bitbang::{BitBangDs1302, BusDs1302, IoLine};
pub use registers::{HourField, RegisterFrame};
