//! Mapping between the chip's register frame and a host calendar record.
//!
//! The host counts years from 1970, the chip from 2000. Linear timestamps are
//! left to the `time` crate; this module does no calendar arithmetic of its
//! own.

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

use crate::registers::{Bcd, HourField, RegisterFrame};

pub const HOST_EPOCH_YEAR: i32 = 1970;
/// Years between the host epoch and the chip's year 00.
pub const CHIP_EPOCH_OFFSET: u8 = 30;

/// A calendar field, named in out of range errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Field {
    Second,
    Minute,
    Hour,
    Day,
    Month,
    Weekday,
    Year,
}

/// Broken down time, years counted from 1970.
///
/// Weekday is 1-7. The chip does not care which day is 1; the conversions to
/// and from `time` use 1 = Sunday.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalendarRecord {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub weekday: u8,
    pub day: u8,
    pub month: u8,
    pub year: u8,
}

impl CalendarRecord {
    /// Checks every field against the range the chip can hold. Years must fall
    /// in 2000-2099.
    pub fn validate(&self) -> Result<(), Field> {
        if self.second > 59 {
            return Err(Field::Second);
        }
        if self.minute > 59 {
            return Err(Field::Minute);
        }
        if self.hour > 23 {
            return Err(Field::Hour);
        }
        if !(1..=31).contains(&self.day) {
            return Err(Field::Day);
        }
        if !(1..=12).contains(&self.month) {
            return Err(Field::Month);
        }
        if !(1..=7).contains(&self.weekday) {
            return Err(Field::Weekday);
        }
        if !(CHIP_EPOCH_OFFSET..=CHIP_EPOCH_OFFSET + 99).contains(&self.year) {
            return Err(Field::Year);
        }
        Ok(())
    }

    pub fn to_datetime(&self) -> Result<PrimitiveDateTime, Field> {
        let month = Month::try_from(self.month).map_err(|_| Field::Month)?;
        let date = Date::from_calendar_date(HOST_EPOCH_YEAR + i32::from(self.year), month, self.day)
            .map_err(|_| Field::Day)?;
        let time = Time::from_hms(self.hour, self.minute, self.second).map_err(|e| match e.name() {
            "minute" => Field::Minute,
            "second" => Field::Second,
            _ => Field::Hour,
        })?;
        Ok(PrimitiveDateTime::new(date, time))
    }

    /// The weekday comes from the date, the record's own weekday is not used.
    pub fn from_datetime(dt: PrimitiveDateTime) -> Result<Self, Field> {
        let year = u8::try_from(dt.year() - HOST_EPOCH_YEAR).map_err(|_| Field::Year)?;
        Ok(CalendarRecord {
            second: dt.second(),
            minute: dt.minute(),
            hour: dt.hour(),
            weekday: dt.weekday().number_from_sunday(),
            day: dt.day(),
            month: u8::from(dt.month()),
            year,
        })
    }

    /// Seconds since 1970-01-01 00:00:00, the record taken as UTC.
    pub fn to_unix_timestamp(&self) -> Result<i64, Field> {
        Ok(self.to_datetime()?.assume_utc().unix_timestamp())
    }

    pub fn from_unix_timestamp(timestamp: i64) -> Result<Self, Field> {
        let dt = OffsetDateTime::from_unix_timestamp(timestamp).map_err(|_| Field::Year)?;
        Self::from_datetime(PrimitiveDateTime::new(dt.date(), dt.time()))
    }
}

/// Register frame to calendar record. Never fails; whatever digits the chip
/// returned are converted as they are.
pub fn decode(frame: &RegisterFrame) -> CalendarRecord {
    let hour = match frame.hour {
        HourField::TwentyFourHour(h) => h.to_binary(),
        // 12 AM is hour 0, 12 PM is hour 12.
        HourField::TwelveHour { hour, pm } => hour.to_binary() % 12 + if pm { 12 } else { 0 },
    };

    CalendarRecord {
        second: frame.seconds.to_binary(),
        minute: frame.minutes.to_binary(),
        hour,
        weekday: frame.weekday,
        day: frame.date.to_binary(),
        month: frame.month.to_binary(),
        year: frame.year.to_binary().wrapping_add(CHIP_EPOCH_OFFSET),
    }
}

/// Calendar record to register frame, always in 24 hour layout with the
/// clock running and write protect off.
///
/// Out of range fields are rejected rather than truncated into a neighbouring
/// bit field.
pub fn encode(record: &CalendarRecord) -> Result<RegisterFrame, Field> {
    record.validate()?;

    Ok(RegisterFrame {
        seconds: Bcd::from_binary(record.second),
        clock_halt: false,
        minutes: Bcd::from_binary(record.minute),
        hour: HourField::TwentyFourHour(Bcd::from_binary(record.hour)),
        date: Bcd::from_binary(record.day),
        month: Bcd::from_binary(record.month),
        weekday: record.weekday,
        year: Bcd::from_binary(record.year - CHIP_EPOCH_OFFSET),
        write_protect: false,
    })
}
