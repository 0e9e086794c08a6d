//! Calendar extraction features.
//!
//! These decompose the raw `date` (a datetime at midnight) and `minute`
//! ("HH:MM" text) columns into numeric calendar components, plus the
//! reconstructed full timestamp that becomes the table index.
//!
//! Scheduling note: `MinuteBucket`, `MinuteOfDay` and `Timestamp` read
//! columns produced by earlier calendar features; ordering them is the
//! caller's responsibility.

use super::{Feature, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::fields;
use crate::domain::table::{Cell, Column, Table};
use chrono::{Datelike, Duration, NaiveDateTime, Weekday};

fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn map_date_column<F>(table: &Table, map: F) -> Result<FeatureOutput, FeatureError>
where
    F: Fn(NaiveDateTime) -> Cell,
{
    let column = table.require_column(fields::DATE)?;
    let out = column
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Cell::DateTime(ts) => Ok(map(*ts)),
            Cell::Missing => Ok(Cell::Missing),
            _ => Err(FeatureError::TypeMismatch {
                name: fields::DATE.to_string(),
                row,
                expected: "datetime",
            }),
        })
        .collect::<Result<Column, _>>()?;
    Ok(FeatureOutput::Single(out))
}

/// Splits an "HH:MM" minute label into hour and minute components.
fn minute_parts(text: &str) -> Option<(i64, i64)> {
    let (hour, minute) = text.split_once(':')?;
    Some((hour.parse().ok()?, minute.parse().ok()?))
}

fn map_minute_column<F>(table: &Table, map: F) -> Result<FeatureOutput, FeatureError>
where
    F: Fn(i64, i64) -> Cell,
{
    let column = table.require_column(fields::MINUTE)?;
    let out = column
        .iter()
        .enumerate()
        .map(|(row, cell)| match cell {
            Cell::Text(text) => match minute_parts(text) {
                Some((hour, minute)) => Ok(map(hour, minute)),
                None => Err(FeatureError::TypeMismatch {
                    name: fields::MINUTE.to_string(),
                    row,
                    expected: "HH:MM",
                }),
            },
            Cell::Missing => Ok(Cell::Missing),
            _ => Err(FeatureError::TypeMismatch {
                name: fields::MINUTE.to_string(),
                row,
                expected: "HH:MM",
            }),
        })
        .collect::<Result<Column, _>>()?;
    Ok(FeatureOutput::Single(out))
}

pub struct Year;

impl Feature for Year {
    fn name(&self) -> String {
        fields::YEAR.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        map_date_column(table, |ts| Cell::Int(ts.year() as i64))
    }
}

pub struct DayOfYear;

impl Feature for DayOfYear {
    fn name(&self) -> String {
        fields::DAY_OF_YEAR.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        map_date_column(table, |ts| Cell::Int(ts.ordinal() as i64))
    }
}

/// English day name, e.g. "Tuesday". Text-valued; meant for one-hot
/// expansion, not direct export.
pub struct WeekdayName;

impl Feature for WeekdayName {
    fn name(&self) -> String {
        fields::WEEKDAY.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        map_date_column(table, |ts| Cell::Text(day_name(ts.weekday()).to_string()))
    }
}

pub struct HourOfDay;

impl Feature for HourOfDay {
    fn name(&self) -> String {
        fields::HOUR_OF_DAY.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        map_minute_column(table, |hour, _| Cell::Int(hour))
    }
}

pub struct MinuteOfHour;

impl Feature for MinuteOfHour {
    fn name(&self) -> String {
        fields::MINUTE_OF_HOUR.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        map_minute_column(table, |_, minute| Cell::Int(minute))
    }
}

/// Ten-minute-ish quantization of the minute within the hour.
pub struct MinuteBucket;

impl Feature for MinuteBucket {
    fn name(&self) -> String {
        fields::MINUTE_BUCKET.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        let column = table.require_column(fields::MINUTE_OF_HOUR)?;
        let out = column
            .iter()
            .map(|cell| match cell.as_i64() {
                Some(minute) => Cell::Int(minute / 6),
                None => Cell::Missing,
            })
            .collect();
        Ok(FeatureOutput::Single(out))
    }
}

/// Linear minute offset from market open (default 09:30).
pub struct MinuteOfDay {
    starting_hour: i64,
    open_offset_minutes: i64,
}

impl MinuteOfDay {
    pub fn new(starting_hour: i64, open_offset_minutes: i64) -> Self {
        Self {
            starting_hour,
            open_offset_minutes,
        }
    }
}

impl Default for MinuteOfDay {
    fn default() -> Self {
        Self::new(9, 30)
    }
}

impl Feature for MinuteOfDay {
    fn name(&self) -> String {
        fields::MINUTE_OF_DAY.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        let hours = table.require_column(fields::HOUR_OF_DAY)?;
        let minutes = table.require_column(fields::MINUTE_OF_HOUR)?;
        let out = hours
            .iter()
            .zip(minutes.iter())
            .map(|(hour, minute)| match (hour.as_i64(), minute.as_i64()) {
                (Some(h), Some(m)) => {
                    Cell::Int((h - self.starting_hour) * 60 + m - self.open_offset_minutes)
                }
                _ => Cell::Missing,
            })
            .collect();
        Ok(FeatureOutput::Single(out))
    }
}

/// Full timestamp reconstructed from date + hour + minute. Becomes the
/// table's sort key and lookup index.
pub struct Timestamp;

impl Feature for Timestamp {
    fn name(&self) -> String {
        fields::TIMESTAMP.to_string()
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        let dates = table.require_column(fields::DATE)?;
        let hours = table.require_column(fields::HOUR_OF_DAY)?;
        let minutes = table.require_column(fields::MINUTE_OF_HOUR)?;
        let out = (0..dates.len())
            .map(|row| {
                match (
                    dates[row].as_datetime(),
                    hours[row].as_i64(),
                    minutes[row].as_i64(),
                ) {
                    (Some(date), Some(h), Some(m)) => {
                        Cell::DateTime(date + Duration::hours(h) + Duration::minutes(m))
                    }
                    _ => Cell::Missing,
                }
            })
            .collect();
        Ok(FeatureOutput::Single(out))
    }
}
