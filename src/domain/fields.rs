//! Canonical field names of the raw per-minute input data.
//!
//! These are the column headers produced by the IEX intraday scrape. The
//! feature catalogue and the cleanup pass refer to them by these exact
//! strings, so they live in one place.

pub const DATE: &str = "date";
pub const MINUTE: &str = "minute";
pub const HIGH: &str = "high";
pub const LOW: &str = "low";
pub const AVERAGE: &str = "average";
pub const VOLUME: &str = "volume";
pub const NOTIONAL: &str = "notional";
pub const NUMBER_OF_TRADES: &str = "numberOfTrades";
pub const MARKET_HIGH: &str = "marketHigh";
pub const MARKET_LOW: &str = "marketLow";
pub const MARKET_AVERAGE: &str = "marketAverage";
pub const MARKET_VOLUME: &str = "marketVolume";
pub const MARKET_NOTIONAL: &str = "marketNotional";
pub const MARKET_NUMBER_OF_TRADES: &str = "marketNumberOfTrades";
pub const MARKET_OPEN: &str = "marketOpen";
pub const MARKET_CLOSE: &str = "marketClose";
pub const MARKET_CHANGE_OVER_TIME: &str = "marketChangeOverTime";

/// Raw market columns exported by default, in export order.
pub const DEFAULT_EXPORT_FIELDS: &[&str] = &[
    MARKET_HIGH,
    MARKET_LOW,
    MARKET_AVERAGE,
    MARKET_VOLUME,
    MARKET_NOTIONAL,
    MARKET_NUMBER_OF_TRADES,
    MARKET_OPEN,
    MARKET_CLOSE,
    MARKET_CHANGE_OVER_TIME,
];

/// Columns whose non-positive values flag a row as a bad tick.
pub const QUALITY_FIELDS: &[&str] = &[
    NUMBER_OF_TRADES,
    MARKET_NUMBER_OF_TRADES,
    MARKET_VOLUME,
    VOLUME,
];

/// Columns that get blanked on bad-tick rows and repaired by fill.
/// The high/low columns are left alone; they stay usable even on thin ticks.
pub const REPAIRABLE_FIELDS: &[&str] = &[
    MARKET_AVERAGE,
    MARKET_VOLUME,
    MARKET_NOTIONAL,
    MARKET_NUMBER_OF_TRADES,
    MARKET_OPEN,
    MARKET_CLOSE,
    MARKET_CHANGE_OVER_TIME,
];

/// Derived calendar column names (created by `parse_dates`).
pub const YEAR: &str = "year";
pub const DAY_OF_YEAR: &str = "day_of_year";
pub const WEEKDAY: &str = "weekday";
pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const MINUTE_OF_HOUR: &str = "minute_of_hour";
pub const MINUTE_BUCKET: &str = "minute_bucket";
pub const MINUTE_OF_DAY: &str = "minute_of_day";
pub const TIMESTAMP: &str = "timestamp";
