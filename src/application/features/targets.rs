//! Forward-looking targets.
//!
//! Both targets look up the value of a named feature at `T + offset` by
//! exact point lookup on the table's timestamp index. A lookup with no
//! matching row is expected near the end of a session and yields
//! `Missing`, which later propagates to row exclusion; it is never an
//! error. Duplicate timestamps resolve to the first matching row (the
//! index is built first-occurrence-wins).

use super::{Feature, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::table::{Cell, Table, TimeIndex};
use chrono::Duration;

fn future_cell(
    table: &Table,
    index: &TimeIndex,
    feature: &str,
    row: usize,
    offset: Duration,
) -> Option<f64> {
    let ts = index.timestamp_at(row)?;
    let future_row = index.lookup(ts + offset)?;
    table.cell(feature, future_row)?.as_f64()
}

/// Value of `feature` at a fixed offset ahead of each row.
pub struct FutureValue {
    feature: String,
    offset: Duration,
}

impl FutureValue {
    pub fn new(feature: impl Into<String>, offset: Duration) -> Self {
        Self {
            feature: feature.into(),
            offset,
        }
    }
}

impl Feature for FutureValue {
    fn name(&self) -> String {
        format!("{}_future({}m)", self.feature, self.offset.num_minutes())
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        let index = table.index().ok_or(FeatureError::MissingIndex)?;
        table.require_column(&self.feature)?;
        let out = (0..table.num_rows())
            .map(|row| {
                match future_cell(table, index, &self.feature, row, self.offset) {
                    Some(value) => Cell::from_f64(value),
                    None => Cell::Missing,
                }
            })
            .collect();
        Ok(FeatureOutput::Single(out))
    }
}

/// Percent change of `feature` between each row and a fixed offset ahead.
///
/// `(future − now) / now`; a zero or missing current value makes the
/// division non-finite, which propagates as `Missing` rather than
/// contaminating the tensor.
pub struct FutureValueChange {
    feature: String,
    offset: Duration,
}

impl FutureValueChange {
    pub fn new(feature: impl Into<String>, offset: Duration) -> Self {
        Self {
            feature: feature.into(),
            offset,
        }
    }
}

impl Feature for FutureValueChange {
    fn name(&self) -> String {
        format!("{}_future_change({}m)", self.feature, self.offset.num_minutes())
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        let index = table.index().ok_or(FeatureError::MissingIndex)?;
        let column = table.require_column(&self.feature)?;
        let out = (0..table.num_rows())
            .map(|row| {
                let now = column[row].as_f64();
                let future = future_cell(table, index, &self.feature, row, self.offset);
                match (now, future) {
                    (Some(now), Some(future)) => Cell::from_f64((future - now) / now),
                    _ => Cell::Missing,
                }
            })
            .collect();
        Ok(FeatureOutput::Single(out))
    }
}
