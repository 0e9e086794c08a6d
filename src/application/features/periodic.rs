//! Periodic (sine/cosine) encodings of cyclic columns.
//!
//! Encoding a cyclic value like day-of-year as `sin(2π·v/p)` and
//! `cos(2π·v/p)` keeps the ends of the cycle adjacent in feature space.
//! Instance names embed the base column and the period, so several
//! encodings over different columns or periods coexist in one table.

use super::{Feature, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::table::{Cell, Table};
use std::f64::consts::PI;

fn periodic_column(
    table: &Table,
    base_feature: &str,
    period: f64,
    apply: fn(f64) -> f64,
) -> Result<FeatureOutput, FeatureError> {
    let column = table.require_column(base_feature)?;
    let out = column
        .iter()
        .map(|cell| match cell.as_f64() {
            Some(value) => Cell::from_f64(apply(value * (2.0 * PI / period))),
            None => Cell::Missing,
        })
        .collect();
    Ok(FeatureOutput::Single(out))
}

pub struct Sinify {
    base_feature: String,
    period: f64,
}

impl Sinify {
    pub fn new(base_feature: impl Into<String>, period: f64) -> Self {
        Self {
            base_feature: base_feature.into(),
            period,
        }
    }
}

impl Feature for Sinify {
    fn name(&self) -> String {
        format!("{}_sin({})", self.base_feature, self.period)
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        periodic_column(table, &self.base_feature, self.period, f64::sin)
    }
}

pub struct Cosify {
    base_feature: String,
    period: f64,
}

impl Cosify {
    pub fn new(base_feature: impl Into<String>, period: f64) -> Self {
        Self {
            base_feature: base_feature.into(),
            period,
        }
    }
}

impl Feature for Cosify {
    fn name(&self) -> String {
        format!("{}_cos({})", self.base_feature, self.period)
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        periodic_column(table, &self.base_feature, self.period, f64::cos)
    }
}
