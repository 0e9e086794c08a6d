//! Feature primitive contract.
//!
//! A feature is a named, deterministic transform from the current table
//! to one new column (or several, for one-hot expansion). Extraction
//! never mutates the input table; merging the result back in is the
//! [`FeatureGenerator`](crate::application::generator::FeatureGenerator)'s job.

pub mod calendar;
pub mod encoding;
pub mod periodic;
pub mod targets;

use crate::domain::errors::FeatureError;
use crate::domain::table::{Column, Table};

/// Output of a feature extraction.
///
/// `Single` columns take the feature's own name; `Multi` outputs carry
/// their own names (e.g. one indicator column per category).
#[derive(Debug)]
pub enum FeatureOutput {
    Single(Column),
    Multi(Vec<(String, Column)>),
}

pub trait Feature {
    /// Unique snake_case name. Parametrized features embed their
    /// parameters so multiple instances over different bases or periods
    /// never collide.
    fn name(&self) -> String;

    /// Computes the new column(s), row-aligned with the table.
    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError>;
}
