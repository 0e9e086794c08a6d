//! Feature/target builder.
//!
//! [`FeatureGenerator`] owns the table for the duration of construction
//! and applies feature primitives to it in order, tracking which columns
//! are exported and which rows are excluded. It is the single writer;
//! features only ever read the table.

use crate::application::features::calendar::{
    DayOfYear, HourOfDay, MinuteOfDay, MinuteOfHour, Timestamp, WeekdayName, Year,
};
use crate::application::features::{Feature, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::fields;
use crate::domain::table::{Cell, Table};
use chrono::NaiveDateTime;
use ndarray::Array2;
use tracing::{debug, info};

/// Finalized output of the feature pipeline: non-excluded rows only,
/// time-ordered, all values cast to f64, target as the last column.
#[derive(Debug, Clone)]
pub struct ExportedFrame {
    pub index: Vec<NaiveDateTime>,
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

pub struct FeatureGenerator {
    table: Table,
    export_fields: Vec<String>,
}

impl FeatureGenerator {
    /// Builds a generator over a raw per-minute table, cleaning it and
    /// deriving the calendar columns up front.
    pub fn new(table: Table) -> Result<Self, FeatureError> {
        Self::with_options(table, true, true)
    }

    /// Like [`new`](Self::new) but with the cleanup and date-parsing
    /// steps individually controllable. Skipping `parse_dates` leaves
    /// the table unindexed, so forward-looking targets will fail until
    /// it is run.
    pub fn with_options(
        table: Table,
        auto_clean: bool,
        parse_dates: bool,
    ) -> Result<Self, FeatureError> {
        let mut generator = Self {
            table,
            export_fields: fields::DEFAULT_EXPORT_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        if auto_clean {
            generator.cleanup()?;
        }
        if parse_dates {
            generator.parse_dates()?;
        }
        Ok(generator)
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn export_fields(&self) -> &[String] {
        &self.export_fields
    }

    /// Repairs bad ticks: rows where any volume/trade-count column is
    /// non-positive get their market columns blanked, then the whole
    /// table is forward- and backward-filled. Interpolating isolated bad
    /// ticks from neighbors keeps the minute grid intact, which dropping
    /// rows would not.
    pub fn cleanup(&mut self) -> Result<(), FeatureError> {
        let mut bad_rows = Vec::new();
        for row in 0..self.table.num_rows() {
            let bad = fields::QUALITY_FIELDS.iter().try_fold(false, |acc, &name| {
                let cell = self
                    .table
                    .require_column(name)?
                    .get(row)
                    .expect("columns are row-aligned");
                Ok::<_, FeatureError>(acc || cell.as_f64().is_some_and(|v| v <= 0.0))
            })?;
            if bad {
                bad_rows.push(row);
            }
        }

        for &name in fields::REPAIRABLE_FIELDS {
            self.table.require_column(name)?;
            for &row in &bad_rows {
                self.table.set_cell(name, row, Cell::Missing)?;
            }
        }
        self.table.fill_forward_backward();

        if !bad_rows.is_empty() {
            info!(bad_rows = bad_rows.len(), "repaired bad ticks by neighbor fill");
        }
        Ok(())
    }

    /// Derives the calendar columns and installs the timestamp index.
    /// Must run before any forward-looking target, since those need
    /// point lookup by timestamp.
    pub fn parse_dates(&mut self) -> Result<(), FeatureError> {
        self.parse_dates_with(MinuteOfDay::default())
    }

    /// [`parse_dates`](Self::parse_dates) with a custom market-open
    /// setting for the minute-of-day feature.
    pub fn parse_dates_with(&mut self, minute_of_day: MinuteOfDay) -> Result<(), FeatureError> {
        self.build_feature(&Year)?;
        self.build_feature(&DayOfYear)?;
        self.build_feature_with(&WeekdayName, true, false)?;
        self.build_feature(&HourOfDay)?;
        self.build_feature(&MinuteOfHour)?;
        self.build_feature(&minute_of_day)?;
        self.build_feature_with(&Timestamp, true, false)?;

        self.table.set_index(fields::TIMESTAMP)
    }

    /// Applies one feature with the default policy: missing-row sweep on
    /// and the new column(s) exported.
    pub fn build_feature(&mut self, feature: &dyn Feature) -> Result<(), FeatureError> {
        self.build_feature_with(feature, true, true)
    }

    /// Applies one feature.
    ///
    /// If `remove_missing_rows` is set, every row that is missing in ANY
    /// column of the table afterwards is marked excluded (a global
    /// sweep, not just the new column). If `should_export` is set, the
    /// new column name(s) join the exported set.
    pub fn build_feature_with(
        &mut self,
        feature: &dyn Feature,
        remove_missing_rows: bool,
        should_export: bool,
    ) -> Result<(), FeatureError> {
        let name = feature.name();
        if self.table.has_column(&name) {
            return Err(FeatureError::DuplicateFeature { name });
        }

        // The duplicate guard covers the PRODUCED column names, not just
        // the feature's own name: a multi-column feature (whose name is
        // never itself a column) is checked before anything is inserted,
        // so a re-added feature fails without leaving a half-pushed table.
        let new_names = match feature.extract(&self.table)? {
            FeatureOutput::Single(column) => {
                self.table.push_column(name.clone(), column)?;
                vec![name.clone()]
            }
            FeatureOutput::Multi(columns) => {
                for (column_name, _) in &columns {
                    if self.table.has_column(column_name) {
                        return Err(FeatureError::DuplicateFeature {
                            name: column_name.clone(),
                        });
                    }
                }
                let mut names = Vec::with_capacity(columns.len());
                for (column_name, column) in columns {
                    self.table.push_column(column_name.clone(), column)?;
                    names.push(column_name);
                }
                names
            }
        };

        if remove_missing_rows {
            let missing = self.table.rows_with_missing();
            for &row in &missing {
                self.table.mark_excluded(row);
            }
            if !missing.is_empty() {
                debug!(
                    feature = %name,
                    rows = missing.len(),
                    "rows with missing values marked excluded"
                );
            }
        }

        if should_export {
            self.export_fields.extend(new_names);
        }
        Ok(())
    }

    /// Applies several features in order, with the default policy.
    pub fn build_features(&mut self, features: &[&dyn Feature]) -> Result<(), FeatureError> {
        for feature in features {
            self.build_feature(*feature)?;
        }
        Ok(())
    }

    /// Produces the final frame: non-excluded rows, exported columns
    /// minus `features_to_exclude` minus the target (case-insensitive),
    /// with the target appended as the last column and everything cast
    /// to f64. A missing value surviving to this point is a pipeline
    /// misconfiguration and fails loudly.
    pub fn export(
        &self,
        target_feature: &str,
        features_to_exclude: &[&str],
    ) -> Result<ExportedFrame, FeatureError> {
        self.table.require_column(target_feature)?;
        let index = self.table.index().ok_or(FeatureError::MissingIndex)?;

        let mut excluded_names: Vec<String> = features_to_exclude
            .iter()
            .map(|s| s.to_lowercase())
            .collect();
        excluded_names.push(target_feature.to_lowercase());

        let mut columns: Vec<String> = self
            .export_fields
            .iter()
            .filter(|name| !excluded_names.contains(&name.to_lowercase()))
            .cloned()
            .collect();
        columns.push(target_feature.to_string());

        let rows: Vec<usize> = (0..self.table.num_rows())
            .filter(|&row| !self.table.is_excluded(row))
            .collect();

        let mut values = Array2::<f64>::zeros((rows.len(), columns.len()));
        for (out_row, &row) in rows.iter().enumerate() {
            for (out_col, column) in columns.iter().enumerate() {
                let cell = self
                    .table
                    .cell(column, row)
                    .ok_or_else(|| FeatureError::UnknownColumn {
                        name: column.clone(),
                    })?;
                if cell.is_missing() {
                    return Err(FeatureError::MissingValue {
                        column: column.clone(),
                        row,
                    });
                }
                values[[out_row, out_col]] =
                    cell.as_f64().ok_or(FeatureError::TypeMismatch {
                        name: column.clone(),
                        row,
                        expected: "numeric",
                    })?;
            }
        }

        let timestamps = rows
            .iter()
            .map(|&row| index.timestamp_at(row).expect("index covers all rows"))
            .collect();

        info!(
            rows = rows.len(),
            columns = columns.len(),
            target = target_feature,
            "exported feature frame"
        );
        Ok(ExportedFrame {
            index: timestamps,
            columns,
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::features::encoding::OneHotEncoder;
    use crate::application::features::targets::FutureValueChange;
    use chrono::{Duration, NaiveDate};

    /// Builds a two-day raw table with the full raw schema, one row per
    /// minute starting at 09:30.
    fn raw_table(rows_per_day: usize, days: u32) -> Table {
        let mut table = Table::new();
        let n = rows_per_day * days as usize;
        let mut dates = Vec::with_capacity(n);
        let mut minutes = Vec::with_capacity(n);
        for day in 0..days {
            let date = NaiveDate::from_ymd_opt(2021, 4, 19 + day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            for i in 0..rows_per_day {
                dates.push(Cell::DateTime(date));
                let total = 9 * 60 + 30 + i as i64;
                minutes.push(Cell::Text(format!("{:02}:{:02}", total / 60, total % 60)));
            }
        }
        table.push_column(fields::DATE, dates).unwrap();
        table.push_column(fields::MINUTE, minutes).unwrap();

        let floats = |base: f64| (0..n).map(|i| Cell::Float(base + i as f64)).collect();
        let positives = || (0..n).map(|_| Cell::Float(100.0)).collect();
        table.push_column(fields::VOLUME, positives()).unwrap();
        table.push_column(fields::NUMBER_OF_TRADES, positives()).unwrap();
        table.push_column(fields::MARKET_HIGH, floats(101.0)).unwrap();
        table.push_column(fields::MARKET_LOW, floats(99.0)).unwrap();
        table.push_column(fields::MARKET_AVERAGE, floats(100.0)).unwrap();
        table.push_column(fields::MARKET_VOLUME, positives()).unwrap();
        table.push_column(fields::MARKET_NOTIONAL, floats(1000.0)).unwrap();
        table
            .push_column(fields::MARKET_NUMBER_OF_TRADES, positives())
            .unwrap();
        table.push_column(fields::MARKET_OPEN, floats(100.0)).unwrap();
        table.push_column(fields::MARKET_CLOSE, floats(100.0)).unwrap();
        table
            .push_column(fields::MARKET_CHANGE_OVER_TIME, floats(0.0))
            .unwrap();
        table
    }

    #[test]
    fn test_duplicate_feature_is_fatal() {
        let mut generator = FeatureGenerator::new(raw_table(5, 1)).unwrap();
        let err = generator.build_feature(&Year).unwrap_err();
        assert!(matches!(err, FeatureError::DuplicateFeature { .. }));
    }

    #[test]
    fn test_duplicate_multi_column_feature_is_fatal_and_leaves_table_intact() {
        let mut generator = FeatureGenerator::new(raw_table(5, 1)).unwrap();
        let encoder = OneHotEncoder::new(fields::MINUTE_OF_HOUR);
        generator.build_feature(&encoder).unwrap();
        let columns_before = generator.table().column_names().len();
        let exports_before = generator.export_fields().len();

        let err = generator.build_feature(&encoder).unwrap_err();
        assert!(matches!(err, FeatureError::DuplicateFeature { .. }));
        assert_eq!(generator.table().column_names().len(), columns_before);
        assert_eq!(generator.export_fields().len(), exports_before);
    }

    #[test]
    fn test_cleanup_repairs_bad_ticks() {
        let mut table = raw_table(5, 1);
        // Zero volume on row 2 flags it as a bad tick.
        table.set_cell(fields::VOLUME, 2, Cell::Float(0.0)).unwrap();
        table
            .set_cell(fields::MARKET_AVERAGE, 2, Cell::Float(9999.0))
            .unwrap();
        let generator = FeatureGenerator::new(table).unwrap();
        // The outlier average was blanked and forward-filled from row 1.
        assert_eq!(
            generator.table().cell(fields::MARKET_AVERAGE, 2),
            Some(&Cell::Float(101.0))
        );
    }

    #[test]
    fn test_export_places_target_last_and_excludes_case_insensitively() {
        let mut generator = FeatureGenerator::new(raw_table(5, 1)).unwrap();
        let target = FutureValueChange::new(fields::MARKET_AVERAGE, Duration::minutes(1));
        let target_name = target.name();
        generator.build_feature(&target).unwrap();

        let frame = generator
            .export(&target_name, &["MARKETHIGH", "marketlow"])
            .unwrap();
        assert_eq!(frame.columns.last().unwrap(), &target_name);
        assert!(!frame.columns.iter().any(|c| c == fields::MARKET_HIGH));
        assert!(!frame.columns.iter().any(|c| c == fields::MARKET_LOW));
        // Target appears exactly once even though it was in the export set.
        assert_eq!(frame.columns.iter().filter(|c| **c == target_name).count(), 1);
    }

    #[test]
    fn test_rows_with_unresolvable_targets_are_dropped_from_export() {
        let mut generator = FeatureGenerator::new(raw_table(5, 1)).unwrap();
        let target = FutureValueChange::new(fields::MARKET_AVERAGE, Duration::minutes(1));
        let target_name = target.name();
        generator.build_feature(&target).unwrap();

        // The last minute of the day has no T+1m row.
        let frame = generator.export(&target_name, &[]).unwrap();
        assert_eq!(frame.values.nrows(), 4);
        assert!(frame.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_export_fails_on_lingering_missing_value() {
        let mut generator = FeatureGenerator::new(raw_table(5, 1)).unwrap();
        let target = FutureValueChange::new(fields::MARKET_AVERAGE, Duration::minutes(1));
        let target_name = target.name();
        // Skip the missing-row sweep so the unresolvable target survives.
        generator.build_feature_with(&target, false, true).unwrap();

        let err = generator.export(&target_name, &[]).unwrap_err();
        assert!(matches!(err, FeatureError::MissingValue { .. }));
    }

    #[test]
    fn test_export_is_time_sorted_across_days() {
        let mut generator = FeatureGenerator::new(raw_table(3, 2)).unwrap();
        let target = FutureValueChange::new(fields::MARKET_AVERAGE, Duration::minutes(1));
        let target_name = target.name();
        generator.build_feature(&target).unwrap();
        let frame = generator.export(&target_name, &[]).unwrap();
        assert!(frame.index.windows(2).all(|pair| pair[0] <= pair[1]));
    }
}
