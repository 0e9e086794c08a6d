use thiserror::Error;

/// Errors raised while building features over a table.
///
/// These are configuration errors: they indicate a misassembled pipeline
/// (duplicate names, wrong column types, missing prerequisites) and are
/// fatal rather than recoverable.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("feature `{name}` is already present in the table")]
    DuplicateFeature { name: String },

    #[error("column `{name}` not found in the table")]
    UnknownColumn { name: String },

    #[error("column `{name}` row {row}: expected {expected}")]
    TypeMismatch {
        name: String,
        row: usize,
        expected: &'static str,
    },

    #[error("column `{name}` has {len} rows, table has {expected}")]
    LengthMismatch {
        name: String,
        len: usize,
        expected: usize,
    },

    #[error("exported column `{column}` still has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("table has no timestamp index; run parse_dates first")]
    MissingIndex,
}

/// Errors raised while windowing an exported frame or applying scaling.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error(
        "shape mismatch: expected (_, {expected_steps}, {expected_features}), got (_, {steps}, {features})"
    )]
    ShapeMismatch {
        expected_steps: usize,
        expected_features: usize,
        steps: usize,
        features: usize,
    },

    #[error("no windows could be generated (lookback {lookback} over {rows} rows)")]
    Empty { lookback: usize, rows: usize },

    #[error("exported frame has {columns} columns; need at least 2 (features + target)")]
    TooFewColumns { columns: usize },

    #[error(
        "training split is empty ({windows} windows at train fraction {train_fraction}); \
         scaling statistics cannot be computed"
    )]
    EmptyTrainSplit { windows: usize, train_fraction: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_error_formatting() {
        let err = FeatureError::DuplicateFeature {
            name: "day_of_year_sin(365)".to_string(),
        };
        assert!(err.to_string().contains("day_of_year_sin(365)"));
    }

    #[test]
    fn test_shape_mismatch_formatting() {
        let err = DatasetError::ShapeMismatch {
            expected_steps: 60,
            expected_features: 24,
            steps: 30,
            features: 24,
        };
        let msg = err.to_string();
        assert!(msg.contains("60"));
        assert!(msg.contains("30"));
    }
}
