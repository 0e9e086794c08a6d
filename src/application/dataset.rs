//! Windowed dataset construction, splitting and scaling.
//!
//! Converts an exported frame into a 3D tensor of shape
//! `(num_windows, lookback_size, num_columns)`, chronologically
//! partitioned into train/validation/test, with min-max statistics
//! frozen from the training slice only. Windows never cross a calendar
//! day boundary, and a day is dropped wholesale when it is too short or
//! contains an outlier target.

use crate::application::generator::ExportedFrame;
use crate::domain::errors::DatasetError;
use chrono::{Datelike, NaiveDate, Utc};
use ndarray::{s, Array1, Array3, ArrayView3, Axis};
use tracing::{debug, info};

/// Share of the non-training remainder that goes to validation; the
/// rest is the test slice.
const VAL_WEIGHT: f64 = 2.0 / 3.0;

/// An immutable windowed dataset.
///
/// Constructed fresh via [`from_frame`](Self::from_frame) or restored
/// verbatim from disk by
/// [`load_dataset`](crate::infrastructure::persistence::load_dataset).
/// There is no mutation API; the scaling statistics are frozen at
/// creation time and reused for every later transform.
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    arr: Array3<f64>,
    column_names: Vec<String>,
    train_fraction: f64,
    f_min: Array1<f64>,
    f_max: Array1<f64>,
    timestamp: i64,
}

impl WindowedDataset {
    /// Windows an exported frame into the 3D tensor and computes the
    /// training-slice scaling statistics.
    ///
    /// Per calendar day: the day is skipped entirely when it has fewer
    /// than `lookback_size` rows or when any of its targets (last
    /// column) has absolute value at or above `target_max_threshold`;
    /// otherwise a stride-1 window slides across its rows. Days are
    /// visited in ascending date order, so the window sequence is
    /// chronological.
    pub fn from_frame(
        frame: &ExportedFrame,
        lookback_size: usize,
        train_fraction: f64,
        target_max_threshold: f64,
    ) -> Result<Self, DatasetError> {
        let num_columns = frame.columns.len();
        if num_columns < 2 {
            return Err(DatasetError::TooFewColumns {
                columns: num_columns,
            });
        }

        let mut windows: Vec<usize> = Vec::new(); // start rows of accepted windows
        for (date, start, end) in day_ranges(frame) {
            let rows = end - start;
            if rows < lookback_size {
                debug!(%date, rows, lookback_size, "day skipped: too few rows");
                continue;
            }
            let day_targets = frame.values.slice(s![start..end, num_columns - 1]);
            if day_targets.iter().any(|t| t.abs() >= target_max_threshold) {
                debug!(%date, "day skipped: target outlier");
                continue;
            }
            for offset in 0..=(rows - lookback_size) {
                windows.push(start + offset);
            }
        }

        if windows.is_empty() {
            return Err(DatasetError::Empty {
                lookback: lookback_size,
                rows: frame.values.nrows(),
            });
        }

        let mut arr = Array3::<f64>::zeros((windows.len(), lookback_size, num_columns));
        for (w, &start) in windows.iter().enumerate() {
            arr.slice_mut(s![w, .., ..])
                .assign(&frame.values.slice(s![start..start + lookback_size, ..]));
        }

        let mut dataset = Self {
            arr,
            column_names: frame.columns.clone(),
            train_fraction,
            f_min: Array1::zeros(num_columns - 1),
            f_max: Array1::zeros(num_columns - 1),
            timestamp: Utc::now().timestamp(),
        };
        // The scaling statistics are frozen from the training slice; an
        // empty training slice would leave them at +/- infinity.
        if dataset.split_ix_train() == 0 {
            return Err(DatasetError::EmptyTrainSplit {
                windows: dataset.arr.shape()[0],
                train_fraction,
            });
        }
        let (f_min, f_max) = dataset.calculate_stats();
        dataset.f_min = f_min;
        dataset.f_max = f_max;

        info!(
            windows = dataset.arr.shape()[0],
            lookback = lookback_size,
            columns = num_columns,
            "windowed dataset built"
        );
        Ok(dataset)
    }

    /// Reassembles a dataset from persisted parts, with no recomputation.
    pub(crate) fn from_parts(
        arr: Array3<f64>,
        column_names: Vec<String>,
        train_fraction: f64,
        f_min: Array1<f64>,
        f_max: Array1<f64>,
        timestamp: i64,
    ) -> Self {
        Self {
            arr,
            column_names,
            train_fraction,
            f_min,
            f_max,
            timestamp,
        }
    }

    /// Per-feature min/max over the training slice's feature columns,
    /// reduced over both the window-step and window-index axes: one
    /// scalar floor/ceiling per feature for the whole training set.
    fn calculate_stats(&self) -> (Array1<f64>, Array1<f64>) {
        let train_x = self.train_x();
        let num_features = self.num_features();
        let mut f_min = Array1::from_elem(num_features, f64::INFINITY);
        let mut f_max = Array1::from_elem(num_features, f64::NEG_INFINITY);
        for window in train_x.axis_iter(Axis(0)) {
            for step in window.axis_iter(Axis(0)) {
                for (feature, &value) in step.iter().enumerate() {
                    if value < f_min[feature] {
                        f_min[feature] = value;
                    }
                    if value > f_max[feature] {
                        f_max[feature] = value;
                    }
                }
            }
        }
        (f_min, f_max)
    }

    pub fn arr(&self) -> &Array3<f64> {
        &self.arr
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    pub fn f_min(&self) -> &Array1<f64> {
        &self.f_min
    }

    pub fn f_max(&self) -> &Array1<f64> {
        &self.f_max
    }

    /// Unix creation time, also used as the artifact directory prefix.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Number of columns in the tensor, target included.
    pub fn num_inputs(&self) -> usize {
        self.column_names.len()
    }

    /// Number of feature columns (everything but the target).
    pub fn num_features(&self) -> usize {
        self.num_inputs() - 1
    }

    pub fn lookback_size(&self) -> usize {
        self.arr.shape()[1]
    }

    pub fn split_ix_train(&self) -> usize {
        (self.arr.shape()[0] as f64 * self.train_fraction) as usize
    }

    pub fn split_ix_val(&self) -> usize {
        let remainder = self.arr.shape()[0] as f64 * (1.0 - self.train_fraction);
        self.split_ix_train() + (remainder * VAL_WEIGHT) as usize
    }

    pub fn train(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![..self.split_ix_train(), .., ..])
    }

    pub fn val(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![self.split_ix_train()..self.split_ix_val(), .., ..])
    }

    pub fn test(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![self.split_ix_val().., .., ..])
    }

    pub fn train_x(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![..self.split_ix_train(), .., ..-1])
    }

    /// Training targets, kept as a width-1 slice; callers wanting a flat
    /// vector squeeze explicitly.
    pub fn train_y(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![..self.split_ix_train(), .., -1..])
    }

    pub fn val_x(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![self.split_ix_train()..self.split_ix_val(), .., ..-1])
    }

    pub fn val_y(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![self.split_ix_train()..self.split_ix_val(), .., -1..])
    }

    pub fn test_x(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![self.split_ix_val().., .., ..-1])
    }

    pub fn test_y(&self) -> ArrayView3<'_, f64> {
        self.arr.slice(s![self.split_ix_val().., .., -1..])
    }

    fn verify_shape(&self, data: &ArrayView3<'_, f64>) -> Result<(), DatasetError> {
        let shape = data.shape();
        if shape[1] != self.lookback_size() || shape[2] != self.num_features() {
            return Err(DatasetError::ShapeMismatch {
                expected_steps: self.lookback_size(),
                expected_features: self.num_features(),
                steps: shape[1],
                features: shape[2],
            });
        }
        Ok(())
    }

    /// Scale span of one feature. A feature constant over the training
    /// slice has zero range; its span is taken as 1 so that scaling
    /// stays finite and [`reverse_transform`](Self::reverse_transform)
    /// still inverts [`transform`](Self::transform).
    fn feature_span(&self, feature: usize) -> f64 {
        let span = self.f_max[feature] - self.f_min[feature];
        if span == 0.0 { 1.0 } else { span }
    }

    /// Min-max scales feature data using the frozen training statistics.
    pub fn transform(&self, data: &ArrayView3<'_, f64>) -> Result<Array3<f64>, DatasetError> {
        self.verify_shape(data)?;
        let mut out = data.to_owned();
        for (feature, mut plane) in out.axis_iter_mut(Axis(2)).enumerate() {
            let floor = self.f_min[feature];
            let span = self.feature_span(feature);
            plane.mapv_inplace(|v| (v - floor) / span);
        }
        Ok(out)
    }

    /// Inverts [`transform`](Self::transform).
    pub fn reverse_transform(
        &self,
        data: &ArrayView3<'_, f64>,
    ) -> Result<Array3<f64>, DatasetError> {
        self.verify_shape(data)?;
        let mut out = data.to_owned();
        for (feature, mut plane) in out.axis_iter_mut(Axis(2)).enumerate() {
            let floor = self.f_min[feature];
            let span = self.feature_span(feature);
            plane.mapv_inplace(|v| v * span + floor);
        }
        Ok(out)
    }
}

/// Contiguous row ranges of the frame grouped by calendar date. The
/// frame is time-sorted, so each date's rows are contiguous and the
/// ranges come out in ascending date order.
fn day_ranges(frame: &ExportedFrame) -> Vec<(NaiveDate, usize, usize)> {
    let mut ranges: Vec<(NaiveDate, usize, usize)> = Vec::new();
    for (row, ts) in frame.index.iter().enumerate() {
        let date = ts.date();
        match ranges.last_mut() {
            Some((last_date, _, end)) if *last_date == date => *end = row + 1,
            _ => ranges.push((date, row, row + 1)),
        }
    }
    // Day ordinal is only used for logging; the date itself groups rows.
    debug_assert!(ranges.windows(2).all(|pair| {
        pair[0].0.num_days_from_ce() <= pair[1].0.num_days_from_ce()
    }));
    ranges
}
