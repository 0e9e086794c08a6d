//! The time-indexed table mutated by the feature pipeline.
//!
//! A [`Table`] is an ordered set of named, row-aligned columns plus a
//! per-row exclusion flag. After `parse_dates` has run, the table also
//! carries a timestamp index supporting O(1) point lookup, which the
//! forward-looking targets depend on. Rows are never physically removed
//! during construction; they are only flagged excluded, so later steps
//! can still point-look them up.

use crate::domain::errors::FeatureError;
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// A single value in the table.
///
/// `Missing` stands in for both absent source data and any arithmetic
/// that produced a non-finite number, so downstream exclusion handles
/// them uniformly.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Float(f64),
    Int(i64),
    Text(String),
    DateTime(NaiveDateTime),
    Missing,
}

impl Cell {
    /// Wraps a float, normalizing non-finite values to `Missing`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Cell::Float(value)
        } else {
            Cell::Missing
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric view of the cell (ints widen to f64).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(ts) => Some(*ts),
            _ => None,
        }
    }
}

/// A row-aligned column of cells.
pub type Column = Vec<Cell>;

/// Timestamp index over the table rows.
///
/// Duplicate timestamps resolve to the FIRST matching row.
#[derive(Debug, Clone, Default)]
pub struct TimeIndex {
    timestamps: Vec<NaiveDateTime>,
    by_time: HashMap<NaiveDateTime, usize>,
}

impl TimeIndex {
    pub fn timestamp_at(&self, row: usize) -> Option<NaiveDateTime> {
        self.timestamps.get(row).copied()
    }

    pub fn lookup(&self, ts: NaiveDateTime) -> Option<usize> {
        self.by_time.get(&ts).copied()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }
}

#[derive(Debug, Clone, Default)]
pub struct Table {
    names: Vec<String>,
    columns: HashMap<String, Column>,
    excluded: Vec<bool>,
    index: Option<TimeIndex>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows (all columns are row-aligned).
    pub fn num_rows(&self) -> usize {
        self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Column names in insertion order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn require_column(&self, name: &str) -> Result<&Column, FeatureError> {
        self.columns.get(name).ok_or_else(|| FeatureError::UnknownColumn {
            name: name.to_string(),
        })
    }

    pub fn cell(&self, name: &str, row: usize) -> Option<&Cell> {
        self.columns.get(name).and_then(|col| col.get(row))
    }

    /// Adds a new column. Re-adding an existing name is a configuration
    /// error, never a silent overwrite.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<(), FeatureError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(FeatureError::DuplicateFeature { name });
        }
        if self.names.is_empty() {
            self.excluded = vec![false; column.len()];
        } else if column.len() != self.num_rows() {
            return Err(FeatureError::LengthMismatch {
                name,
                len: column.len(),
                expected: self.num_rows(),
            });
        }
        self.names.push(name.clone());
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn set_cell(&mut self, name: &str, row: usize, value: Cell) -> Result<(), FeatureError> {
        let column = self.columns.get_mut(name).ok_or_else(|| FeatureError::UnknownColumn {
            name: name.to_string(),
        })?;
        match column.get_mut(row) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(FeatureError::LengthMismatch {
                name: name.to_string(),
                len: column.len(),
                expected: row + 1,
            }),
        }
    }

    pub fn mark_excluded(&mut self, row: usize) {
        if let Some(flag) = self.excluded.get_mut(row) {
            *flag = true;
        }
    }

    pub fn is_excluded(&self, row: usize) -> bool {
        self.excluded.get(row).copied().unwrap_or(false)
    }

    pub fn excluded(&self) -> &[bool] {
        &self.excluded
    }

    /// Rows that are missing in ANY column of the table.
    pub fn rows_with_missing(&self) -> Vec<usize> {
        (0..self.num_rows())
            .filter(|&row| {
                self.names
                    .iter()
                    .any(|name| self.columns[name][row].is_missing())
            })
            .collect()
    }

    /// Forward-fills then backward-fills every column, patching isolated
    /// missing cells from their temporal neighbors.
    pub fn fill_forward_backward(&mut self) {
        for name in &self.names {
            let column = self.columns.get_mut(name).expect("column names stay in sync");
            let mut last: Option<Cell> = None;
            for cell in column.iter_mut() {
                if cell.is_missing() {
                    if let Some(fill) = &last {
                        *cell = fill.clone();
                    }
                } else {
                    last = Some(cell.clone());
                }
            }
            last = None;
            for cell in column.iter_mut().rev() {
                if cell.is_missing() {
                    if let Some(fill) = &last {
                        *cell = fill.clone();
                    }
                } else {
                    last = Some(cell.clone());
                }
            }
        }
    }

    /// Sorts rows ascending by the named DateTime column and installs the
    /// timestamp index over the sorted order.
    pub fn set_index(&mut self, column: &str) -> Result<(), FeatureError> {
        let timestamps: Vec<NaiveDateTime> = {
            let col = self.require_column(column)?;
            col.iter()
                .enumerate()
                .map(|(row, cell)| {
                    cell.as_datetime().ok_or(FeatureError::TypeMismatch {
                        name: column.to_string(),
                        row,
                        expected: "datetime",
                    })
                })
                .collect::<Result<_, _>>()?
        };

        let mut order: Vec<usize> = (0..timestamps.len()).collect();
        order.sort_by_key(|&row| timestamps[row]);

        for name in &self.names {
            let col = self.columns.get_mut(name).expect("column names stay in sync");
            *col = order.iter().map(|&row| col[row].clone()).collect();
        }
        self.excluded = order.iter().map(|&row| self.excluded[row]).collect();

        let sorted: Vec<NaiveDateTime> = order.iter().map(|&row| timestamps[row]).collect();
        let mut by_time = HashMap::with_capacity(sorted.len());
        for (row, ts) in sorted.iter().enumerate() {
            by_time.entry(*ts).or_insert(row);
        }
        self.index = Some(TimeIndex {
            timestamps: sorted,
            by_time,
        });
        Ok(())
    }

    pub fn index(&self) -> Option<&TimeIndex> {
        self.index.as_ref()
    }
}
