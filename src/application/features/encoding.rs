//! Drop-first one-hot expansion of a categorical column.

use super::{Feature, FeatureOutput};
use crate::domain::errors::FeatureError;
use crate::domain::table::{Cell, Table};
use std::collections::BTreeSet;

/// Sortable category key. Integer categories order numerically,
/// text categories alphabetically after them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Category {
    Num(i64),
    Label(String),
}

impl Category {
    fn from_cell(cell: &Cell) -> Option<Self> {
        match cell {
            Cell::Int(v) => Some(Category::Num(*v)),
            Cell::Text(s) => Some(Category::Label(s.clone())),
            _ => None,
        }
    }

    fn label(&self) -> String {
        match self {
            Category::Num(v) => v.to_string(),
            Category::Label(s) => s.clone(),
        }
    }
}

/// One-hot encodes a categorical column into one indicator column per
/// distinct value except the first (drop-first, to avoid perfect
/// collinearity among the indicators). Indicator names are prefixed by
/// the source column. Missing cells indicate into no category (all
/// zeros), matching the exclusion-by-missing policy elsewhere.
pub struct OneHotEncoder {
    feature_to_encode: String,
}

impl OneHotEncoder {
    pub fn new(feature_to_encode: impl Into<String>) -> Self {
        Self {
            feature_to_encode: feature_to_encode.into(),
        }
    }
}

impl Feature for OneHotEncoder {
    fn name(&self) -> String {
        format!("{}_one_hot", self.feature_to_encode)
    }

    fn extract(&self, table: &Table) -> Result<FeatureOutput, FeatureError> {
        let column = table.require_column(&self.feature_to_encode)?;

        let mut categories: BTreeSet<Category> = BTreeSet::new();
        for (row, cell) in column.iter().enumerate() {
            if cell.is_missing() {
                continue;
            }
            match Category::from_cell(cell) {
                Some(category) => {
                    categories.insert(category);
                }
                None => {
                    return Err(FeatureError::TypeMismatch {
                        name: self.feature_to_encode.clone(),
                        row,
                        expected: "categorical (int or text)",
                    });
                }
            }
        }

        // Drop the first category; its indicator is implied by the rest.
        let kept: Vec<Category> = categories.into_iter().skip(1).collect();
        let out = kept
            .into_iter()
            .map(|category| {
                let indicators = column
                    .iter()
                    .map(|cell| {
                        let hit = Category::from_cell(cell)
                            .map(|c| c == category)
                            .unwrap_or(false);
                        Cell::Int(hit as i64)
                    })
                    .collect();
                (
                    format!("{}_{}", self.feature_to_encode, category.label()),
                    indicators,
                )
            })
            .collect();
        Ok(FeatureOutput::Multi(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_of_day_names_drop_first() {
        let mut table = Table::new();
        let names = [
            "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
        ];
        table
            .push_column(
                "weekday",
                names.iter().map(|n| Cell::Text(n.to_string())).collect(),
            )
            .unwrap();

        let out = OneHotEncoder::new("weekday").extract(&table).unwrap();
        let columns = match out {
            FeatureOutput::Multi(cols) => cols,
            FeatureOutput::Single(_) => panic!("expected multi"),
        };

        // Seven categories, drop-first leaves six indicators. "Friday" is
        // alphabetically first, so it is the dropped one.
        assert_eq!(columns.len(), 6);
        assert!(columns.iter().all(|(name, _)| name != "weekday_Friday"));
        assert!(columns.iter().any(|(name, _)| name == "weekday_Monday"));

        // Each row indicates into at most one category.
        for row in 0..7 {
            let total: i64 = columns
                .iter()
                .map(|(_, col)| col[row].as_i64().unwrap())
                .sum();
            assert!(total == 0 || total == 1);
        }
    }

    #[test]
    fn test_integer_categories_sort_numerically() {
        let mut table = Table::new();
        table
            .push_column(
                "hour_of_day",
                vec![Cell::Int(10), Cell::Int(9), Cell::Int(15)],
            )
            .unwrap();
        let out = OneHotEncoder::new("hour_of_day").extract(&table).unwrap();
        let columns = match out {
            FeatureOutput::Multi(cols) => cols,
            FeatureOutput::Single(_) => panic!("expected multi"),
        };
        // Smallest hour (9) is dropped, not the lexically smallest ("10").
        let names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["hour_of_day_10", "hour_of_day_15"]);
    }

    #[test]
    fn test_missing_rows_indicate_nothing() {
        let mut table = Table::new();
        table
            .push_column(
                "weekday",
                vec![
                    Cell::Text("Monday".to_string()),
                    Cell::Missing,
                    Cell::Text("Tuesday".to_string()),
                ],
            )
            .unwrap();
        let out = OneHotEncoder::new("weekday").extract(&table).unwrap();
        let columns = match out {
            FeatureOutput::Multi(cols) => cols,
            FeatureOutput::Single(_) => panic!("expected multi"),
        };
        let total: i64 = columns
            .iter()
            .map(|(_, col)| col[1].as_i64().unwrap())
            .sum();
        assert_eq!(total, 0);
    }
}
