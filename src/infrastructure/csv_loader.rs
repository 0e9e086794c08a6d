//! Loads a raw per-minute CSV scrape into a [`Table`].
//!
//! Column typing follows the raw schema: `date` parses to a datetime at
//! midnight, `minute` stays as "HH:MM" text, everything else parses as
//! numeric where possible. Empty fields become `Missing`.

use crate::domain::fields;
use crate::domain::table::{Cell, Column, Table};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

fn parse_cell(header: &str, raw: &str) -> Result<Cell> {
    if raw.is_empty() {
        return Ok(Cell::Missing);
    }
    match header {
        fields::DATE => {
            let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("Invalid date value `{}`", raw))?;
            Ok(Cell::DateTime(date.and_hms_opt(0, 0, 0).expect("midnight is valid")))
        }
        fields::MINUTE => Ok(Cell::Text(raw.to_string())),
        // Non-numeric passthrough columns (e.g. display labels) stay as
        // text; they are never exported but must not read as missing.
        _ => Ok(raw
            .parse::<f64>()
            .map_or_else(|_| Cell::Text(raw.to_string()), Cell::from_f64)),
    }
}

/// Reads the CSV at `path` into a table, preserving header order.
pub fn load_raw_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open raw data file {:?}", path))?;
    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut columns: Vec<Column> = vec![Vec::new(); headers.len()];
    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", line))?;
        for (col, raw) in record.iter().enumerate() {
            columns[col].push(
                parse_cell(&headers[col], raw)
                    .with_context(|| format!("Row {}, column `{}`", line, headers[col]))?,
            );
        }
    }

    let mut table = Table::new();
    for (header, column) in headers.into_iter().zip(columns) {
        table.push_column(header, column)?;
    }
    info!(rows = table.num_rows(), columns = table.column_names().len(), "loaded raw CSV");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_types_and_missing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,minute,volume,marketAverage").unwrap();
        writeln!(file, "2021-04-20,09:30,120,100.5").unwrap();
        writeln!(file, "2021-04-20,09:31,,101.0").unwrap();
        file.flush().unwrap();

        let table = load_raw_csv(file.path()).unwrap();
        assert_eq!(table.num_rows(), 2);
        assert!(table.cell(fields::DATE, 0).unwrap().as_datetime().is_some());
        assert_eq!(table.cell(fields::MINUTE, 1).unwrap().as_text(), Some("09:31"));
        assert_eq!(table.cell(fields::VOLUME, 0).unwrap().as_f64(), Some(120.0));
        assert!(table.cell(fields::VOLUME, 1).unwrap().is_missing());
    }

    #[test]
    fn test_malformed_date_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,minute").unwrap();
        writeln!(file, "not-a-date,09:30").unwrap();
        file.flush().unwrap();
        assert!(load_raw_csv(file.path()).is_err());
    }
}
