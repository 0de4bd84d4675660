//! CSV file data adapter.
//!
//! One table per `{base_path}/{name}.csv`. The `timestamp` (or `date`)
//! column becomes the index; every other column is numeric when each
//! non-empty cell parses as a finite number, text otherwise.

use crate::domain::error::MeanrevError;
use crate::domain::ohlcv::{Column, ColumnData, OhlcvTable, TIMESTAMP};
use crate::ports::data_port::DataPort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing::info;

/// Fractional seconds are optional when parsing and only written when present.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", name))
    }
}

impl DataPort for CsvAdapter {
    fn fetch_table(&self, name: &str) -> Result<OhlcvTable, MeanrevError> {
        let path = self.csv_path(name);
        let file = fs::File::open(&path).map_err(|e| MeanrevError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        let table = read_table(file)?;
        info!(path = %path.display(), rows = table.len(), "loaded table");
        Ok(table)
    }

    fn store_table(&self, name: &str, table: &OhlcvTable) -> Result<(), MeanrevError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(name);
        let file = fs::File::create(&path)?;
        write_table(table, file)?;
        info!(path = %path.display(), rows = table.len(), "stored table");
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>, MeanrevError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| MeanrevError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| MeanrevError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if let Some(stem) = name_str.strip_suffix(".csv") {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

fn csv_error(e: csv::Error) -> MeanrevError {
    MeanrevError::Data {
        reason: format!("CSV parse error: {}", e),
    }
}

fn is_missing(cell: &str) -> bool {
    let cell = cell.trim();
    cell.is_empty()
        || cell.eq_ignore_ascii_case("nan")
        || cell.eq_ignore_ascii_case("na")
        || cell.eq_ignore_ascii_case("null")
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS+HH:MM`, naive date-times with a
/// space or `T` separator, and plain dates. Offsets are normalised to UTC.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_utc());
    }
    for fmt in [TIMESTAMP_FORMAT, "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn read_table<R: Read>(reader: R) -> Result<OhlcvTable, MeanrevError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers().map_err(csv_error)?.clone();

    let ts_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(TIMESTAMP) || h.eq_ignore_ascii_case("date"))
        .ok_or_else(|| MeanrevError::MissingColumn {
            column: TIMESTAMP.into(),
        })?;
    let names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != ts_idx)
        .map(|(_, h)| h.to_string())
        .collect();

    let mut rows: Vec<(NaiveDateTime, Vec<String>)> = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(csv_error)?;
        let raw_ts = record.get(ts_idx).unwrap_or_default();
        let ts = parse_timestamp(raw_ts).ok_or_else(|| MeanrevError::Data {
            reason: format!("invalid timestamp '{}' on data row {}", raw_ts, line + 1),
        })?;
        let cells = record
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ts_idx)
            .map(|(_, c)| c.to_string())
            .collect();
        rows.push((ts, cells));
    }
    rows.sort_by_key(|(ts, _)| *ts);

    let columns = names
        .iter()
        .enumerate()
        .map(|(j, name)| build_column(name, rows.iter().map(|(_, cells)| cells[j].as_str())))
        .collect();
    let timestamps = rows.into_iter().map(|(ts, _)| ts).collect();

    OhlcvTable::from_columns(timestamps, columns)
}

fn build_column<'a>(name: &str, cells: impl Iterator<Item = &'a str> + Clone) -> Column {
    let numeric = cells
        .clone()
        .filter(|c| !is_missing(c))
        .all(|c| c.parse::<f64>().is_ok());

    if numeric {
        Column::numeric(
            name,
            cells
                .map(|c| c.parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect(),
        )
    } else {
        Column::text(
            name,
            cells
                .map(|c| (!is_missing(c)).then(|| c.to_string()))
                .collect(),
        )
    }
}

pub fn write_table<W: Write>(table: &OhlcvTable, writer: W) -> Result<(), MeanrevError> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec![TIMESTAMP.to_string()];
    header.extend(table.column_names().into_iter().map(str::to_string));
    wtr.write_record(&header).map_err(csv_error)?;

    for (row, ts) in table.timestamps().iter().enumerate() {
        let mut record = vec![ts.format(TIMESTAMP_FORMAT).to_string()];
        for col in table.columns() {
            let cell = match &col.data {
                ColumnData::Numeric(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
                ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
            };
            record.push(cell);
        }
        wtr.write_record(&record).map_err(csv_error)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RAW: &str = "timestamp,open,high,low,close,volume,symbol\n\
        2024-01-02 14:31:00+00:00,100.0,101.0,99.5,100.5,1200,SPY\n\
        2024-01-02 14:30:00+00:00,99.0,100.5,98.0,,1000,\n\
        2024-01-02 14:32:00+00:00,100.5,102.0,100.0,101.5,NaN,SPY\n";

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();
        fs::write(path.join("spy_minute.csv"), RAW).unwrap();
        fs::write(path.join("qqq_daily.csv"), "date,close\n2024-01-02,400.0\n").unwrap();
        fs::write(path.join("notes.txt"), "ignore me").unwrap();
        (dir, path)
    }

    #[test]
    fn fetch_table_sorts_and_types_columns() {
        let (_dir, path) = setup_test_data();
        let table = CsvAdapter::new(path).fetch_table("spy_minute").unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.timestamps()[0],
            parse_timestamp("2024-01-02 14:30:00").unwrap()
        );
        assert_eq!(
            table.numeric("close").unwrap(),
            &[None, Some(100.5), Some(101.5)]
        );
        assert_eq!(
            table.numeric("volume").unwrap(),
            &[Some(1000.0), Some(1200.0), None]
        );
        assert!(!table.column("symbol").unwrap().is_numeric());
        assert_eq!(table.missing_count(), 3);
    }

    #[test]
    fn date_column_is_accepted_as_index() {
        let (_dir, path) = setup_test_data();
        let table = CsvAdapter::new(path).fetch_table("qqq_daily").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_names(), vec!["close"]);
    }

    #[test]
    fn fetch_table_missing_file() {
        let (_dir, path) = setup_test_data();
        let result = CsvAdapter::new(path).fetch_table("nope");
        assert!(matches!(result, Err(MeanrevError::Data { .. })));
    }

    #[test]
    fn missing_timestamp_column() {
        let err = read_table("open,close\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, MeanrevError::MissingColumn { column } if column == "timestamp"));
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let err = read_table("timestamp,close\nyesterday,2\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("data row 1"));
    }

    #[test]
    fn list_tables_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let names = CsvAdapter::new(path).list_tables().unwrap();
        assert_eq!(names, vec!["qqq_daily", "spy_minute"]);
    }

    #[test]
    fn store_then_fetch_preserves_table() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path.join("cleaned"));
        let table = read_table(RAW.as_bytes()).unwrap();

        adapter.store_table("spy", &table).unwrap();
        let reloaded = adapter.fetch_table("spy").unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn parses_supported_timestamp_shapes() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-02T14:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T09:30:00-05:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 14:30:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02 14:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-02T14:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-02"),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("02/01/2024"), None);
    }

    #[test]
    fn fractional_seconds_survive_store_and_fetch() {
        let half_past = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_milli_opt(14, 30, 0, 500)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-02 14:30:00.5"), Some(half_past));
        assert_eq!(parse_timestamp("2024-01-02T14:30:00.500Z"), Some(half_past));

        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let table = read_table(
            "timestamp,close\n2024-01-02 14:30:00,10.0\n2024-01-02 14:30:00.5,10.5\n".as_bytes(),
        )
        .unwrap();
        assert_eq!(table.timestamps()[1], half_past);

        adapter.store_table("ticks", &table).unwrap();
        let written = fs::read_to_string(adapter.csv_path("ticks")).unwrap();
        assert!(written.contains("2024-01-02 14:30:00.500,"));
        assert!(written.contains("2024-01-02 14:30:00,"));
        assert_eq!(adapter.fetch_table("ticks").unwrap(), table);
    }
}
