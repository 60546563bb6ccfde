//! Loading CSV, XLSX and JSON data files for bulk import
//!
//! The format is picked from the file extension only. Tabular formats are read
//! into a [`Table`] and then turned into records (`header -> cell`), which is
//! the same shape a JSON array of objects has.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, DataType, Reader, Xlsx, XlsxError};
use dbconnector_core::{ConnectorError, Table};
use dbconnector_types::FileFormat;
use serde_json::{Map, Number, Value};
use tracing::debug;

/// Load a data file as a JSON value.
///
/// JSON files are returned exactly as parsed. CSV and XLSX files become an
/// array of objects, one per data row.
pub fn load_records(path: impl AsRef<Path>) -> Result<Value, ConnectorError> {
    let path = path.as_ref();
    let format = FileFormat::from_path(path).ok_or_else(|| {
        ConnectorError::MalformedInput(format!(
            "unsupported file extension for '{}': expected .csv, .xlsx or .json",
            path.display()
        ))
    })?;

    let value = if format.is_tabular() {
        let table = read_table(path, format)?;
        Value::Array(
            records_from_table(&table)
                .into_iter()
                .map(Value::Object)
                .collect(),
        )
    } else {
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader).map_err(|e| {
            ConnectorError::MalformedInput(format!("invalid JSON in '{}': {}", path.display(), e))
        })?
    };

    debug!(path = %path.display(), %format, "Loaded data file");
    Ok(value)
}

/// Read a tabular file: first row is the header
pub fn read_table(path: impl AsRef<Path>, format: FileFormat) -> Result<Table, ConnectorError> {
    match format {
        FileFormat::Csv => read_csv(path.as_ref()),
        FileFormat::Xlsx => read_xlsx(path.as_ref()),
        FileFormat::Json => Err(ConnectorError::MalformedInput(
            "JSON files are not tabular".to_string(),
        )),
    }
}

/// Turn each table row into a record keyed by the header
pub fn records_from_table(table: &Table) -> Vec<Map<String, Value>> {
    table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned().chain(std::iter::repeat(Value::Null)))
                .collect()
        })
        .collect()
}

/// Rename repeated headers to `name.1`, `name.2`, ... so no column is lost
fn dedupe_headers(columns: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    columns
        .into_iter()
        .map(|mut name| {
            let mut count = seen.get(&name).copied().unwrap_or(0);
            while count > 0 {
                seen.insert(name.clone(), count + 1);
                name = format!("{}.{}", name, count);
                count = seen.get(&name).copied().unwrap_or(0);
            }
            seen.insert(name.clone(), 1);
            name
        })
        .collect()
}

fn read_csv(path: &Path) -> Result<Table, ConnectorError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(csv_error)?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(infer_cell).collect());
    }

    Ok(Table::new(dedupe_headers(columns), rows))
}

fn read_xlsx(path: &Path) -> Result<Table, ConnectorError> {
    let mut workbook: Xlsx<_> = open_workbook(path).map_err(xlsx_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            ConnectorError::MalformedInput(format!("workbook '{}' has no sheets", path.display()))
        })?
        .map_err(xlsx_error)?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|cell| cell.to_string()).collect(),
        None => return Ok(Table::default()),
    };
    let rows = rows.map(|row| row.iter().map(excel_cell).collect()).collect();

    Ok(Table::new(dedupe_headers(columns), rows))
}

/// Type a text cell the way a dataframe reader would
fn infer_cell(raw: &str) -> Value {
    let text = raw.trim();
    if text.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = text.parse::<f64>() {
        if let Some(n) = Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match text {
        "True" | "true" | "TRUE" => Value::Bool(true),
        "False" | "false" | "FALSE" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

fn excel_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::Number((*i).into()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::Number((*f as i64).into())
        }
        Data::Float(f) => Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        Data::DateTime(_) => cell
            .as_datetime()
            .map(|dt| Value::String(dt.format("%Y-%m-%dT%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        Data::Error(_) => Value::Null,
        other => Value::String(other.to_string()),
    }
}

fn csv_error(err: csv::Error) -> ConnectorError {
    ConnectorError::IoFailure(format!("CSV read failed: {}", err))
}

fn xlsx_error(err: XlsxError) -> ConnectorError {
    ConnectorError::IoFailure(format!("XLSX read failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "people.csv",
            "name,age,city\nabc,27,New York\nxyz,31,\nlmn,4.5,Pune\n",
        );

        let records = load_records(&path).unwrap();
        let records = records.as_array().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0], json!({"name": "abc", "age": 27, "city": "New York"}));
        assert_eq!(records[1]["city"], Value::Null);
        assert_eq!(records[2]["age"], json!(4.5));
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_repeated_csv_headers_keep_every_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "dup.csv", "a,b,a,a\n1,2,3,4\n");

        let records = load_records(&path).unwrap();
        assert_eq!(records, json!([{"a": 1, "b": 2, "a.1": 3, "a.2": 4}]));
        let keys: Vec<&String> = records[0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b", "a.1", "a.2"]);
    }

    #[test]
    fn test_dedupe_headers_skips_taken_names() {
        let names = dedupe_headers(vec!["x".into(), "x.1".into(), "y".into(), "y".into()]);
        assert_eq!(names, vec!["x", "x.1", "y", "y.1"]);
    }

    #[test]
    fn test_load_json_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "one.json", r#"{"name": "abc", "tags": ["x"]}"#);
        assert_eq!(load_records(&path).unwrap(), json!({"name": "abc", "tags": ["x"]}));
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "broken.json", "{ not json");
        assert!(matches!(
            load_records(&path),
            Err(ConnectorError::MalformedInput(_))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "data.txt", "a,b\n1,2\n");
        let err = load_records(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported file extension"));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_records("/nonexistent/people.csv"),
            Err(ConnectorError::IoFailure(_))
        ));
    }

    #[test]
    fn test_infer_cell() {
        assert_eq!(infer_cell(""), Value::Null);
        assert_eq!(infer_cell("42"), json!(42));
        assert_eq!(infer_cell("-1.5"), json!(-1.5));
        assert_eq!(infer_cell("True"), json!(true));
        assert_eq!(infer_cell("false"), json!(false));
        assert_eq!(infer_cell("New York"), json!("New York"));
    }

    #[test]
    fn test_records_from_short_row() {
        let table = Table::new(vec!["a".into(), "b".into()], vec![vec![json!(1)]]);
        let records = records_from_table(&table);
        assert_eq!(Value::Object(records[0].clone()), json!({"a": 1, "b": null}));
    }
}
