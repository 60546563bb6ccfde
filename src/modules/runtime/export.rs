//! File export helpers

use dbconnector_core::{ConnectorError, Result, Table};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Resolve an export file name against the current working directory
pub fn export_path(file_name: &str) -> Result<PathBuf> {
    if file_name.trim().is_empty() {
        return Err(ConnectorError::MalformedInput(
            "export file name must not be empty".to_string(),
        ));
    }
    Ok(std::env::current_dir()?.join(file_name))
}

/// Write a header row followed by every row as CSV
pub fn write_table_csv(path: &Path, table: &Table) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(&table.columns).map_err(csv_error)?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(Table::cell_text))
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a value as indented JSON
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Check that an export actually produced a file
pub fn verify_written(path: &Path) -> Result<()> {
    if path.is_file() {
        info!("Exported to {}", path.display());
        Ok(())
    } else {
        Err(ConnectorError::IoFailure(format!(
            "export file {} was not created",
            path.display()
        )))
    }
}

fn csv_error(err: csv::Error) -> ConnectorError {
    ConnectorError::IoFailure(format!("CSV write failed: {}", err))
}
