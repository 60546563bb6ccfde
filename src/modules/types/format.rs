//! File format definitions for bulk import and export

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Formats accepted by bulk import, detected from the file extension only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    /// Comma separated values with a header row
    Csv,
    /// Excel workbook, first sheet, header row
    Xlsx,
    /// A JSON object or array of objects
    Json,
}

impl FileFormat {
    /// Detect the format from a path's extension.
    ///
    /// Matching is case-sensitive, the same way a plain suffix check is.
    /// Any other extension yields `None`; nothing is sniffed from content.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        match path.as_ref().extension()?.to_str()? {
            "csv" => Some(FileFormat::Csv),
            "xlsx" => Some(FileFormat::Xlsx),
            "json" => Some(FileFormat::Json),
            _ => None,
        }
    }

    /// Returns true if the format is parsed as a header + rows table
    pub fn is_tabular(&self) -> bool {
        !matches!(self, FileFormat::Json)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFormat::Csv => write!(f, "csv"),
            FileFormat::Xlsx => write!(f, "xlsx"),
            FileFormat::Json => write!(f, "json"),
        }
    }
}

/// Formats a collection can be exported to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Pretty-printed JSON array
    Json,
    /// Delimited text with a header row
    Csv,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err("choose either 'json' or 'csv'".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_from_path() {
        assert_eq!(FileFormat::from_path("data/users.csv"), Some(FileFormat::Csv));
        assert_eq!(FileFormat::from_path("users.xlsx"), Some(FileFormat::Xlsx));
        assert_eq!(FileFormat::from_path("/tmp/users.json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_path("users.xls"), None);
        assert_eq!(FileFormat::from_path("users.CSV"), None);
        assert_eq!(FileFormat::from_path("users"), None);
    }

    #[test]
    fn test_file_format_tabular() {
        assert!(FileFormat::Csv.is_tabular());
        assert!(FileFormat::Xlsx.is_tabular());
        assert!(!FileFormat::Json.is_tabular());
    }

    #[test]
    fn test_export_format_from_str() {
        assert_eq!(ExportFormat::from_str("json").unwrap(), ExportFormat::Json);
        assert_eq!(ExportFormat::from_str(" CSV ").unwrap(), ExportFormat::Csv);
        assert!(ExportFormat::from_str("xml").is_err());
    }
}
