//! Profile parsing and data file loading for dbconnector
//!
//! This crate handles parsing of YAML connection profiles (with environment
//! variable substitution and validation) and loading CSV, XLSX and JSON data
//! files into records for bulk import.

pub mod datafile;
pub mod env;
pub mod validator;
pub mod yaml;

pub use datafile::{load_records, read_table, records_from_table};
pub use validator::ProfileValidator;
pub use yaml::YamlParser;

use dbconnector_core::{ConnectorError, Profile};

/// Parse a profile file from a path
pub fn parse_file(path: &str) -> Result<Profile, ConnectorError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConnectorError::Config(format!("Failed to read file '{}': {}", path, e)))?;

    parse_string(&content)
}

/// Parse a profile from a string
pub fn parse_string(content: &str) -> Result<Profile, ConnectorError> {
    let profile = YamlParser::parse(content)?;

    let validator = ProfileValidator::new();
    validator.validate(&profile)?;

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_profile() {
        let yaml = r#"
mysql:
  options:
    host: localhost
    user: root
    database: shop
mongodb:
  uri: "mongodb://localhost:27017"
  database: shop
  collection: orders
"#;
        let profile = parse_string(yaml).unwrap();
        assert_eq!(profile.mysql.unwrap().options.len(), 3);
        assert_eq!(profile.mongodb.unwrap().collection.as_deref(), Some("orders"));
    }

    #[test]
    fn test_parse_rejects_empty_profile() {
        assert!(parse_string("{}").is_err());
    }

    #[test]
    fn test_parse_file_missing() {
        let err = parse_file("/nonexistent/dbconnector.yaml").unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
    }
}
