//! Profile validation

use dbconnector_core::{ConnectorError, MongoProfile, MySqlProfile, Profile};
use once_cell::sync::Lazy;
use regex::Regex;

/// Characters the document server refuses in database names
static DATABASE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[^/\\. "$*<>:|?\x00]{1,63}$"#).expect("valid database pattern"));

/// Collection names: no `$`, no NUL, not in the `system.` namespace
static COLLECTION_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^$\x00]{1,255}$").expect("valid collection pattern"));

/// Profile validator
#[derive(Debug, Default, Clone, Copy)]
pub struct ProfileValidator;

impl ProfileValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate the whole profile
    pub fn validate(&self, profile: &Profile) -> Result<(), ConnectorError> {
        if profile.mysql.is_none() && profile.mongodb.is_none() {
            return Err(ConnectorError::Validation(
                "Profile must contain a 'mysql' or 'mongodb' section".to_string(),
            ));
        }
        if let Some(mysql) = &profile.mysql {
            self.validate_mysql(mysql)?;
        }
        if let Some(mongo) = &profile.mongodb {
            self.validate_mongodb(mongo)?;
        }
        Ok(())
    }

    fn validate_mysql(&self, mysql: &MySqlProfile) -> Result<(), ConnectorError> {
        if mysql.options.is_empty() {
            return Err(ConnectorError::Validation(
                "mysql options cannot be empty".to_string(),
            ));
        }
        if mysql.retry.max_attempts == 0 {
            return Err(ConnectorError::Validation(
                "mysql retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_mongodb(&self, mongo: &MongoProfile) -> Result<(), ConnectorError> {
        if !(mongo.uri.starts_with("mongodb://") || mongo.uri.starts_with("mongodb+srv://")) {
            return Err(ConnectorError::Validation(
                "mongodb uri must start with 'mongodb://' or 'mongodb+srv://'".to_string(),
            ));
        }
        if mongo.collection.is_some() && mongo.database.is_none() {
            return Err(ConnectorError::Validation(
                "mongodb collection requires a database".to_string(),
            ));
        }
        if let Some(database) = &mongo.database {
            validate_database_name(database)?;
        }
        if let Some(collection) = &mongo.collection {
            validate_collection_name(collection)?;
        }
        Ok(())
    }
}

/// Check a document-store database name
pub fn validate_database_name(name: &str) -> Result<(), ConnectorError> {
    if DATABASE_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(ConnectorError::InvalidContext(format!(
            "Invalid database name '{}'",
            name
        )))
    }
}

/// Check a document-store collection name
pub fn validate_collection_name(name: &str) -> Result<(), ConnectorError> {
    if COLLECTION_NAME_PATTERN.is_match(name) && !name.starts_with("system.") {
        Ok(())
    } else {
        Err(ConnectorError::InvalidContext(format!(
            "Invalid collection name '{}'",
            name
        )))
    }
}
