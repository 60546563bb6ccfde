//! YAML profile parser

use dbconnector_core::{ConnectorError, MongoProfile, MySqlProfile, Profile, RelationalConfig, RetryPolicy};
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::env::EnvSubstitutor;

/// YAML parser for connection profiles
pub struct YamlParser;

/// Shorthand layout: driver options directly under `mysql:` and the
/// connection string directly under `mongodb:`.
///
/// ```yaml
/// mysql:
///   host: localhost
///   user: root
///   retry: { max_attempts: 5 }
/// mongodb: "mongodb://localhost:27017"
/// ```
#[derive(Debug, Deserialize)]
struct ShorthandProfile {
    #[serde(default)]
    mysql: Option<BTreeMap<String, serde_yaml::Value>>,

    #[serde(default)]
    mongodb: Option<ShorthandMongo>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ShorthandMongo {
    Uri(String),
    Full(MongoProfile),
}

impl YamlParser {
    /// Parse a YAML string into a Profile, substituting environment variables
    pub fn parse(content: &str) -> Result<Profile, ConnectorError> {
        let substituted = EnvSubstitutor::new().substitute(content)?;
        Self::parse_raw(&substituted)
    }

    /// Parse a YAML string without environment variable substitution
    pub fn parse_raw(content: &str) -> Result<Profile, ConnectorError> {
        if let Ok(profile) = serde_yaml::from_str::<Profile>(content) {
            return Ok(profile);
        }

        let shorthand = serde_yaml::from_str::<ShorthandProfile>(content)
            .map_err(|e| ConnectorError::Config(format!("YAML parse error: {}", e)))?;
        shorthand_to_profile(shorthand)
    }
}

fn shorthand_to_profile(cfg: ShorthandProfile) -> Result<Profile, ConnectorError> {
    let mysql = match cfg.mysql {
        Some(mut map) => {
            let retry = match map.remove("retry") {
                Some(value) => serde_yaml::from_value::<RetryPolicy>(value)
                    .map_err(|e| ConnectorError::Config(format!("Invalid 'retry' section: {}", e)))?,
                None => RetryPolicy::default(),
            };
            let options = map
                .into_iter()
                .map(|(key, value)| {
                    serde_yaml::from_value::<serde_json::Value>(value)
                        .map(|v| (key.clone(), v))
                        .map_err(|e| {
                            ConnectorError::Config(format!("Invalid mysql option '{}': {}", key, e))
                        })
                })
                .collect::<Result<RelationalConfig, _>>()?;
            Some(MySqlProfile { options, retry })
        }
        None => None,
    };

    let mongodb = cfg.mongodb.map(|m| match m {
        ShorthandMongo::Uri(uri) => MongoProfile {
            uri,
            database: None,
            collection: None,
        },
        ShorthandMongo::Full(profile) => profile,
    });

    Ok(Profile { mysql, mongodb })
}
