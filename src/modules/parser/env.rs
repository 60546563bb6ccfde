//! Environment variable substitution for profile files

use dbconnector_core::ConnectorError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Placeholder syntax: `{{ env.VAR_NAME }}`
static ENV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid env pattern")
});

/// Replaces `{{ env.VAR }}` placeholders with values from the environment.
/// Any missing variable is an error.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSubstitutor;

impl EnvSubstitutor {
    pub fn new() -> Self {
        Self
    }

    /// Substitute placeholders, loading `.env` first if one exists
    pub fn substitute(&self, content: &str) -> Result<String, ConnectorError> {
        let _ = dotenvy::dotenv();
        self.substitute_with(content, |name| std::env::var(name).ok())
    }

    /// Substitute placeholders using an explicit lookup
    pub fn substitute_with(
        &self,
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConnectorError> {
        let mut missing: Vec<String> = Vec::new();

        let result = ENV_PATTERN.replace_all(content, |cap: &Captures| {
            let name = &cap[1];
            match lookup(name) {
                Some(value) => value,
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    cap[0].to_string()
                }
            }
        });

        if !missing.is_empty() {
            return Err(ConnectorError::EnvVarNotFound(missing.join(", ")));
        }

        Ok(result.into_owned())
    }

    /// Names of all variables referenced in `content`, in order of appearance
    pub fn referenced_vars(content: &str) -> Vec<String> {
        ENV_PATTERN
            .captures_iter(content)
            .map(|cap| cap[1].to_string())
            .collect()
    }
}
