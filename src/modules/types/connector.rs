//! Backends a profile can target

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which backend a command talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connector {
    /// Relational backend reached over the MySQL wire protocol
    Mysql,
    Mongodb,
}

impl Connector {
    /// Profile section key holding this backend's settings
    pub fn section(&self) -> &'static str {
        match self {
            Connector::Mysql => "mysql",
            Connector::Mongodb => "mongodb",
        }
    }
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}
