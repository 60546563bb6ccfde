//! One-or-many selection shared by insert, delete and update

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether an operation targets a single entry or every matching entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Multiplicity {
    One,
    Many,
}

impl Multiplicity {
    /// Interpret a yes/no answer to "more than one entry?"
    pub fn from_yes_no(answer: &str) -> Option<Self> {
        match answer.trim().to_lowercase().as_str() {
            "y" => Some(Multiplicity::Many),
            "n" => Some(Multiplicity::One),
            _ => None,
        }
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Multiplicity::One => write!(f, "one"),
            Multiplicity::Many => write!(f, "many"),
        }
    }
}

impl FromStr for Multiplicity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "one" => Ok(Multiplicity::One),
            "many" => Ok(Multiplicity::Many),
            _ => Err("choose either 'one' or 'many'".to_string()),
        }
    }
}
