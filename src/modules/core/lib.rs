//! Core domain logic for dbconnector
//!
//! This crate contains the configuration model, the tabular result type, the
//! insert payload classification, the decision-point strategy and the error
//! taxonomy shared by both connectors.

pub mod domain;
pub mod error;
pub mod prompt;

pub use domain::*;
pub use error::{ConnectorError, Result};
pub use prompt::{Prompter, ScriptedPrompter};
