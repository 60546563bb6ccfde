//! Type definitions for dbconnector
//!
//! Small enums shared by every crate in the workspace: which database a
//! connector talks to, which file formats can be imported or exported, and
//! the one/many choice used by insert, delete and update.

pub mod connector;
pub mod format;
pub mod multiplicity;

pub use connector::Connector;
pub use format::{ExportFormat, FileFormat};
pub use multiplicity::Multiplicity;
