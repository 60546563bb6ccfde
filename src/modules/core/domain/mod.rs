//! Domain models for dbconnector

mod payload;
mod profile;
mod table;

pub use payload::{bson_type_name, InsertPayload};
pub use profile::{redact_credentials, MongoProfile, MySqlProfile, Profile, RelationalConfig, RetryPolicy};
pub use table::Table;
