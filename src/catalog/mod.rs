pub mod record;
pub mod schema;

pub use record::{Record, Value};
pub use schema::{Attribute, DataType, Schema};
