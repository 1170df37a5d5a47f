//! A disk-resident storage engine: a synchronous page file, an LRU-K-family
//! buffer pool, and a slotted-page record heap with a fixed-width schema
//! codec and a forward scan. There is no SQL layer, no query planner, and no
//! CLI — the library surface is the contract (see `table::Table` and
//! `table::ScanCursor`).

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod storage;
pub mod table;

pub use catalog::{Attribute, DataType, Record, Schema, Value};
pub use common::{DbError, DbResult};
pub use table::{Predicate, ScanCursor, Table};
