pub mod heap;
pub mod metadata;
pub mod scan;

pub use heap::Table;
pub use metadata::TableMetadata;
pub use scan::{Predicate, ScanCursor};
