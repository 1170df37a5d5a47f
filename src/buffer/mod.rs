pub mod buffer_pool_manager;
pub mod replacer;

pub use buffer_pool_manager::BufferPoolManager;
pub use replacer::{ReplacementPolicy, Replacer};
