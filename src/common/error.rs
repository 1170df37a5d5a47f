//! Error taxonomy for the storage engine.
//!
//! The original C assignments this crate is modeled on thread a single
//! global `char *RC_message` through every call site for diagnostics. We
//! don't: every error carries its own context, and nothing here depends on
//! process-wide state.

use crate::common::config::PageId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("out of memory")]
    Oom,

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file already exists: {0}")]
    FileAlreadyExists(String),

    #[error("file handle not initialized")]
    FileHandleNotInit,

    #[error("failed to create file: {0}")]
    FileCreationFailed(String),

    #[error("no such page: {0}")]
    NoSuchPage(PageId),

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("page not resident or no evictable frame: {0}")]
    PageNotFound(PageId),

    #[error("shutdown requested with pinned pages outstanding")]
    PinnedPages,

    #[error("tuple not found: {0:?}")]
    TupleNotFound(crate::common::config::Rid),

    #[error("no more tuples")]
    NoMoreTuples,
}

pub type DbResult<T> = Result<T, DbError>;
