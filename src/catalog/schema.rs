//! Typed column layout: `DataType`, `Attribute`, and the `Schema` that packs
//! them into a fixed-width record. Every width is decided once, at table
//! creation, and then frozen — there is no schema evolution.

use crate::common::config::MAX_ATTR_NAME_LEN;
use crate::common::error::{DbError, DbResult};

/// The four column types spec §4.4 names, with their on-disk widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int,
    Float,
    Bool,
    /// Fixed-width string of `n` bytes, right-truncated/zero-padded.
    String(u32),
}

impl DataType {
    /// Width in bytes this type occupies in a packed record payload.
    pub fn width(&self) -> usize {
        match self {
            DataType::Int => 4,
            DataType::Float => 4,
            DataType::Bool => 1,
            DataType::String(n) => *n as usize,
        }
    }

    /// The `dataType` enum tag used in the table-metadata page layout
    /// (spec §6: `0=INT,1=STRING,2=FLOAT,3=BOOL`).
    pub fn tag(&self) -> i32 {
        match self {
            DataType::Int => 0,
            DataType::String(_) => 1,
            DataType::Float => 2,
            DataType::Bool => 3,
        }
    }

    /// Reconstructs a `DataType` from its on-disk tag and `typeLength`
    /// field (the latter is meaningful only for `STRING`).
    pub fn from_tag(tag: i32, type_length: u32) -> DbResult<Self> {
        match tag {
            0 => Ok(DataType::Int),
            1 => Ok(DataType::String(type_length)),
            2 => Ok(DataType::Float),
            3 => Ok(DataType::Bool),
            other => Err(DbError::InvalidParam(format!(
                "unknown data type tag {other} in table metadata"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub data_type: DataType,
}

impl Attribute {
    pub fn new(name: impl Into<String>, data_type: DataType) -> DbResult<Self> {
        let name = name.into();
        if name.is_empty() || name.as_bytes().len() > MAX_ATTR_NAME_LEN {
            return Err(DbError::InvalidParam(format!(
                "attribute name {name:?} must be 1..={MAX_ATTR_NAME_LEN} bytes"
            )));
        }
        Ok(Self { name, data_type })
    }
}

/// An immutable, ordered column list plus an informational (unenforced)
/// primary key.
#[derive(Debug, Clone)]
pub struct Schema {
    attributes: Vec<Attribute>,
    key_indices: Vec<usize>,
    record_size: usize,
    offsets: Vec<usize>,
}

impl Schema {
    pub fn new(attributes: Vec<Attribute>, key_indices: Vec<usize>) -> DbResult<Self> {
        if attributes.is_empty() {
            return Err(DbError::InvalidParam("schema needs at least one attribute".into()));
        }
        for &k in &key_indices {
            if k >= attributes.len() {
                return Err(DbError::InvalidParam(format!(
                    "key index {k} out of range for {} attributes",
                    attributes.len()
                )));
            }
        }

        let mut offsets = Vec::with_capacity(attributes.len());
        let mut running = 0usize;
        for attr in &attributes {
            offsets.push(running);
            running += attr.data_type.width();
        }

        Ok(Self {
            attributes,
            key_indices,
            record_size: running,
            offsets,
        })
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn key_indices(&self) -> &[usize] {
        &self.key_indices
    }

    pub fn num_attrs(&self) -> usize {
        self.attributes.len()
    }

    /// Total packed payload width: the sum of every attribute's width.
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Byte offset of attribute `i` within the record payload.
    pub fn offset_of(&self, i: usize) -> usize {
        self.offsets[i]
    }

    pub fn attribute(&self, i: usize) -> DbResult<&Attribute> {
        self.attributes
            .get(i)
            .ok_or_else(|| DbError::InvalidParam(format!("no attribute at index {i}")))
    }
}
