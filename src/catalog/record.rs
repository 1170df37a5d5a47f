//! Records are opaque fixed-width byte payloads plus an optional `Rid`.
//! `get_attr`/`set_attr` are the only decode/encode points — the in-memory
//! representation is byte-identical to the on-disk one, so there is no
//! second codec to keep in sync (spec §9 "Records as typed bytes").

use crate::catalog::schema::{DataType, Schema};
use crate::common::config::Rid;
use crate::common::error::{DbError, DbResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
}

#[derive(Debug, Clone)]
pub struct Record {
    pub id: Option<Rid>,
    pub data: Vec<u8>,
}

impl Record {
    /// A zero-filled record payload sized to `schema`, with no assigned id.
    pub fn new(schema: &Schema) -> Self {
        Self {
            id: None,
            data: vec![0u8; schema.record_size()],
        }
    }

    /// Builds a record from already-packed bytes (e.g. a slot's payload
    /// read back off a data page). `data.len()` must equal
    /// `schema.record_size()`.
    pub fn from_bytes(id: Option<Rid>, data: Vec<u8>, schema: &Schema) -> DbResult<Self> {
        if data.len() != schema.record_size() {
            return Err(DbError::InvalidParam(format!(
                "record payload is {} bytes, schema expects {}",
                data.len(),
                schema.record_size()
            )));
        }
        Ok(Self { id, data })
    }

    /// Reads attribute `i`, decoding its bytes per `schema`'s type for that
    /// column.
    pub fn get_attr(&self, schema: &Schema, i: usize) -> DbResult<Value> {
        let attr = schema.attribute(i)?;
        let offset = schema.offset_of(i);
        let width = attr.data_type.width();
        let bytes = &self.data[offset..offset + width];

        Ok(match attr.data_type {
            DataType::Int => Value::Int(i32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Float => Value::Float(f32::from_le_bytes(bytes.try_into().unwrap())),
            DataType::Bool => Value::Bool(bytes[0] != 0),
            DataType::String(_) => {
                let nul = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Value::String(String::from_utf8_lossy(&bytes[..nul]).into_owned())
            }
        })
    }

    /// Writes attribute `i`. `STRING(n)` values are right-truncated to `n`
    /// bytes and zero-padded for any residue, per spec §4.4.
    pub fn set_attr(&mut self, schema: &Schema, i: usize, value: &Value) -> DbResult<()> {
        let attr = schema.attribute(i)?;
        let offset = schema.offset_of(i);
        let width = attr.data_type.width();

        match (attr.data_type, value) {
            (DataType::Int, Value::Int(v)) => {
                self.data[offset..offset + width].copy_from_slice(&v.to_le_bytes());
            }
            (DataType::Float, Value::Float(v)) => {
                self.data[offset..offset + width].copy_from_slice(&v.to_le_bytes());
            }
            (DataType::Bool, Value::Bool(v)) => {
                self.data[offset] = *v as u8;
            }
            (DataType::String(n), Value::String(s)) => {
                let slot = &mut self.data[offset..offset + width];
                slot.fill(0);
                let bytes = s.as_bytes();
                let copy_len = bytes.len().min(n as usize);
                slot[..copy_len].copy_from_slice(&bytes[..copy_len]);
            }
            _ => {
                return Err(DbError::InvalidParam(format!(
                    "value type mismatch for attribute {i} ({:?})",
                    attr.data_type
                )))
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::Attribute;

    fn schema() -> Schema {
        Schema::new(
            vec![
                Attribute::new("a", DataType::Int).unwrap(),
                Attribute::new("b", DataType::String(4)).unwrap(),
                Attribute::new("c", DataType::Int).unwrap(),
            ],
            vec![0],
        )
        .unwrap()
    }

    #[test]
    fn set_then_get_round_trips_for_every_type() {
        let schema = Schema::new(
            vec![
                Attribute::new("i", DataType::Int).unwrap(),
                Attribute::new("f", DataType::Float).unwrap(),
                Attribute::new("b", DataType::Bool).unwrap(),
                Attribute::new("s", DataType::String(6)).unwrap(),
            ],
            vec![],
        )
        .unwrap();
        let mut record = Record::new(&schema);

        record.set_attr(&schema, 0, &Value::Int(-7)).unwrap();
        record.set_attr(&schema, 1, &Value::Float(3.5)).unwrap();
        record.set_attr(&schema, 2, &Value::Bool(true)).unwrap();
        record.set_attr(&schema, 3, &Value::String("hi".into())).unwrap();

        assert_eq!(Value::Int(-7), record.get_attr(&schema, 0).unwrap());
        assert_eq!(Value::Float(3.5), record.get_attr(&schema, 1).unwrap());
        assert_eq!(Value::Bool(true), record.get_attr(&schema, 2).unwrap());
        assert_eq!(Value::String("hi".into()), record.get_attr(&schema, 3).unwrap());
    }

    #[test]
    fn string_value_is_truncated_to_field_width() {
        let schema = schema();
        let mut record = Record::new(&schema);
        record.set_attr(&schema, 1, &Value::String("aaaaa".into())).unwrap();
        assert_eq!(Value::String("aaaa".into()), record.get_attr(&schema, 1).unwrap());
    }

    #[test]
    fn string_value_shorter_than_field_is_zero_padded() {
        let schema = schema();
        let mut record = Record::new(&schema);
        record.set_attr(&schema, 1, &Value::String("hi".into())).unwrap();
        let offset = schema.offset_of(1);
        assert_eq!(&record.data[offset..offset + 4], b"hi\0\0");
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let schema = schema();
        assert!(Record::from_bytes(None, vec![0u8; 3], &schema).is_err());
    }
}
