//! Page 1's fixed, little-endian metadata layout (spec §6): tuple count,
//! free-page hint, record size, and the full schema — encoded and decoded
//! here, and nowhere else.

use crate::catalog::schema::{Attribute, DataType, Schema};
use crate::common::config::{PageId, FIRST_DATA_PAGE_ID, MAX_ATTR_NAME_LEN, PAGE_SIZE};
use crate::common::error::{DbError, DbResult};

const ATTR_RECORD_LEN: usize = MAX_ATTR_NAME_LEN + 4 + 4;

#[derive(Debug, Clone)]
pub struct TableMetadata {
    pub schema: Schema,
    pub num_tuples: u32,
    pub first_free_page: PageId,
}

impl TableMetadata {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            num_tuples: 0,
            first_free_page: FIRST_DATA_PAGE_ID,
        }
    }

    /// Serializes this metadata into a full `PAGE_SIZE`-byte page 1 image,
    /// zero-padded after the last used byte. Fails with `Oom` (standing in
    /// for "doesn't fit") if the schema is too wide for one page.
    pub fn encode(&self) -> DbResult<[u8; PAGE_SIZE]> {
        let mut buf = [0u8; PAGE_SIZE];
        let mut w = 0usize;

        let put_i32 = |buf: &mut [u8; PAGE_SIZE], w: &mut usize, v: i32| {
            buf[*w..*w + 4].copy_from_slice(&v.to_le_bytes());
            *w += 4;
        };

        put_i32(&mut buf, &mut w, self.num_tuples as i32);
        put_i32(&mut buf, &mut w, self.first_free_page as i32);
        put_i32(&mut buf, &mut w, self.schema.record_size() as i32);
        put_i32(&mut buf, &mut w, self.schema.num_attrs() as i32);

        for attr in self.schema.attributes() {
            let name_bytes = attr.name.as_bytes();
            if w + ATTR_RECORD_LEN > PAGE_SIZE {
                return Err(DbError::Oom);
            }
            buf[w..w + name_bytes.len()].copy_from_slice(name_bytes);
            w += MAX_ATTR_NAME_LEN;
            put_i32(&mut buf, &mut w, attr.data_type.tag());
            let type_length = match attr.data_type {
                DataType::String(n) => n as i32,
                _ => 0,
            };
            put_i32(&mut buf, &mut w, type_length);
        }

        if w + 4 > PAGE_SIZE {
            return Err(DbError::Oom);
        }
        let keys = self.schema.key_indices();
        put_i32(&mut buf, &mut w, keys.len() as i32);
        if w + 4 * keys.len() > PAGE_SIZE {
            return Err(DbError::Oom);
        }
        for &k in keys {
            put_i32(&mut buf, &mut w, k as i32);
        }

        Ok(buf)
    }

    /// Parses page 1's bytes back into metadata. Fails with `ReadFailed` if
    /// the encoded counts don't fit within the page or are otherwise
    /// inconsistent.
    pub fn decode(buf: &[u8; PAGE_SIZE]) -> DbResult<Self> {
        let mut r = 0usize;
        let get_i32 = |buf: &[u8; PAGE_SIZE], r: &mut usize| -> i32 {
            let v = i32::from_le_bytes(buf[*r..*r + 4].try_into().unwrap());
            *r += 4;
            v
        };

        let num_tuples = get_i32(buf, &mut r);
        let first_free_page = get_i32(buf, &mut r);
        let record_size = get_i32(buf, &mut r);
        let num_attr = get_i32(buf, &mut r);

        if num_tuples < 0 || first_free_page < 0 || record_size < 0 || num_attr < 0 {
            return Err(DbError::ReadFailed("table metadata has negative field".into()));
        }
        let num_attr = num_attr as usize;

        if r + num_attr * ATTR_RECORD_LEN > PAGE_SIZE {
            return Err(DbError::ReadFailed("table metadata attribute count overflows page".into()));
        }

        let mut attributes = Vec::with_capacity(num_attr);
        for _ in 0..num_attr {
            let name_bytes = &buf[r..r + MAX_ATTR_NAME_LEN];
            let nul = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
            let name = String::from_utf8_lossy(&name_bytes[..nul]).into_owned();
            r += MAX_ATTR_NAME_LEN;

            let tag = get_i32(buf, &mut r);
            let type_length = get_i32(buf, &mut r);
            if type_length < 0 {
                return Err(DbError::ReadFailed("negative typeLength in table metadata".into()));
            }
            let data_type = DataType::from_tag(tag, type_length as u32)?;
            attributes.push(Attribute::new(name, data_type)?);
        }

        if r + 4 > PAGE_SIZE {
            return Err(DbError::ReadFailed("table metadata missing keySize".into()));
        }
        let key_size = get_i32(buf, &mut r);
        if key_size < 0 || r + 4 * key_size as usize > PAGE_SIZE {
            return Err(DbError::ReadFailed("table metadata key list overflows page".into()));
        }
        let mut key_indices = Vec::with_capacity(key_size as usize);
        for _ in 0..key_size {
            key_indices.push(get_i32(buf, &mut r) as usize);
        }

        let schema = Schema::new(attributes, key_indices)?;
        if schema.record_size() != record_size as usize {
            return Err(DbError::ReadFailed(format!(
                "stored recordSize {record_size} doesn't match schema-derived {}",
                schema.record_size()
            )));
        }

        Ok(Self {
            schema,
            num_tuples: num_tuples as u32,
            first_free_page: first_free_page as PageId,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::schema::Attribute;

    #[test]
    fn metadata_round_trips_through_encode_decode() {
        let schema = Schema::new(
            vec![
                Attribute::new("id", DataType::Int).unwrap(),
                Attribute::new("name", DataType::String(16)).unwrap(),
                Attribute::new("active", DataType::Bool).unwrap(),
            ],
            vec![0],
        )
        .unwrap();
        let mut meta = TableMetadata::new(schema);
        meta.num_tuples = 42;
        meta.first_free_page = 5;

        let encoded = meta.encode().unwrap();
        let decoded = TableMetadata::decode(&encoded).unwrap();

        assert_eq!(42, decoded.num_tuples);
        assert_eq!(5, decoded.first_free_page);
        assert_eq!(meta.schema.record_size(), decoded.schema.record_size());
        assert_eq!(decoded.schema.num_attrs(), 3);
        assert_eq!(decoded.schema.key_indices(), &[0]);
        assert_eq!(decoded.schema.attribute(1).unwrap().name, "name");
    }

    #[test]
    fn unused_tail_bytes_are_zero() {
        let schema = Schema::new(vec![Attribute::new("a", DataType::Int).unwrap()], vec![]).unwrap();
        let meta = TableMetadata::new(schema);
        let encoded = meta.encode().unwrap();
        assert!(encoded[PAGE_SIZE - 1..].iter().all(|&b| b == 0));
    }
}
