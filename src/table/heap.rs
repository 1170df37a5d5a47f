//! The slotted-page heap: a `Table` is a page file plus a buffer pool plus
//! the metadata cached from page 1. Fixed-width slots of `record_size + 1`
//! bytes, one marker byte each — `0x00` free, `b'#'` live, `b'$'`
//! tombstone (never reused for fresh inserts, per DESIGN.md).

use crate::buffer::buffer_pool_manager::BufferPoolManager;
use crate::buffer::replacer::ReplacementPolicy;
use crate::catalog::record::Record;
use crate::catalog::schema::Schema;
use crate::common::config::{
    FIRST_DATA_PAGE_ID, PAGE_SIZE, PageId, Rid, TABLE_METADATA_PAGE_ID,
};
use crate::common::error::{DbError, DbResult};
use crate::storage::disk::DiskManager;
use crate::storage::page::PageGuard;
use crate::table::metadata::TableMetadata;

const FREE_MARKER: u8 = 0x00;
const LIVE_MARKER: u8 = b'#';
const TOMBSTONE_MARKER: u8 = b'$';

pub struct Table {
    bpm: BufferPoolManager,
    schema: Schema,
    record_size: usize,
    slot_width: usize,
    slots_per_page: usize,
    num_tuples: u32,
    first_free_page: PageId,
}

impl Table {
    /// Creates a fresh page file named `name` and writes its schema into
    /// page 1. Pages ≥ 2 are left unmaterialized — `insert_record`
    /// allocates them on demand.
    pub fn create_table(name: &str, schema: Schema) -> DbResult<()> {
        let mut disk_manager = DiskManager::create(name)?;
        disk_manager.ensure_capacity(FIRST_DATA_PAGE_ID as usize)?;

        let metadata = TableMetadata::new(schema);
        let page1 = metadata.encode()?;
        disk_manager.write_block(TABLE_METADATA_PAGE_ID, &page1)?;
        Ok(())
    }

    /// Opens an existing table, initializing a buffer pool of
    /// `DEFAULT_BUFFER_POOL_SIZE` frames under LRU and decoding page 1's
    /// metadata into memory. Fails if the file is missing or page 1 is
    /// malformed.
    pub fn open_table(name: &str) -> DbResult<Self> {
        use crate::common::config::DEFAULT_BUFFER_POOL_SIZE;

        let disk_manager = DiskManager::open(name)?;
        let bpm = BufferPoolManager::init(DEFAULT_BUFFER_POOL_SIZE, disk_manager, ReplacementPolicy::Lru);

        let metadata = {
            let guard = PageGuard::fetch(&bpm, TABLE_METADATA_PAGE_ID)?;
            TableMetadata::decode(&guard.read())?
        };

        let record_size = metadata.schema.record_size();
        let slot_width = record_size + 1;
        let slots_per_page = PAGE_SIZE / slot_width;

        Ok(Self {
            bpm,
            schema: metadata.schema,
            record_size,
            slot_width,
            slots_per_page,
            num_tuples: metadata.num_tuples,
            first_free_page: metadata.first_free_page,
        })
    }

    /// Writes the current `num_tuples`/`first_free_page` back to page 1 and
    /// shuts down the buffer pool (flushing every dirty data page). Any
    /// failure pinning or flushing page 1 is propagated — the original
    /// assignment's `closeTable` silently swallowed this error via a stray
    /// `==`; this does not.
    pub fn close_table(self) -> DbResult<()> {
        {
            let mut guard = PageGuard::fetch(&self.bpm, TABLE_METADATA_PAGE_ID)?;
            let metadata = TableMetadata {
                schema: self.schema.clone(),
                num_tuples: self.num_tuples,
                first_free_page: self.first_free_page,
            };
            guard.write().copy_from_slice(&metadata.encode()?);
        }
        self.bpm.shutdown()
    }

    /// Destroys the underlying page file. The table must already be closed.
    pub fn delete_table(name: &str) -> DbResult<()> {
        DiskManager::destroy(name)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn num_tuples(&self) -> u32 {
        self.num_tuples
    }

    fn slot_offset(&self, slot: u32) -> DbResult<usize> {
        let slot = slot as usize;
        if slot >= self.slots_per_page {
            return Err(DbError::InvalidParam(format!(
                "slot {slot} out of range (slots_per_page = {})",
                self.slots_per_page
            )));
        }
        Ok(slot * self.slot_width)
    }

    /// Finds the first free-or-tombstoned slot starting at
    /// `first_free_page`, writes `record`'s payload into it, and assigns
    /// `record.id`.
    pub fn insert_record(&mut self, record: &mut Record) -> DbResult<()> {
        let mut page_id = self.first_free_page;

        loop {
            self.bpm.ensure_capacity(page_id as usize + 1)?;
            let mut guard = PageGuard::fetch(&self.bpm, page_id)?;

            let found_slot = (0..self.slots_per_page).find(|&s| {
                let offset = s * self.slot_width;
                guard.read()[offset] == FREE_MARKER
            });

            if let Some(slot) = found_slot {
                let offset = slot * self.slot_width;
                {
                    let mut data = guard.write();
                    data[offset] = LIVE_MARKER;
                    data[offset + 1..offset + 1 + self.record_size].copy_from_slice(&record.data);
                }
                drop(guard);

                self.first_free_page = page_id;
                record.id = Some(Rid::new(page_id, slot as u32));
                self.num_tuples += 1;
                return Ok(());
            }

            drop(guard);
            page_id += 1;
        }
    }

    /// Marks `rid`'s slot tombstoned. Fails with `TupleNotFound` if the
    /// slot isn't currently live.
    pub fn delete_record(&mut self, rid: Rid) -> DbResult<()> {
        let offset = self.slot_offset(rid.slot_num)?;
        let mut guard = PageGuard::fetch(&self.bpm, rid.page_id)?;

        if guard.read()[offset] != LIVE_MARKER {
            return Err(DbError::TupleNotFound(rid));
        }
        guard.write()[offset] = TOMBSTONE_MARKER;
        self.num_tuples -= 1;
        Ok(())
    }

    /// Overwrites the payload bytes at `record.id`'s slot, leaving the
    /// marker untouched. Fails with `TupleNotFound` if the slot isn't live,
    /// or `InvalidParam` if the record has no id.
    pub fn update_record(&mut self, record: &Record) -> DbResult<()> {
        let rid = record
            .id
            .ok_or_else(|| DbError::InvalidParam("update_record requires an assigned id".into()))?;
        let offset = self.slot_offset(rid.slot_num)?;
        let mut guard = PageGuard::fetch(&self.bpm, rid.page_id)?;

        if guard.read()[offset] != LIVE_MARKER {
            return Err(DbError::TupleNotFound(rid));
        }
        guard.write()[offset + 1..offset + 1 + self.record_size].copy_from_slice(&record.data);
        Ok(())
    }

    /// Reads `rid`'s record. Fails with `TupleNotFound` if the slot isn't
    /// live.
    pub fn get_record(&self, rid: Rid) -> DbResult<Record> {
        let offset = self.slot_offset(rid.slot_num)?;
        let guard = PageGuard::fetch(&self.bpm, rid.page_id)?;

        if guard.read()[offset] != LIVE_MARKER {
            return Err(DbError::TupleNotFound(rid));
        }
        let payload = guard.read()[offset + 1..offset + 1 + self.record_size].to_vec();
        Record::from_bytes(Some(rid), payload, &self.schema)
    }

    pub(crate) fn bpm(&self) -> &BufferPoolManager {
        &self.bpm
    }

    pub(crate) fn slots_per_page(&self) -> usize {
        self.slots_per_page
    }

    pub(crate) fn slot_width(&self) -> usize {
        self.slot_width
    }

    pub(crate) fn record_size(&self) -> usize {
        self.record_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::Value;
    use crate::catalog::schema::{Attribute, DataType};
    use tempdir::TempDir;

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

    fn row(schema: &Schema, a: i32, b: &str, c: i32) -> Record {
        let mut r = Record::new(schema);
        r.set_attr(schema, 0, &Value::Int(a)).unwrap();
        r.set_attr(schema, 1, &Value::String(b.into())).unwrap();
        r.set_attr(schema, 2, &Value::Int(c)).unwrap();
        r
    }

    #[test]
    fn insert_get_delete_round_trip() {
        let dir = TempDir::new("test").unwrap();
        let path = dir.path().join("heap.db");
        let path = path.to_str().unwrap();

        let schema = schema();
        Table::create_table(path, schema.clone()).unwrap();
        let mut table = Table::open_table(path).unwrap();

        let mut r1 = row(&schema, 1, "aaaa", 10);
        table.insert_record(&mut r1).unwrap();
        let rid = r1.id.unwrap();
        assert_eq!(FIRST_DATA_PAGE_ID, rid.page_id);
        assert_eq!(0, rid.slot_num);
        assert_eq!(1, table.num_tuples());

        let fetched = table.get_record(rid).unwrap();
        assert_eq!(r1.data, fetched.data);

        table.delete_record(rid).unwrap();
        assert_eq!(0, table.num_tuples());
        assert!(matches!(table.get_record(rid), Err(DbError::TupleNotFound(_))));

        table.close_table().unwrap();
    }

    #[test]
    fn update_record_preserves_marker_and_changes_payload() {
        let dir = TempDir::new("test").unwrap();
        let path = dir.path().join("heap.db");
        let path = path.to_str().unwrap();

        let schema = schema();
        Table::create_table(path, schema.clone()).unwrap();
        let mut table = Table::open_table(path).unwrap();

        let mut r1 = row(&schema, 1, "aaaa", 10);
        table.insert_record(&mut r1).unwrap();

        let mut updated = row(&schema, 1, "zzzz", 99);
        updated.id = r1.id;
        table.update_record(&updated).unwrap();

        let fetched = table.get_record(r1.id.unwrap()).unwrap();
        assert_eq!(Value::String("zzzz".into()), fetched.get_attr(&schema, 1).unwrap());
        assert_eq!(Value::Int(99), fetched.get_attr(&schema, 2).unwrap());

        table.close_table().unwrap();
    }

    #[test]
    fn reopening_preserves_tuple_count_and_free_page_hint() {
        let dir = TempDir::new("test").unwrap();
        let path = dir.path().join("heap.db");
        let path = path.to_str().unwrap();

        Table::create_table(path, schema()).unwrap();
        let mut table = Table::open_table(path).unwrap();
        let mut r = row(&schema(), 1, "aaaa", 10);
        table.insert_record(&mut r).unwrap();
        table.close_table().unwrap();

        let reopened = Table::open_table(path).unwrap();
        assert_eq!(1, reopened.num_tuples());
        reopened.close_table().unwrap();
    }

    #[test]
    fn deleting_already_deleted_record_fails() {
        let dir = TempDir::new("test").unwrap();
        let path = dir.path().join("heap.db");
        let path = path.to_str().unwrap();

        Table::create_table(path, schema()).unwrap();
        let mut table = Table::open_table(path).unwrap();
        let mut r = row(&schema(), 1, "aaaa", 10);
        table.insert_record(&mut r).unwrap();
        let rid = r.id.unwrap();

        table.delete_record(rid).unwrap();
        assert!(matches!(table.delete_record(rid), Err(DbError::TupleNotFound(_))));

        table.close_table().unwrap();
    }

    #[test]
    fn tombstoned_slots_are_not_reused_by_later_inserts() {
        let dir = TempDir::new("test").unwrap();
        let path = dir.path().join("heap.db");
        let path = path.to_str().unwrap();

        let schema = schema();
        Table::create_table(path, schema.clone()).unwrap();
        let mut table = Table::open_table(path).unwrap();

        let mut r1 = row(&schema, 1, "aaaa", 10);
        table.insert_record(&mut r1).unwrap();
        let rid1 = r1.id.unwrap();
        table.delete_record(rid1).unwrap();

        let mut r2 = row(&schema, 2, "bbbb", 20);
        table.insert_record(&mut r2).unwrap();
        let rid2 = r2.id.unwrap();

        assert_ne!(rid1, rid2, "a fresh insert must not land on a tombstoned slot");
        assert!(matches!(table.get_record(rid1), Err(DbError::TupleNotFound(_))));
        assert_eq!(r2.data, table.get_record(rid2).unwrap().data);

        table.close_table().unwrap();
    }
}
