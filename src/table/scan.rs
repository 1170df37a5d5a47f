//! Forward, single-pass iteration over a table's live rows in row-major
//! `(page, slot)` order. `ScanCursor` borrows its `Table` rather than owning
//! a back-pointer into it (spec §9 "Cyclic references" — scans are
//! single-threaded and non-reentrant against the same table, so an ordinary
//! borrow is all that's needed).

use crate::catalog::record::Record;
use crate::catalog::schema::Schema;
use crate::common::config::{FIRST_DATA_PAGE_ID, PageId};
use crate::common::error::{DbError, DbResult};
use crate::storage::page::PageGuard;
use crate::table::heap::Table;

const LIVE_MARKER: u8 = b'#';

/// An external collaborator contract: `evalExpr` in spec terms. The core
/// only needs a yes/no verdict per row; the expression language itself
/// (`AND`/`OR`/`NOT`, attribute references, per-type comparisons) is out of
/// scope and lives above this trait.
pub trait Predicate {
    fn eval(&self, record: &Record, schema: &Schema) -> DbResult<bool>;
}

pub struct ScanCursor<'a> {
    table: &'a Table,
    page: PageId,
    slot: usize,
    predicate: Option<&'a dyn Predicate>,
    exhausted: bool,
    /// Live rows seen so far (matched or not) — lets the scan stop the
    /// instant it has accounted for every tuple the table claims to hold,
    /// per spec §4.5 step 4, without needing to reach the last data page.
    live_seen: u32,
}

impl<'a> ScanCursor<'a> {
    /// Starts a new scan over `table`. `predicate = None` means "all rows".
    pub fn start_scan(table: &'a Table, predicate: Option<&'a dyn Predicate>) -> Self {
        Self {
            table,
            page: FIRST_DATA_PAGE_ID,
            slot: 0,
            predicate,
            exhausted: table.num_tuples() == 0,
            live_seen: 0,
        }
    }

    /// Returns the next matching row, or `NoMoreTuples` once the scan has
    /// visited every on-disk data page, or every live row the table claims
    /// to hold, with no further match.
    ///
    /// Bounded explicitly by the buffer pool's `total_num_pages`: `pin`
    /// auto-extends the file for any out-of-range page number (it never
    /// reports `NoSuchPage` to a sequential walker), so end-of-file can't be
    /// detected by waiting for a pin to fail.
    pub fn next(&mut self) -> DbResult<Record> {
        if self.exhausted {
            return Err(DbError::NoMoreTuples);
        }

        let slots_per_page = self.table.slots_per_page();
        let slot_width = self.table.slot_width();
        let record_size = self.table.record_size();

        loop {
            if self.slot >= slots_per_page {
                self.slot = 0;
                self.page += 1;
            }

            let total_pages = self.table.bpm().total_num_pages() as PageId;
            if self.page >= total_pages || self.live_seen >= self.table.num_tuples() {
                self.exhausted = true;
                return Err(DbError::NoMoreTuples);
            }

            let guard = PageGuard::fetch(self.table.bpm(), self.page)?;

            let offset = self.slot * slot_width;
            let marker = guard.read()[offset];
            if marker != LIVE_MARKER {
                self.slot += 1;
                continue;
            }
            self.live_seen += 1;

            let payload = guard.read()[offset + 1..offset + 1 + record_size].to_vec();
            drop(guard);

            let rid = crate::common::config::Rid::new(self.page, self.slot as u32);
            let record = Record::from_bytes(Some(rid), payload, self.table.schema())?;
            self.slot += 1;

            let matched = match self.predicate {
                None => true,
                Some(pred) => pred.eval(&record, self.table.schema())?,
            };
            if matched {
                return Ok(record);
            }
        }
    }
}
