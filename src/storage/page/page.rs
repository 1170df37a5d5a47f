//! `Page` is a cheaply-cloned handle onto one buffer-pool frame's resident
//! bytes plus its book-keeping (page id, pin count, dirty flag). Cloning a
//! `Page` shares the same backing storage — this is how the buffer pool
//! hands a frame's contents out to callers while still being able to
//! observe (and mutate) pin count and dirtiness itself.

use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::config::PAGE_SIZE;
use crate::common::PageId;

#[derive(Debug, Clone)]
pub struct Page(Arc<RwLock<PageInner>>);

#[derive(Debug)]
struct PageInner {
    data: [u8; PAGE_SIZE],
    page_id: Option<PageId>,
    pin_count: i32,
    is_dirty: bool,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    /// A fresh, empty frame: zeroed data, no resident page, unpinned, clean.
    pub fn new() -> Page {
        Page(Arc::new(RwLock::new(PageInner {
            data: [0; PAGE_SIZE],
            page_id: None,
            pin_count: 0,
            is_dirty: false,
        })))
    }

    /// Clears a frame back to empty, ready to take on a new page identity.
    pub fn reset(&self) {
        let mut inner = self.0.write();
        inner.data.fill(0);
        inner.page_id = None;
        inner.pin_count = 0;
        inner.is_dirty = false;
    }

    pub fn get_data(&self) -> MappedRwLockReadGuard<'_, [u8; PAGE_SIZE]> {
        RwLockReadGuard::map(self.0.read(), |i| &i.data)
    }

    pub fn get_data_mut(&self) -> MappedRwLockWriteGuard<'_, [u8; PAGE_SIZE]> {
        RwLockWriteGuard::map(self.0.write(), |i| &mut i.data)
    }

    pub fn set_page_id(&self, page_id: PageId) {
        self.0.write().page_id = Some(page_id);
    }

    pub fn page_id(&self) -> Option<PageId> {
        self.0.read().page_id
    }

    pub fn pin_count(&self) -> i32 {
        self.0.read().pin_count
    }

    pub fn pin(&self) {
        self.0.write().pin_count += 1;
    }

    /// Decrements the pin count, saturating at zero rather than going
    /// negative (a double-unpin through raw `Page` access is tolerated; the
    /// buffer pool itself checks the fix count before calling this).
    pub fn unpin(&self) {
        let mut inner = self.0.write();
        if inner.pin_count > 0 {
            inner.pin_count -= 1;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.0.read().is_dirty
    }

    pub fn set_dirty(&self, is_dirty: bool) {
        self.0.write().is_dirty = is_dirty;
    }
}
