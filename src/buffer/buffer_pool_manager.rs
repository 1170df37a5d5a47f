//! `BufferPoolManager` owns a fixed number of in-memory frames and maps disk
//! pages onto them, evicting via a `Replacer` when the pool is full. Unlike
//! the teacher's version, there is no `DiskScheduler` background thread and
//! no `tokio` oneshot round-trip: every disk access happens synchronously
//! and inline, on whichever call triggered it. All public methods take `&self`
//! — the pool's mutable state lives behind internal locks — so a single
//! `BufferPoolManager` can be shared (by plain reference) between a `Table`
//! and the `PageGuard`s it hands out.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::buffer::replacer::{ReplacementPolicy, Replacer};
use crate::common::config::{INVALID_PAGE_ID, PAGE_SIZE};
use crate::common::error::{DbError, DbResult};
use crate::common::{FrameId, PageId};
use crate::storage::disk::DiskManager;
use crate::storage::page::Page;

pub struct BufferPoolManager {
    pool_size: usize,
    pages: Vec<Page>,
    disk_manager: Mutex<DiskManager>,
    page_table: Mutex<HashMap<PageId, FrameId>>,
    replacer: Mutex<Replacer>,
    free_list: Mutex<Vec<FrameId>>,
}

impl BufferPoolManager {
    /// Builds a pool of `pool_size` frames over `disk_manager`, replacing
    /// under `policy` once the pool fills and has no free frames left.
    /// Page ids are allocated by `disk_manager` itself (the next id is
    /// always `total_num_pages`), so the pool doesn't keep a separate
    /// counter.
    pub fn init(pool_size: usize, disk_manager: DiskManager, policy: ReplacementPolicy) -> Self {
        let free_list = (0..pool_size as FrameId).rev().collect();
        Self {
            pool_size,
            pages: (0..pool_size).map(|_| Page::new()).collect(),
            disk_manager: Mutex::new(disk_manager),
            page_table: Mutex::new(HashMap::new()),
            replacer: Mutex::new(Replacer::new(pool_size, policy)),
            free_list: Mutex::new(free_list),
        }
    }

    /// Flushes every dirty frame and releases the underlying disk manager.
    /// Fails with `PinnedPages` if any frame still has outstanding pins —
    /// the pool is left usable in that case. After a successful call the
    /// pool must not be used again.
    pub fn shutdown(&self) -> DbResult<()> {
        let any_pinned = self
            .page_table
            .lock()
            .values()
            .any(|&frame_id| self.pages[frame_id as usize].pin_count() > 0);
        if any_pinned {
            return Err(DbError::PinnedPages);
        }
        self.force_flush_pool()
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Allocates a fresh page id, backed by a new block on disk, and returns
    /// it pinned in a frame. Fails with `PageNotFound` if every frame is
    /// resident and pinned.
    pub fn new_page(&self) -> DbResult<Page> {
        let frame_id = self.acquire_frame(INVALID_PAGE_ID)?;

        let page_id = self.disk_manager.lock().append_empty_block()?;
        let page = &self.pages[frame_id as usize];
        page.reset();
        page.set_page_id(page_id);
        page.pin();

        self.page_table.lock().insert(page_id, frame_id);
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);

        Ok(page.clone())
    }

    /// Pins `page_id`, reading it from disk into a free or evicted frame if
    /// it isn't already resident. Fails with `InvalidParam` for the
    /// `INVALID_PAGE_ID` sentinel (auto-extending the file to fit it would
    /// otherwise append billions of empty pages), `PageNotFound` if the
    /// pool is full of pinned frames, or `NoSuchPage`/`ReadFailed` if the
    /// disk manager rejects the read.
    pub fn pin(&self, page_id: PageId) -> DbResult<Page> {
        if page_id == INVALID_PAGE_ID {
            return Err(DbError::InvalidParam(format!(
                "cannot pin the sentinel page id {page_id}"
            )));
        }

        if let Some(&frame_id) = self.page_table.lock().get(&page_id) {
            let page = &self.pages[frame_id as usize];
            page.pin();
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
            return Ok(page.clone());
        }

        // A page number beyond the current file is not an error: the pool
        // grows the file and hands back a zero-filled page (spec §4.2,
        // boundary test in §8).
        self.disk_manager.lock().ensure_capacity(page_id as usize + 1)?;

        let frame_id = self.acquire_frame(page_id)?;
        let page = &self.pages[frame_id as usize];
        page.reset();
        page.set_page_id(page_id);

        {
            let mut buf = [0u8; PAGE_SIZE];
            if let Err(e) = self.disk_manager.lock().read_block(page_id, &mut buf) {
                // The frame was already claimed from the free list or replacer;
                // give it back so a failed pin doesn't leak capacity.
                page.reset();
                self.free_list.lock().push(frame_id);
                return Err(e);
            }
            page.get_data_mut().copy_from_slice(&buf);
        }

        page.pin();
        self.page_table.lock().insert(page_id, frame_id);
        let mut replacer = self.replacer.lock();
        replacer.record_access(frame_id);
        replacer.set_evictable(frame_id, false);

        Ok(page.clone())
    }

    /// Finds a frame for a newly-fetched or newly-allocated page: from the
    /// free list first, then by evicting, flushing the victim if dirty.
    /// Fails with `PageNotFound(requested)` if neither source yields a
    /// frame — spec §4.2/§8 treat "miss with no evictable frame" as a
    /// `PageNotFound`, not a `PinnedPages` (that code is reserved for
    /// `shutdown`). `requested` is the page the caller was trying to bring
    /// in, or `INVALID_PAGE_ID` when called from `new_page`, which doesn't
    /// know its page id until after a frame is secured.
    fn acquire_frame(&self, requested: PageId) -> DbResult<FrameId> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok(frame_id);
        }

        let Some(frame_id) = self.replacer.lock().evict() else {
            return Err(DbError::PageNotFound(requested));
        };

        let victim = &self.pages[frame_id as usize];
        if victim.is_dirty() {
            let victim_id = victim.page_id().expect("resident frame has a page id");
            self.disk_manager
                .lock()
                .write_block(victim_id, &*victim.get_data())?;
        }
        if let Some(victim_id) = victim.page_id() {
            self.page_table.lock().remove(&victim_id);
        }
        Ok(frame_id)
    }

    /// Decrements `page_id`'s pin count, marking it dirty if `is_dirty` is
    /// set. Once the pin count reaches zero the frame becomes eligible for
    /// eviction. Returns `false` if the page isn't resident or was already
    /// unpinned.
    pub fn unpin(&self, page_id: PageId, is_dirty: bool) -> bool {
        let Some(&frame_id) = self.page_table.lock().get(&page_id) else {
            return false;
        };
        let page = &self.pages[frame_id as usize];
        if page.pin_count() <= 0 {
            return false;
        }
        if is_dirty {
            page.set_dirty(true);
        }
        page.unpin();
        if page.pin_count() == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }
        true
    }

    /// Marks a resident page dirty without changing its pin count — used by
    /// callers that hold a page across several mutations and want to flag it
    /// once rather than thread `is_dirty` through every unpin.
    pub fn mark_dirty(&self, page_id: PageId) -> bool {
        let Some(&frame_id) = self.page_table.lock().get(&page_id) else {
            return false;
        };
        self.pages[frame_id as usize].set_dirty(true);
        true
    }

    /// If `page_id` is resident and dirty, writes it out and clears the
    /// dirty flag, regardless of its pin count. A no-op on a clean or
    /// non-resident page. Returns `false` if the page isn't resident.
    pub fn force_page(&self, page_id: PageId) -> DbResult<bool> {
        let Some(&frame_id) = self.page_table.lock().get(&page_id) else {
            return Ok(false);
        };
        let page = &self.pages[frame_id as usize];
        if page.is_dirty() {
            self.disk_manager
                .lock()
                .write_block(page_id, &*page.get_data())?;
            page.set_dirty(false);
        }
        Ok(true)
    }

    /// Writes out every resident frame that is both dirty and unpinned,
    /// clearing its dirty flag. Pinned dirty frames are left untouched —
    /// spec §4.2 scopes `forceFlushPool` to `fixCount == 0`.
    pub fn force_flush_pool(&self) -> DbResult<()> {
        let page_ids: Vec<PageId> = {
            let page_table = self.page_table.lock();
            page_table
                .iter()
                .filter(|&(_, &frame_id)| {
                    let page = &self.pages[frame_id as usize];
                    page.is_dirty() && page.pin_count() == 0
                })
                .map(|(&page_id, _)| page_id)
                .collect()
        };
        for page_id in page_ids {
            self.force_page(page_id)?;
        }
        Ok(())
    }

    /// Removes `page_id` from the pool entirely, returning its frame to the
    /// free list. Fails with `PinnedPages` if the page is currently pinned.
    /// Returns `Ok(())` without effect if the page isn't resident.
    pub fn delete_page(&self, page_id: PageId) -> DbResult<()> {
        let Some(&frame_id) = self.page_table.lock().get(&page_id) else {
            return Ok(());
        };
        let page = &self.pages[frame_id as usize];
        if page.pin_count() > 0 {
            return Err(DbError::PinnedPages);
        }
        self.page_table.lock().remove(&page_id);
        self.replacer.lock().remove(frame_id);
        self.free_list.lock().push(frame_id);
        page.reset();
        Ok(())
    }

    // -- Inspection, for tests and tooling --

    pub fn is_resident(&self, page_id: PageId) -> bool {
        self.page_table.lock().contains_key(&page_id)
    }

    pub fn fix_count(&self, page_id: PageId) -> Option<i32> {
        let frame_id = *self.page_table.lock().get(&page_id)?;
        Some(self.pages[frame_id as usize].pin_count())
    }

    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let frame_id = *self.page_table.lock().get(&page_id)?;
        Some(self.pages[frame_id as usize].is_dirty())
    }

    /// Spec `getFrameContents`: one entry per frame, in frame-index order —
    /// the resident `page_id`, or `None` for an empty frame.
    pub fn frame_contents(&self) -> Vec<Option<PageId>> {
        self.pages.iter().map(|p| p.page_id()).collect()
    }

    /// Spec `getDirtyFlags`: one entry per frame, in frame-index order.
    pub fn dirty_flags(&self) -> Vec<bool> {
        self.pages.iter().map(|p| p.is_dirty()).collect()
    }

    /// Spec `getFixCounts`: one entry per frame, in frame-index order.
    pub fn fix_counts(&self) -> Vec<i32> {
        self.pages.iter().map(|p| p.pin_count()).collect()
    }

    pub fn num_read_io(&self) -> usize {
        self.disk_manager.lock().num_reads()
    }

    pub fn num_write_io(&self) -> usize {
        self.disk_manager.lock().num_writes()
    }

    /// Current on-disk page count. The scan engine uses this to bound a
    /// forward scan instead of relying on `pin` to signal end-of-file —
    /// `pin` auto-extends the file for any out-of-range page number, so it
    /// never reports `NoSuchPage` to a caller that walks pages sequentially.
    pub fn total_num_pages(&self) -> usize {
        self.disk_manager.lock().total_num_pages()
    }

    /// Extends the underlying page file so it holds at least `num_pages`
    /// pages, without pinning or reading any of them. The slotted-page heap
    /// uses this so `pin`/`new_page` never race against file growth.
    pub fn ensure_capacity(&self, num_pages: usize) -> DbResult<()> {
        self.disk_manager.lock().ensure_capacity(num_pages)
    }
}
