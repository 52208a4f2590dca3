use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::{debug, trace, warn};

use crate::tuple::{HeapPage, Tuple};

use super::error::{StorageError, StorageResult};
use super::{DEFAULT_CACHE_PAGES, PageId, Permissions, StoreLookup, TableId, TransactionId};

/// Bounded, process-wide cache of decoded pages with LRU eviction and
/// dirty-page write-back. Owns every resident page exclusively: a store
/// never keeps a live reference to a page it has handed over.
///
/// Structural operations take `&mut self`, so sharing the cache between
/// threads behind `Arc<Mutex<_>>` makes each read-check-evict-insert
/// sequence a single atomic step. The `lru` crate's doubly-linked order
/// gives O(1) promotion on access and O(1) victim selection.
pub struct PageCache {
    pages: LruCache<PageId, HeapPage>,
    capacity: usize,
}

impl PageCache {
    /// Cache holding at most `capacity` resident pages
    pub fn new(capacity: usize) -> Self {
        Self {
            pages: LruCache::new(NonZeroUsize::new(capacity).unwrap()),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fetch the resident page for `pid`, loading it from the owning store
    /// on a miss. When the cache is full and `pid` is not resident, exactly
    /// one page is evicted first. `tid` and `perm` are accepted for a future
    /// lock layer and are not enforced here.
    pub fn fetch(
        &mut self,
        _tid: TransactionId,
        pid: PageId,
        _perm: Permissions,
        lookup: &dyn StoreLookup,
    ) -> StorageResult<&HeapPage> {
        self.ensure_resident(pid, lookup)?;
        Ok(self.pages.get(&pid).unwrap())
    }

    /// Mutable variant of [`fetch`](Self::fetch). The caller is responsible
    /// for marking the page dirty after mutating it.
    pub fn fetch_mut(
        &mut self,
        _tid: TransactionId,
        pid: PageId,
        _perm: Permissions,
        lookup: &dyn StoreLookup,
    ) -> StorageResult<&mut HeapPage> {
        self.ensure_resident(pid, lookup)?;
        Ok(self.pages.get_mut(&pid).unwrap())
    }

    fn ensure_resident(&mut self, pid: PageId, lookup: &dyn StoreLookup) -> StorageResult<()> {
        if self.pages.contains(&pid) {
            return Ok(());
        }
        if self.pages.len() >= self.capacity {
            self.evict_one(lookup)?;
        }

        trace!(
            table_id = pid.table_id,
            page_no = pid.page_no,
            "page miss, loading from store"
        );
        let page = lookup.page_store(pid.table_id)?.read_page(pid)?;
        self.pages.put(pid, page);
        Ok(())
    }

    /// Admit or replace the entry for an already-decoded page, evicting one
    /// resident page when at capacity and the id is new. Lets mutation paths
    /// skip a redundant disk read.
    pub fn install(&mut self, page: HeapPage, lookup: &dyn StoreLookup) -> StorageResult<()> {
        let pid = page.id();
        if !self.pages.contains(&pid) && self.pages.len() >= self.capacity {
            self.evict_one(lookup)?;
        }
        self.pages.put(pid, page);
        Ok(())
    }

    /// Mark a resident page dirty on behalf of `tid`
    pub fn set_dirty(&mut self, pid: PageId, tid: TransactionId) -> StorageResult<()> {
        let page = self
            .pages
            .peek_mut(&pid)
            .ok_or(StorageError::PageNotResident {
                table_id: pid.table_id,
                page_no: pid.page_no,
            })?;
        page.mark_dirty(Some(tid));
        Ok(())
    }

    /// Write a dirty page through its store and clear the dirty flag. A
    /// clean page is left alone; a page that is not resident is an error.
    /// Does not touch the recency order.
    pub fn flush_page(&mut self, pid: PageId, lookup: &dyn StoreLookup) -> StorageResult<()> {
        let page = self
            .pages
            .peek_mut(&pid)
            .ok_or(StorageError::PageNotResident {
                table_id: pid.table_id,
                page_no: pid.page_no,
            })?;
        if page.is_dirty() {
            lookup.page_store(pid.table_id)?.write_page(page)?;
            page.mark_dirty(None);
        }
        Ok(())
    }

    /// Flush every resident page, then fsync each store that was touched.
    /// Full-pool checkpoint aid; never required for read correctness.
    pub fn flush_all(&mut self, lookup: &dyn StoreLookup) -> StorageResult<()> {
        let pids: Vec<PageId> = self.pages.iter().map(|(pid, _)| *pid).collect();
        let mut tables: Vec<TableId> = pids.iter().map(|pid| pid.table_id).collect();
        tables.sort_unstable();
        tables.dedup();

        for pid in pids {
            self.flush_page(pid, lookup)?;
        }
        for table_id in tables {
            lookup.page_store(table_id)?.sync()?;
        }
        Ok(())
    }

    /// Retire a page's identity: flush best-effort, then unconditionally
    /// remove the page and its recency slot. Used when a page number may be
    /// reused by another structure. A failed flush is logged and the removal
    /// happens anyway.
    pub fn discard(&mut self, pid: PageId, lookup: &dyn StoreLookup) {
        if self.pages.peek(&pid).is_none() {
            return;
        }
        if let Err(err) = self.flush_page(pid, lookup) {
            warn!(
                table_id = pid.table_id,
                page_no = pid.page_no,
                %err,
                "discard: flush failed, dropping page anyway"
            );
        }
        self.pages.pop(&pid);
    }

    /// Evict the least recently used page, flushing it first when dirty. A
    /// failed write-back aborts the eviction and propagates, so the only
    /// copy of dirty data is never dropped. An empty cache has no victim;
    /// that is an invariant breach on the caller's side.
    fn evict_one(&mut self, lookup: &dyn StoreLookup) -> StorageResult<()> {
        let (pid, _) = self
            .pages
            .peek_lru()
            .ok_or(StorageError::NoEvictableVictim)?;
        let pid = *pid;

        self.flush_page(pid, lookup)?;
        debug!(table_id = pid.table_id, page_no = pid.page_no, "evicting page");
        self.pages.pop(&pid);
        Ok(())
    }

    /// Insert a tuple into `table_id` on behalf of `tid`. The owning store
    /// locates or allocates the page; every affected page is then marked
    /// dirty and left resident, so later reads observe the mutation before
    /// any flush.
    pub fn insert_tuple(
        &mut self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
        lookup: &dyn StoreLookup,
    ) -> StorageResult<Vec<PageId>> {
        let store = lookup.page_store(table_id)?;
        let affected = store.insert_tuple(tid, tuple, self, lookup)?;
        for pid in &affected {
            self.set_dirty(*pid, tid)?;
        }
        Ok(affected)
    }

    /// Delete the tuple named by its record id on behalf of `tid`, marking
    /// the affected page dirty and keeping it resident.
    pub fn delete_tuple(
        &mut self,
        tid: TransactionId,
        tuple: &Tuple,
        lookup: &dyn StoreLookup,
    ) -> StorageResult<Vec<PageId>> {
        let rid = tuple.record_id().ok_or(StorageError::MissingRecordId)?;
        let store = lookup.page_store(rid.page_id.table_id)?;
        let affected = store.delete_tuple(tid, tuple, self, lookup)?;
        for pid in &affected {
            self.set_dirty(*pid, tid)?;
        }
        Ok(affected)
    }

    /// Number of pages currently resident
    pub fn resident_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_resident(&self, pid: PageId) -> bool {
        self.pages.contains(&pid)
    }

    /// Number of resident pages with unflushed mutations
    pub fn dirty_page_count(&self) -> usize {
        self.pages.iter().filter(|(_, page)| page.is_dirty()).count()
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PAGES)
    }
}
