mod error;
mod heap_file;
mod page_cache;

pub use error::{StorageError, StorageResult};
pub use heap_file::HeapFile;
pub use page_cache::PageCache;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Page size in bytes (4KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages held resident by the page cache
pub const DEFAULT_CACHE_PAGES: usize = 50;

/// Table identifier, assigned by the catalog
pub type TableId = u32;

static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

/// Process-wide page size. Fixed after the first page is built.
pub fn page_size() -> usize {
    PAGE_SIZE.load(Ordering::Relaxed)
}

/// Override the process-wide page size. Test harnesses only; mixing page
/// sizes within one process corrupts every offset computed so far.
pub fn set_page_size(bytes: usize) {
    PAGE_SIZE.store(bytes, Ordering::Relaxed);
}

/// Restore the default page size. Test harnesses only.
pub fn reset_page_size() {
    PAGE_SIZE.store(DEFAULT_PAGE_SIZE, Ordering::Relaxed);
}

/// Identity of one page: the owning table plus a dense page number
/// (0..page_count, never renumbered).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: usize,
}

impl PageId {
    pub fn new(table_id: TableId, page_no: usize) -> Self {
        Self { table_id, page_no }
    }
}

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque transaction token. No lock manager exists in this core; the token
/// only attributes dirty pages to their writer, and a future lock layer can
/// gate on it in front of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransactionId(u64);

impl TransactionId {
    pub fn new() -> Self {
        Self(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Requested access mode for a fetched page. Accepted but not enforced;
/// see [`TransactionId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permissions {
    ReadOnly,
    ReadWrite,
}

/// Resolves a table id to its backing heap file. Implemented by the catalog;
/// the cache resolves stores through it but never owns the mapping.
pub trait StoreLookup {
    fn page_store(&self, table_id: TableId) -> StorageResult<&HeapFile>;
}
