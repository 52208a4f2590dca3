pub mod catalog;
pub mod storage;
pub mod tuple;

pub use catalog::{Catalog, CatalogError, CatalogResult, Table};
pub use storage::{
    DEFAULT_CACHE_PAGES, DEFAULT_PAGE_SIZE, HeapFile, PageCache, PageId, Permissions,
    StorageError, StorageResult, StoreLookup, TableId, TransactionId,
};
pub use tuple::{
    Field, FieldType, HeapPage, RecordId, TdItem, Tuple, TupleDesc, TupleError, TupleResult,
};
