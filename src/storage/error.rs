use std::io;

use thiserror::Error;

use crate::tuple::TupleError;

use super::TableId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error(
        "short read on table {table_id} page {page_no}: expected {expected} bytes, got {actual}"
    )]
    ShortRead {
        table_id: TableId,
        page_no: usize,
        expected: usize,
        actual: usize,
    },

    #[error("page {page_no} of table {table_id} is not resident")]
    PageNotResident { table_id: TableId, page_no: usize },

    #[error("unknown table: {0}")]
    UnknownTable(TableId),

    #[error("eviction required but no victim could be selected")]
    NoEvictableVictim,

    #[error("tuple has no record id")]
    MissingRecordId,

    #[error("tuple error: {0}")]
    Tuple(#[from] TupleError),
}

pub type StorageResult<T> = Result<T, StorageError>;
