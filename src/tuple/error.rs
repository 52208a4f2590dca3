use thiserror::Error;

#[derive(Debug, Error)]
pub enum TupleError {
    #[error("field index {0} out of range")]
    FieldIndex(usize),

    #[error("invalid slot: {0}")]
    InvalidSlot(usize),

    #[error("slot {0} is empty")]
    SlotEmpty(usize),

    #[error("page {0} has no free slot")]
    PageFull(usize),

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

pub type TupleResult<T> = Result<T, TupleError>;
