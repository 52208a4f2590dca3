mod error;
mod field;
mod page;
mod schema;
mod tuple;

pub use error::{TupleError, TupleResult};
pub use field::{Field, FieldType, STR_LEN};
pub use page::HeapPage;
pub use schema::{TdItem, TupleDesc};
pub use tuple::{RecordId, Tuple};
