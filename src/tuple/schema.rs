use std::hash::{Hash, Hasher};

use super::error::{TupleError, TupleResult};
use super::field::FieldType;

/// One field of a schema: a type plus an optional name
#[derive(Debug, Clone)]
pub struct TdItem {
    pub field_type: FieldType,
    pub name: Option<String>,
}

impl TdItem {
    pub fn new(field_type: FieldType, name: Option<String>) -> Self {
        Self { field_type, name }
    }
}

/// Ordered tuple schema. Defines the byte layout size of every tuple stored
/// under it. Two schemas are equal when they have the same types in the same
/// order; field names never participate in equality or hashing.
#[derive(Debug, Clone, Default)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    pub fn new(items: Vec<TdItem>) -> Self {
        Self { items }
    }

    /// Schema with anonymous fields of the given types
    pub fn from_types(types: &[FieldType]) -> Self {
        Self {
            items: types.iter().map(|t| TdItem::new(*t, None)).collect(),
        }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[TdItem] {
        &self.items
    }

    pub fn field_type(&self, i: usize) -> TupleResult<FieldType> {
        self.items
            .get(i)
            .map(|item| item.field_type)
            .ok_or(TupleError::FieldIndex(i))
    }

    pub fn field_name(&self, i: usize) -> TupleResult<Option<&str>> {
        self.items
            .get(i)
            .map(|item| item.name.as_deref())
            .ok_or(TupleError::FieldIndex(i))
    }

    /// Index of the first field with the given name
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
    }

    /// Serialized size of one tuple under this schema, in bytes
    pub fn tuple_size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.size()).sum()
    }

    /// Concatenate two schemas. The empty schema is the identity, so merging
    /// with a missing operand reduces to passing `TupleDesc::default()`.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut items = Vec::with_capacity(a.items.len() + b.items.len());
        items.extend(a.items.iter().cloned());
        items.extend(b.items.iter().cloned());
        TupleDesc { items }
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl Hash for TupleDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for item in &self.items {
            item.field_type.hash(state);
        }
    }
}
