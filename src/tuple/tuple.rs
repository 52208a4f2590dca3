use crate::storage::PageId;

use super::error::{TupleError, TupleResult};
use super::field::Field;
use super::schema::TupleDesc;

/// Slot identifier within a page
pub type SlotId = usize;

/// Physical identity of one tuple: its page plus a slot number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: SlotId) -> Self {
        Self { page_id, slot }
    }
}

/// A tuple: a schema, the field values, and the record id assigned once the
/// tuple has been placed on a page (None until then).
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// New tuple with no fields set yet
    pub fn new(desc: TupleDesc) -> Self {
        Self {
            desc,
            fields: Vec::new(),
            record_id: None,
        }
    }

    /// New tuple with every field populated and type-checked against the schema
    pub fn with_fields(desc: TupleDesc, fields: Vec<Field>) -> TupleResult<Self> {
        if fields.len() != desc.num_fields() {
            return Err(TupleError::SchemaMismatch(format!(
                "expected {} fields, got {}",
                desc.num_fields(),
                fields.len()
            )));
        }
        for (i, field) in fields.iter().enumerate() {
            let expected = desc.field_type(i)?;
            if field.field_type() != expected {
                return Err(TupleError::TypeMismatch {
                    expected: format!("{:?}", expected),
                    actual: format!("{:?}", field.field_type()),
                });
            }
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    pub fn desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Value of field `i`. The index must name a field that has been set.
    pub fn get_field(&self, i: usize) -> TupleResult<&Field> {
        self.fields.get(i).ok_or(TupleError::FieldIndex(i))
    }

    /// Replace field `i`, or append when `i` is exactly the number of fields
    /// set so far. Sparse or out-of-order writes are rejected.
    pub fn set_field(&mut self, i: usize, field: Field) -> TupleResult<()> {
        let expected = self.desc.field_type(i)?;
        if field.field_type() != expected {
            return Err(TupleError::TypeMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", field.field_type()),
            });
        }

        if i < self.fields.len() {
            self.fields[i] = field;
            Ok(())
        } else if i == self.fields.len() {
            self.fields.push(field);
            Ok(())
        } else {
            Err(TupleError::FieldIndex(i))
        }
    }

    /// Serialize all fields to exactly `desc.tuple_size()` bytes
    pub fn to_bytes(&self) -> TupleResult<Vec<u8>> {
        if self.fields.len() != self.desc.num_fields() {
            return Err(TupleError::SchemaMismatch(format!(
                "tuple has {} of {} fields set",
                self.fields.len(),
                self.desc.num_fields()
            )));
        }

        let mut result = Vec::with_capacity(self.desc.tuple_size());
        for (i, field) in self.fields.iter().enumerate() {
            result.extend_from_slice(&field.serialize(self.desc.field_type(i)?)?);
        }
        Ok(result)
    }

    /// Decode a tuple from exactly `desc.tuple_size()` bytes
    pub fn from_bytes(bytes: &[u8], desc: TupleDesc) -> TupleResult<Self> {
        if bytes.len() != desc.tuple_size() {
            return Err(TupleError::Deserialization(format!(
                "expected {} bytes, got {}",
                desc.tuple_size(),
                bytes.len()
            )));
        }

        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for i in 0..desc.num_fields() {
            let field_type = desc.field_type(i)?;
            let size = field_type.size();
            fields.push(Field::deserialize(&bytes[offset..offset + size], field_type)?);
            offset += size;
        }

        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::FieldType;

    fn test_desc() -> TupleDesc {
        TupleDesc::from_types(&[FieldType::Int, FieldType::Str, FieldType::Float])
    }

    #[test]
    fn test_set_and_get_fields() {
        let mut t = Tuple::new(test_desc());
        t.set_field(0, Field::Int(7)).unwrap();
        t.set_field(1, Field::Str("abc".to_string())).unwrap();
        t.set_field(2, Field::Float(1.5)).unwrap();

        assert_eq!(t.get_field(0).unwrap(), &Field::Int(7));
        assert_eq!(t.get_field(2).unwrap(), &Field::Float(1.5));
        assert!(matches!(t.get_field(3), Err(TupleError::FieldIndex(3))));
    }

    #[test]
    fn test_replace_existing_field() {
        let mut t = Tuple::new(test_desc());
        t.set_field(0, Field::Int(1)).unwrap();
        t.set_field(0, Field::Int(2)).unwrap();
        assert_eq!(t.get_field(0).unwrap(), &Field::Int(2));
    }

    #[test]
    fn test_sparse_write_rejected() {
        let mut t = Tuple::new(test_desc());
        // writing field 1 before field 0 would leave a hole
        assert!(matches!(
            t.set_field(1, Field::Str("x".to_string())),
            Err(TupleError::FieldIndex(1))
        ));
    }

    #[test]
    fn test_set_field_type_checked() {
        let mut t = Tuple::new(test_desc());
        assert!(matches!(
            t.set_field(0, Field::Float(1.0)),
            Err(TupleError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_with_fields_validates() {
        let t = Tuple::with_fields(
            test_desc(),
            vec![
                Field::Int(1),
                Field::Str("a".to_string()),
                Field::Float(2.0),
            ],
        )
        .unwrap();
        assert_eq!(t.fields().len(), 3);
        assert!(t.record_id().is_none());

        assert!(Tuple::with_fields(test_desc(), vec![Field::Int(1)]).is_err());
    }

    #[test]
    fn test_round_trip() {
        let t = Tuple::with_fields(
            test_desc(),
            vec![
                Field::Int(-3),
                Field::Str("hello".to_string()),
                Field::Float(9.75),
            ],
        )
        .unwrap();

        let bytes = t.to_bytes().unwrap();
        assert_eq!(bytes.len(), test_desc().tuple_size());

        let restored = Tuple::from_bytes(&bytes, test_desc()).unwrap();
        assert_eq!(restored.fields(), t.fields());
    }

    #[test]
    fn test_partial_tuple_does_not_serialize() {
        let mut t = Tuple::new(test_desc());
        t.set_field(0, Field::Int(1)).unwrap();
        assert!(matches!(
            t.to_bytes(),
            Err(TupleError::SchemaMismatch(_))
        ));
    }
}
