use serde::{Deserialize, Serialize};

use super::error::{TupleError, TupleResult};

/// Fixed payload length of a string field, excluding the 4-byte length prefix.
pub const STR_LEN: usize = 128;

/// Fixed-size field types; the sizes define the byte layout of a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Int,
    Float,
    Str,
}

impl FieldType {
    /// Serialized size of a field of this type in bytes
    pub fn size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Float => 8,
            FieldType::Str => 4 + STR_LEN,
        }
    }
}

/// A single field value
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Int(i32),
    Float(f64),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Float(_) => FieldType::Float,
            Field::Str(_) => FieldType::Str,
        }
    }

    /// Serialize the value into exactly `expected.size()` bytes.
    /// Strings are length-prefixed and zero-padded to STR_LEN.
    pub fn serialize(&self, expected: FieldType) -> TupleResult<Vec<u8>> {
        if self.field_type() != expected {
            return Err(TupleError::TypeMismatch {
                expected: format!("{:?}", expected),
                actual: format!("{:?}", self.field_type()),
            });
        }

        match self {
            Field::Int(i) => Ok(i.to_le_bytes().to_vec()),
            Field::Float(f) => Ok(f.to_le_bytes().to_vec()),
            Field::Str(s) => {
                let bytes = s.as_bytes();
                if bytes.len() > STR_LEN {
                    return Err(TupleError::Serialization(format!(
                        "string length {} exceeds max length {}",
                        bytes.len(),
                        STR_LEN
                    )));
                }
                let mut result = vec![0u8; 4 + STR_LEN];
                result[0..4].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
                result[4..4 + bytes.len()].copy_from_slice(bytes);
                Ok(result)
            }
        }
    }

    /// Deserialize a value from exactly `field_type.size()` bytes.
    pub fn deserialize(bytes: &[u8], field_type: FieldType) -> TupleResult<Self> {
        if bytes.len() != field_type.size() {
            return Err(TupleError::Deserialization(format!(
                "expected {} bytes for {:?}, got {}",
                field_type.size(),
                field_type,
                bytes.len()
            )));
        }

        match field_type {
            FieldType::Int => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(bytes);
                Ok(Field::Int(i32::from_le_bytes(buf)))
            }
            FieldType::Float => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(bytes);
                Ok(Field::Float(f64::from_le_bytes(buf)))
            }
            FieldType::Str => {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(&bytes[0..4]);
                let len = u32::from_le_bytes(buf) as usize;
                if len > STR_LEN {
                    return Err(TupleError::Deserialization(format!(
                        "string length {} exceeds max length {}",
                        len, STR_LEN
                    )));
                }
                let s = std::str::from_utf8(&bytes[4..4 + len])
                    .map_err(|e| TupleError::Deserialization(e.to_string()))?;
                Ok(Field::Str(s.to_string()))
            }
        }
    }
}
