use std::cmp::Ordering;
use std::fmt;

use crate::common::{Result, RookError};

use super::DataType;

/// A typed runtime value. All variants besides `Null` correspond to a
/// [`DataType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i32),
    BigInt(i64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness under SQL-ish semantics: only a non-null true counts.
    pub fn is_true(&self) -> bool {
        matches!(self, Value::Boolean(true))
    }

    /// Whether this value can be stored in a column of the given type.
    pub fn matches_type(&self, data_type: &DataType) -> bool {
        matches!(
            (self, data_type),
            (Value::Null, _)
                | (Value::Boolean(_), DataType::Boolean)
                | (Value::Integer(_), DataType::Integer)
                | (Value::BigInt(_), DataType::BigInt)
                | (Value::String(_), DataType::VarChar(_))
        )
    }

    /// Three-way comparison between compatible values; None when either
    /// side is null or the types cannot be compared.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, _) | (_, Value::Null) => None,
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::BigInt(a), Value::BigInt(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::BigInt(b)) => Some((*a as i64).cmp(b)),
            (Value::BigInt(a), Value::Integer(b)) => Some(a.cmp(&(*b as i64))),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Appends the encoded value for a column of `data_type`. Null
    /// values write a zeroed placeholder; the null bitmap is the source
    /// of truth.
    pub fn serialize_into(&self, data_type: &DataType, out: &mut Vec<u8>) -> Result<()> {
        if !self.matches_type(data_type) {
            return Err(RookError::TupleEncoding(format!(
                "value {:?} does not fit column type {}",
                self, data_type
            )));
        }

        match (self, data_type) {
            (Value::Null, dt) => match dt.fixed_size() {
                Some(n) => out.extend(std::iter::repeat(0).take(n)),
                None => out.extend_from_slice(&0u16.to_le_bytes()),
            },
            (Value::Boolean(b), _) => out.push(u8::from(*b)),
            (Value::Integer(v), _) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::BigInt(v), _) => out.extend_from_slice(&v.to_le_bytes()),
            (Value::String(s), DataType::VarChar(max_len)) => {
                if s.len() > *max_len as usize {
                    return Err(RookError::TupleEncoding(format!(
                        "string of {} bytes exceeds VARCHAR({})",
                        s.len(),
                        max_len
                    )));
                }
                out.extend_from_slice(&(s.len() as u16).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            _ => unreachable!("matches_type admitted an unknown pairing"),
        }
        Ok(())
    }

    /// Decodes one value of `data_type` from the front of `data`,
    /// returning it with the number of bytes consumed. `is_null` comes
    /// from the tuple's null bitmap.
    pub fn deserialize(data_type: &DataType, data: &[u8], is_null: bool) -> Result<(Value, usize)> {
        let short = || RookError::TupleEncoding("tuple bytes truncated".to_string());

        match data_type {
            DataType::Boolean => {
                let byte = *data.first().ok_or_else(short)?;
                let value = if is_null { Value::Null } else { Value::Boolean(byte != 0) };
                Ok((value, 1))
            }
            DataType::Integer => {
                let bytes: [u8; 4] = data.get(..4).ok_or_else(short)?.try_into().unwrap();
                let value = if is_null {
                    Value::Null
                } else {
                    Value::Integer(i32::from_le_bytes(bytes))
                };
                Ok((value, 4))
            }
            DataType::BigInt => {
                let bytes: [u8; 8] = data.get(..8).ok_or_else(short)?.try_into().unwrap();
                let value = if is_null {
                    Value::Null
                } else {
                    Value::BigInt(i64::from_le_bytes(bytes))
                };
                Ok((value, 8))
            }
            DataType::VarChar(_) => {
                let len_bytes: [u8; 2] = data.get(..2).ok_or_else(short)?.try_into().unwrap();
                let len = u16::from_le_bytes(len_bytes) as usize;
                let bytes = data.get(2..2 + len).ok_or_else(short)?;
                let value = if is_null {
                    Value::Null
                } else {
                    Value::String(
                        String::from_utf8(bytes.to_vec())
                            .map_err(|e| RookError::TupleEncoding(e.to_string()))?,
                    )
                };
                Ok((value, 2 + len))
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}
