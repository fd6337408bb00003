use std::sync::Arc;

use crate::common::{Result, RookError};

use super::{Schema, Value};

/// A single row. Serialized as a null bitmap (one bit per column,
/// 1 = NULL) followed by every column's encoding in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Tuple {
    /// # Panics
    /// Panics when the value count does not match the schema.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        assert_eq!(
            values.len(),
            schema.column_count(),
            "value count must match schema column count"
        );
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let column_count = self.schema.column_count();
        let mut out = vec![0u8; column_count.div_ceil(8)];

        for (i, value) in self.values.iter().enumerate() {
            if value.is_null() {
                out[i / 8] |= 1 << (i % 8);
            }
        }

        for (i, column) in self.schema.columns().enumerate() {
            self.values[i].serialize_into(column.data_type(), &mut out)?;
        }

        Ok(out)
    }

    pub fn from_bytes(schema: Arc<Schema>, data: &[u8]) -> Result<Self> {
        let column_count = schema.column_count();
        let bitmap_len = column_count.div_ceil(8);
        let bitmap = data
            .get(..bitmap_len)
            .ok_or_else(|| RookError::TupleEncoding("tuple bytes truncated".to_string()))?;

        let mut offset = bitmap_len;
        let mut values = Vec::with_capacity(column_count);
        for (i, column) in schema.columns().enumerate() {
            let is_null = bitmap[i / 8] & (1 << (i % 8)) != 0;
            let (value, consumed) =
                Value::deserialize(column.data_type(), &data[offset..], is_null)?;
            values.push(value);
            offset += consumed;
        }

        Ok(Self { schema, values })
    }
}
