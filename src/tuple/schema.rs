use std::collections::HashMap;
use std::sync::Arc;

use super::DataType;

/// A single column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    data_type: DataType,
    ordinal: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            ordinal: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn ordinal(&self) -> usize {
        self.ordinal
    }
}

/// An ordered set of columns with by-name lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    pub fn new(mut columns: Vec<Column>) -> Arc<Self> {
        let mut by_name = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter_mut().enumerate() {
            column.ordinal = i;
            by_name.insert(column.name.clone(), i);
        }
        Arc::new(Self { columns, by_name })
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Concatenates two schemas, as a join's output schema. Right-side
    /// names that collide keep working by ordinal.
    pub fn join(left: &Schema, right: &Schema) -> Arc<Schema> {
        let columns = left
            .columns
            .iter()
            .chain(right.columns.iter())
            .map(|c| Column::new(c.name.clone(), c.data_type))
            .collect();
        Schema::new(columns)
    }
}
