use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::buffer::BufferPoolManager;
use crate::common::{
    Result, RookError, DEFAULT_BUCKET_MAX_SIZE, DEFAULT_DIRECTORY_MAX_DEPTH,
    DEFAULT_HEADER_MAX_DEPTH,
};
use crate::index::{ExtendibleHashTable, Fnv1aHasher};
use crate::storage::TableHeap;
use crate::tuple::{Schema, Tuple, Value};

pub type TableOid = u32;
pub type IndexOid = u32;

/// Everything the executors need to know about a table.
pub struct TableInfo {
    pub oid: TableOid,
    pub name: String,
    pub schema: Arc<Schema>,
    pub heap: Arc<TableHeap>,
}

/// A single-column hash index over a table.
pub struct IndexInfo {
    pub oid: IndexOid,
    pub name: String,
    pub table_oid: TableOid,
    /// Ordinal of the indexed column in the table schema
    pub key_column: usize,
    pub index: Arc<ExtendibleHashTable>,
}

impl IndexInfo {
    /// Extracts this index's key from a table tuple. Null keys are not
    /// indexed and come back as None.
    pub fn key_of(&self, tuple: &Tuple) -> Result<Option<u32>> {
        match tuple.value(self.key_column) {
            Some(Value::Integer(v)) => Ok(Some(*v as u32)),
            Some(Value::Null) => Ok(None),
            other => Err(RookError::Execution(format!(
                "index {} expects an integer key, got {:?}",
                self.name, other
            ))),
        }
    }
}

#[derive(Default)]
struct CatalogInner {
    tables: HashMap<TableOid, Arc<TableInfo>>,
    table_names: HashMap<String, TableOid>,
    indexes: HashMap<IndexOid, Arc<IndexInfo>>,
    table_indexes: HashMap<TableOid, Vec<IndexOid>>,
    next_table_oid: TableOid,
    next_index_oid: IndexOid,
}

/// In-memory catalog of tables and their indexes.
pub struct Catalog {
    bpm: Arc<BufferPoolManager>,
    inner: RwLock<CatalogInner>,
}

impl Catalog {
    pub fn new(bpm: Arc<BufferPoolManager>) -> Self {
        Self {
            bpm,
            inner: RwLock::new(CatalogInner::default()),
        }
    }

    pub fn create_table(&self, name: &str, schema: Arc<Schema>) -> Result<Arc<TableInfo>> {
        let mut inner = self.inner.write();
        if inner.table_names.contains_key(name) {
            return Err(RookError::TableAlreadyExists(name.to_string()));
        }

        let heap = Arc::new(TableHeap::new(Arc::clone(&self.bpm))?);
        let oid = inner.next_table_oid;
        inner.next_table_oid += 1;

        let info = Arc::new(TableInfo {
            oid,
            name: name.to_string(),
            schema,
            heap,
        });
        inner.tables.insert(oid, Arc::clone(&info));
        inner.table_names.insert(name.to_string(), oid);
        inner.table_indexes.insert(oid, Vec::new());
        Ok(info)
    }

    /// Creates a hash index over one integer column and backfills it
    /// from the table's live tuples.
    pub fn create_index(
        &self,
        name: &str,
        table_name: &str,
        key_column_name: &str,
    ) -> Result<Arc<IndexInfo>> {
        let table = self
            .table_by_name(table_name)
            .ok_or_else(|| RookError::Execution(format!("table {} not found", table_name)))?;
        let key_column = table
            .schema
            .column_index(key_column_name)
            .ok_or_else(|| RookError::ColumnNotFound(key_column_name.to_string()))?;

        let index = Arc::new(ExtendibleHashTable::new(
            Arc::clone(&self.bpm),
            Box::new(Fnv1aHasher),
            DEFAULT_HEADER_MAX_DEPTH,
            DEFAULT_DIRECTORY_MAX_DEPTH,
            DEFAULT_BUCKET_MAX_SIZE,
        )?);

        let info = {
            let mut inner = self.inner.write();
            let oid = inner.next_index_oid;
            inner.next_index_oid += 1;

            let info = Arc::new(IndexInfo {
                oid,
                name: name.to_string(),
                table_oid: table.oid,
                key_column,
                index,
            });
            inner.indexes.insert(oid, Arc::clone(&info));
            inner
                .table_indexes
                .get_mut(&table.oid)
                .expect("table registered without index list")
                .push(oid);
            info
        };

        // Backfill from existing rows.
        let mut iter = table.heap.iter();
        while let Some(rid) = iter.next()? {
            let (meta, bytes) = table.heap.tuple(rid)?;
            if meta.is_deleted {
                continue;
            }
            let tuple = Tuple::from_bytes(Arc::clone(&table.schema), &bytes)?;
            if let Some(key) = info.key_of(&tuple)? {
                info.index.insert(key, rid)?;
            }
        }

        Ok(info)
    }

    pub fn table(&self, oid: TableOid) -> Option<Arc<TableInfo>> {
        self.inner.read().tables.get(&oid).cloned()
    }

    pub fn table_by_name(&self, name: &str) -> Option<Arc<TableInfo>> {
        let inner = self.inner.read();
        let oid = inner.table_names.get(name)?;
        inner.tables.get(oid).cloned()
    }

    pub fn index(&self, oid: IndexOid) -> Option<Arc<IndexInfo>> {
        self.inner.read().indexes.get(&oid).cloned()
    }

    pub fn table_indexes(&self, table_oid: TableOid) -> Vec<Arc<IndexInfo>> {
        let inner = self.inner.read();
        inner
            .table_indexes
            .get(&table_oid)
            .map(|oids| {
                oids.iter()
                    .filter_map(|oid| inner.indexes.get(oid).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The single-column index on the given column, if one exists. Used
    /// by the seq-scan-to-index-scan rewrite.
    pub fn index_on_column(&self, table_oid: TableOid, column: usize) -> Option<Arc<IndexInfo>> {
        self.table_indexes(table_oid)
            .into_iter()
            .find(|info| info.key_column == column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::disk::DiskManager;
    use crate::tuple::{Column, DataType};
    use tempfile::NamedTempFile;

    fn create_catalog() -> (Catalog, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm = Arc::new(BufferPoolManager::new(64, 2, dm));
        (Catalog::new(bpm), temp_file)
    }

    #[test]
    fn test_create_and_lookup_table() {
        let (catalog, _temp) = create_catalog();
        let schema = Schema::new(vec![Column::new("id", DataType::Integer)]);

        let info = catalog.create_table("t", schema).unwrap();
        assert_eq!(catalog.table(info.oid).unwrap().name, "t");
        assert!(catalog.table_by_name("t").is_some());
        assert!(catalog.table_by_name("missing").is_none());

        assert!(matches!(
            catalog.create_table("t", catalog.table(info.oid).unwrap().schema.clone()),
            Err(RookError::TableAlreadyExists(_))
        ));
    }

    #[test]
    fn test_create_index_backfills_existing_rows() {
        let (catalog, _temp) = create_catalog();
        let schema = Schema::new(vec![Column::new("id", DataType::Integer)]);
        let table = catalog.create_table("t", Arc::clone(&schema)).unwrap();

        let tuple = Tuple::new(Arc::clone(&schema), vec![Value::Integer(42)]);
        let rid = table.heap.insert_tuple(&tuple.to_bytes().unwrap()).unwrap();

        let index = catalog.create_index("t_id", "t", "id").unwrap();
        assert_eq!(index.index.get(42).unwrap(), Some(rid));
        assert_eq!(catalog.index_on_column(table.oid, 0).unwrap().oid, index.oid);
    }
}
