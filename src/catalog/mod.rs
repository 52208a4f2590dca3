use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::storage::{HeapFile, StorageError, StorageResult, StoreLookup, TableId};
use crate::tuple::{FieldType, TdItem, TupleDesc};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("table {0} not found")]
    TableNotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// One registered table: its backing heap file plus catalog-level naming
#[derive(Debug)]
pub struct Table {
    store: HeapFile,
    name: String,
    primary_key: Option<String>,
}

impl Table {
    pub fn new(store: HeapFile, name: impl Into<String>, primary_key: Option<String>) -> Self {
        Self {
            store,
            name: name.into(),
            primary_key,
        }
    }

    /// Table id, taken from the backing store
    pub fn id(&self) -> TableId {
        self.store.table_id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn store(&self) -> &HeapFile {
        &self.store
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        self.store.tuple_desc()
    }
}

/// Maps table ids and names to their tables. Ids and names are each unique;
/// registering a table under an id or name already in use replaces the
/// previous registration entirely.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: AHashMap<TableId, Table>,
    by_name: AHashMap<String, TableId>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Any existing table with the same id or the same
    /// name is dropped first, so both indexes stay one-to-one.
    pub fn add_table(&mut self, table: Table) -> TableId {
        let id = table.id();
        if let Some(old) = self.tables.remove(&id) {
            self.by_name.remove(old.name());
        }
        if let Some(old_id) = self.by_name.remove(table.name()) {
            self.tables.remove(&old_id);
        }

        info!(table_id = id, name = table.name(), "registering table");
        self.by_name.insert(table.name().to_string(), id);
        self.tables.insert(id, table);
        id
    }

    pub fn table(&self, id: TableId) -> CatalogResult<&Table> {
        self.tables
            .get(&id)
            .ok_or_else(|| CatalogError::TableNotFound(format!("id {}", id)))
    }

    pub fn table_by_name(&self, name: &str) -> CatalogResult<&Table> {
        let id = self.table_id(name)?;
        self.table(id)
    }

    pub fn table_id(&self, name: &str) -> CatalogResult<TableId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }

    pub fn tuple_desc(&self, id: TableId) -> CatalogResult<&TupleDesc> {
        Ok(self.table(id)?.tuple_desc())
    }

    /// Registered tables in no particular order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Write the catalog's table registrations as JSON. Only metadata is
    /// saved; the heap files themselves stay where they are.
    pub fn save(&self, path: &Path) -> CatalogResult<()> {
        let mut tables: Vec<TableMetadata> = self.tables.values().map(TableMetadata::from).collect();
        tables.sort_by_key(|t| t.id);

        let content = serde_json::to_string_pretty(&CatalogMetadata { tables })?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Rebuild a catalog from saved metadata, reopening each table's
    /// backing file
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let content = fs::read_to_string(path)?;
        let metadata: CatalogMetadata = serde_json::from_str(&content)?;

        let mut catalog = Self::new();
        for table in metadata.tables {
            let desc = TupleDesc::new(
                table
                    .fields
                    .into_iter()
                    .map(|f| TdItem::new(f.field_type, f.name))
                    .collect(),
            );
            let store = HeapFile::open(&table.file, table.id, desc)?;
            catalog.add_table(Table::new(store, table.name, table.primary_key));
        }
        Ok(catalog)
    }
}

impl StoreLookup for Catalog {
    fn page_store(&self, table_id: TableId) -> StorageResult<&HeapFile> {
        self.tables
            .get(&table_id)
            .map(Table::store)
            .ok_or(StorageError::UnknownTable(table_id))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FieldMetadata {
    name: Option<String>,
    #[serde(rename = "type")]
    field_type: FieldType,
}

#[derive(Debug, Serialize, Deserialize)]
struct TableMetadata {
    id: TableId,
    name: String,
    file: PathBuf,
    primary_key: Option<String>,
    fields: Vec<FieldMetadata>,
}

impl From<&Table> for TableMetadata {
    fn from(table: &Table) -> Self {
        Self {
            id: table.id(),
            name: table.name().to_string(),
            file: table.store().path().to_path_buf(),
            primary_key: table.primary_key().map(str::to_string),
            fields: table
                .tuple_desc()
                .items()
                .iter()
                .map(|item| FieldMetadata {
                    name: item.name.clone(),
                    field_type: item.field_type,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogMetadata {
    tables: Vec<TableMetadata>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{PageCache, TransactionId};
    use crate::tuple::{Field, Tuple};
    use tempfile::TempDir;

    fn test_desc() -> TupleDesc {
        TupleDesc::new(vec![
            TdItem::new(FieldType::Int, Some("id".to_string())),
            TdItem::new(FieldType::Str, Some("name".to_string())),
        ])
    }

    fn open_table(dir: &TempDir, id: TableId, name: &str) -> Table {
        let store =
            HeapFile::open(dir.path().join(format!("{}.tbl", name)), id, test_desc()).unwrap();
        Table::new(store, name, Some("id".to_string()))
    }

    #[test]
    fn test_lookup_by_id_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new();
        catalog.add_table(open_table(&dir, 1, "users"));
        catalog.add_table(open_table(&dir, 2, "orders"));

        assert_eq!(catalog.table_count(), 2);
        assert_eq!(catalog.table(1).unwrap().name(), "users");
        assert_eq!(catalog.table_id("orders").unwrap(), 2);
        assert_eq!(catalog.table_by_name("users").unwrap().id(), 1);
        assert_eq!(catalog.tuple_desc(1).unwrap(), &test_desc());
        assert_eq!(catalog.table(1).unwrap().primary_key(), Some("id"));
    }

    #[test]
    fn test_unknown_table() {
        let catalog = Catalog::new();
        assert!(matches!(
            catalog.table(9),
            Err(CatalogError::TableNotFound(_))
        ));
        assert!(matches!(
            catalog.table_id("nope"),
            Err(CatalogError::TableNotFound(_))
        ));
        assert!(matches!(
            catalog.page_store(9),
            Err(StorageError::UnknownTable(9))
        ));
    }

    #[test]
    fn test_add_table_replaces_same_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new();
        catalog.add_table(open_table(&dir, 1, "users"));
        catalog.add_table(open_table(&dir, 2, "users"));

        assert_eq!(catalog.table_count(), 1);
        assert_eq!(catalog.table_id("users").unwrap(), 2);
        assert!(catalog.table(1).is_err());
    }

    #[test]
    fn test_add_table_replaces_same_id() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::new();
        catalog.add_table(open_table(&dir, 1, "users"));
        catalog.add_table(open_table(&dir, 1, "accounts"));

        assert_eq!(catalog.table_count(), 1);
        assert_eq!(catalog.table(1).unwrap().name(), "accounts");
        assert!(catalog.table_id("users").is_err());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let metadata_path = dir.path().join("catalog.json");
        let tid = TransactionId::new();

        let mut catalog = Catalog::new();
        catalog.add_table(open_table(&dir, 1, "users"));

        let mut cache = PageCache::new(4);
        let mut tuple = Tuple::with_fields(
            test_desc(),
            vec![Field::Int(7), Field::Str("alice".to_string())],
        )
        .unwrap();
        cache.insert_tuple(tid, 1, &mut tuple, &catalog).unwrap();
        cache.flush_all(&catalog).unwrap();

        catalog.save(&metadata_path).unwrap();
        drop(catalog);

        let restored = Catalog::load(&metadata_path).unwrap();
        assert_eq!(restored.table_count(), 1);
        let table = restored.table_by_name("users").unwrap();
        assert_eq!(table.id(), 1);
        assert_eq!(table.primary_key(), Some("id"));
        assert_eq!(table.tuple_desc().field_name(1).unwrap(), Some("name"));

        // data written before the save is visible through the reloaded catalog
        let mut cache = PageCache::new(4);
        let tuples = restored
            .page_store(1)
            .unwrap()
            .scan(TransactionId::new(), &mut cache, &restored)
            .unwrap();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].get_field(0).unwrap(), &Field::Int(7));
    }
}
