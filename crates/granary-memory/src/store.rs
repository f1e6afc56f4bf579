// In-memory document store implementing the StoreClient wire protocol.
//
// Tables are HashMap entries keyed by name, each holding its layout and an
// item list. Index queries filter linearly on the index's key attributes,
// which matches the store contract (equality on index keys only). Tables are
// active the moment they are created, so the provisioner's wait loop returns
// on its first poll.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use granary_core::client::{
    Condition, Document, KeyCondition, StoreClient, TableDescription, TableStatus,
};
use granary_core::error::{StoreError, StoreResult};
use granary_core::schema::{SecondaryIndex, TableLayout};

/// Per-operation call counters, for asserting on provisioning behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpCounts {
    pub list_tables: u64,
    pub describe_table: u64,
    pub create_table: u64,
    pub update_table: u64,
    pub put_item: u64,
    pub get_item: u64,
    pub delete_item: u64,
    pub query: u64,
    pub scan: u64,
}

#[derive(Debug)]
struct TableData {
    layout: TableLayout,
    items: Vec<Document>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: HashMap<String, TableData>,
    counts: OpCounts,
}

/// In-memory document store.
///
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the per-operation call counters.
    pub async fn op_counts(&self) -> OpCounts {
        self.inner.read().await.counts
    }

    /// Number of items physically present in a table, ignoring any logical
    /// expiry or tombstones.
    pub async fn item_count(&self, table: &str) -> usize {
        self.inner
            .read()
            .await
            .tables
            .get(table)
            .map(|t| t.items.len())
            .unwrap_or(0)
    }
}

fn unknown_table(name: &str) -> StoreError {
    StoreError::NotFound(format!("table '{name}'"))
}

fn item_id<'a>(item: &'a Document, hash_key: &str) -> Option<&'a str> {
    item.get(hash_key).and_then(Value::as_str)
}

/// Evaluate a write condition against the currently stored item.
fn condition_holds(existing: Option<&Document>, condition: &Condition) -> bool {
    match condition {
        Condition::ValueEquals { attribute, value } => existing
            .map(|item| item.get(attribute) == Some(value))
            .unwrap_or(false),
        Condition::AttributeMissing { attribute } => existing
            .map(|item| !item.contains_key(attribute))
            .unwrap_or(true),
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn list_tables(&self) -> StoreResult<Vec<String>> {
        let mut inner = self.inner.write().await;
        inner.counts.list_tables += 1;
        let mut names: Vec<String> = inner.tables.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn describe_table(&self, name: &str) -> StoreResult<TableDescription> {
        let mut inner = self.inner.write().await;
        inner.counts.describe_table += 1;
        let table = inner.tables.get(name).ok_or_else(|| unknown_table(name))?;
        Ok(TableDescription {
            name: name.to_string(),
            status: TableStatus::Active,
            index_names: table.layout.indexes.iter().map(|ix| ix.name.clone()).collect(),
        })
    }

    async fn create_table(&self, layout: &TableLayout) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.counts.create_table += 1;
        if inner.tables.contains_key(&layout.name) {
            return Err(StoreError::Conflict(format!(
                "table '{}' already exists",
                layout.name
            )));
        }
        inner.tables.insert(
            layout.name.clone(),
            TableData {
                layout: layout.clone(),
                items: Vec::new(),
            },
        );
        Ok(())
    }

    async fn update_table(&self, name: &str, indexes: &[SecondaryIndex]) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.counts.update_table += 1;
        let table = inner
            .tables
            .get_mut(name)
            .ok_or_else(|| unknown_table(name))?;
        for index in indexes {
            if table.layout.find_index(&index.name).is_none() {
                table.layout.indexes.push(index.clone());
            }
        }
        Ok(())
    }

    async fn put_item(
        &self,
        table: &str,
        item: Document,
        condition: Option<Condition>,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.counts.put_item += 1;
        let data = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| unknown_table(table))?;

        let hash_key = data.layout.hash_key.clone();
        let id = item_id(&item, &hash_key)
            .ok_or_else(|| {
                StoreError::InvalidArgument(format!("item is missing hash key '{hash_key}'"))
            })?
            .to_string();

        let position = data
            .items
            .iter()
            .position(|existing| item_id(existing, &hash_key) == Some(id.as_str()));

        if let Some(ref cond) = condition {
            let existing = position.map(|pos| &data.items[pos]);
            if !condition_holds(existing, cond) {
                return Err(StoreError::Conflict(format!(
                    "conditional write to '{table}' failed for item '{id}'"
                )));
            }
        }

        match position {
            Some(pos) => data.items[pos] = item,
            None => data.items.push(item),
        }
        Ok(())
    }

    async fn get_item(&self, table: &str, id: &str) -> StoreResult<Option<Document>> {
        let mut inner = self.inner.write().await;
        inner.counts.get_item += 1;
        let data = inner.tables.get(table).ok_or_else(|| unknown_table(table))?;
        let hash_key = &data.layout.hash_key;
        Ok(data
            .items
            .iter()
            .find(|item| item_id(item, hash_key) == Some(id))
            .cloned())
    }

    async fn delete_item(&self, table: &str, id: &str) -> StoreResult<Option<Document>> {
        let mut inner = self.inner.write().await;
        inner.counts.delete_item += 1;
        let data = inner
            .tables
            .get_mut(table)
            .ok_or_else(|| unknown_table(table))?;
        let hash_key = data.layout.hash_key.clone();
        let position = data
            .items
            .iter()
            .position(|item| item_id(item, &hash_key) == Some(id));
        Ok(position.map(|pos| data.items.remove(pos)))
    }

    async fn query(
        &self,
        table: &str,
        index: &str,
        conditions: &[KeyCondition],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>> {
        let mut inner = self.inner.write().await;
        inner.counts.query += 1;
        let data = inner.tables.get(table).ok_or_else(|| unknown_table(table))?;

        let index = data.layout.find_index(index).ok_or_else(|| {
            StoreError::InvalidArgument(format!("table '{table}' has no index '{index}'"))
        })?;
        let key_attributes = index.key_attributes();
        for condition in conditions {
            if !key_attributes.contains(&condition.attribute.as_str()) {
                return Err(StoreError::InvalidArgument(format!(
                    "'{}' is not a key of index '{}'",
                    condition.attribute, index.name
                )));
            }
        }

        let mut matches: Vec<Document> = data
            .items
            .iter()
            .filter(|item| {
                conditions
                    .iter()
                    .all(|cond| item.get(&cond.attribute) == Some(&cond.value))
            })
            .cloned()
            .collect();
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    async fn scan(&self, table: &str) -> StoreResult<Vec<Document>> {
        let mut inner = self.inner.write().await;
        inner.counts.scan += 1;
        let data = inner.tables.get(table).ok_or_else(|| unknown_table(table))?;
        Ok(data.items.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use granary_core::schema::AttributeType;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn test_layout() -> TableLayout {
        TableLayout::new("things")
            .attribute("Owner", AttributeType::S)
            .index(SecondaryIndex::new("Owner-index", "Owner"))
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();

        store
            .put_item("things", doc(json!({"Id": "t1", "Owner": "alice"})), None)
            .await
            .unwrap();

        let item = store.get_item("things", "t1").await.unwrap().unwrap();
        assert_eq!(item["Owner"], "alice");
        assert!(store.get_item("things", "t2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_by_hash_key() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();

        store
            .put_item("things", doc(json!({"Id": "t1", "Owner": "alice"})), None)
            .await
            .unwrap();
        store
            .put_item("things", doc(json!({"Id": "t1", "Owner": "bob"})), None)
            .await
            .unwrap();

        assert_eq!(store.item_count("things").await, 1);
        let item = store.get_item("things", "t1").await.unwrap().unwrap();
        assert_eq!(item["Owner"], "bob");
    }

    #[tokio::test]
    async fn test_conditional_put_value_equals() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();
        store
            .put_item("things", doc(json!({"Id": "t1", "Version": 0})), None)
            .await
            .unwrap();

        let ok = store
            .put_item(
                "things",
                doc(json!({"Id": "t1", "Version": 1})),
                Some(Condition::ValueEquals {
                    attribute: "Version".into(),
                    value: json!(0),
                }),
            )
            .await;
        assert!(ok.is_ok());

        // Stale writer still expects version 0.
        let stale = store
            .put_item(
                "things",
                doc(json!({"Id": "t1", "Version": 1})),
                Some(Condition::ValueEquals {
                    attribute: "Version".into(),
                    value: json!(0),
                }),
            )
            .await;
        assert!(matches!(stale, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_conditional_put_attribute_missing() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();

        let cond = Some(Condition::AttributeMissing {
            attribute: "Id".into(),
        });
        store
            .put_item("things", doc(json!({"Id": "t1"})), cond.clone())
            .await
            .unwrap();
        let second = store.put_item("things", doc(json!({"Id": "t1"})), cond).await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_returns_old_item_once() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();
        store
            .put_item("things", doc(json!({"Id": "t1", "Owner": "alice"})), None)
            .await
            .unwrap();

        let removed = store.delete_item("things", "t1").await.unwrap();
        assert_eq!(removed.unwrap()["Owner"], "alice");

        let again = store.delete_item("things", "t1").await.unwrap();
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_query_by_index() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();
        for (id, owner) in [("t1", "alice"), ("t2", "bob"), ("t3", "alice")] {
            store
                .put_item("things", doc(json!({"Id": id, "Owner": owner})), None)
                .await
                .unwrap();
        }

        let matches = store
            .query(
                "things",
                "Owner-index",
                &[KeyCondition::eq("Owner", "alice")],
                None,
            )
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);

        let limited = store
            .query(
                "things",
                "Owner-index",
                &[KeyCondition::eq("Owner", "alice")],
                Some(1),
            )
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_query_rejects_non_key_attribute() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();

        let result = store
            .query(
                "things",
                "Owner-index",
                &[KeyCondition::eq("Color", "red")],
                None,
            )
            .await;
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_create_table_twice_conflicts() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();
        let second = store.create_table(&test_layout()).await;
        assert!(matches!(second, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_update_table_adds_index() {
        let store = MemoryStore::new();
        let mut layout = test_layout();
        layout.indexes.clear();
        store.create_table(&layout).await.unwrap();

        store
            .update_table("things", &[SecondaryIndex::new("Owner-index", "Owner")])
            .await
            .unwrap();

        let description = store.describe_table("things").await.unwrap();
        assert_eq!(description.index_names, vec!["Owner-index".to_string()]);
        assert_eq!(description.status, TableStatus::Active);
    }

    #[tokio::test]
    async fn test_scan_and_counts() {
        let store = MemoryStore::new();
        store.create_table(&test_layout()).await.unwrap();
        store
            .put_item("things", doc(json!({"Id": "t1"})), None)
            .await
            .unwrap();

        assert_eq!(store.scan("things").await.unwrap().len(), 1);

        let counts = store.op_counts().await;
        assert_eq!(counts.create_table, 1);
        assert_eq!(counts.put_item, 1);
        assert_eq!(counts.scan, 1);
    }

    #[tokio::test]
    async fn test_unknown_table_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_item("nope", "t1").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.scan("nope").await,
            Err(StoreError::NotFound(_))
        ));
    }
}
