// The document-store wire protocol. Every backend implements this trait;
// everything above it (entity stores, provisioner, device engine) is
// backend-agnostic.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;
use crate::schema::{SecondaryIndex, TableLayout};

/// A stored item: a flat attribute document.
pub type Document = serde_json::Map<String, Value>;

/// An equality condition on an index key attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyCondition {
    pub attribute: String,
    pub value: Value,
}

impl KeyCondition {
    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// A condition evaluated against the currently stored item before a write is
/// applied. Evaluation and write are atomic; a failed condition surfaces as
/// [`StoreError::Conflict`](crate::StoreError::Conflict).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The stored item exists and carries the given attribute value.
    ValueEquals { attribute: String, value: Value },
    /// The stored item (if any) does not carry the attribute.
    AttributeMissing { attribute: String },
}

/// Lifecycle status of a table as reported by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Updating,
    Active,
}

/// Result of describing a table.
#[derive(Debug, Clone)]
pub struct TableDescription {
    pub name: String,
    pub status: TableStatus,
    /// Names of the secondary indexes currently present.
    pub index_names: Vec<String>,
}

/// The raw operations a partitioned key-value document store exposes.
///
/// Items are identified by a single string hash key; secondary indexes allow
/// equality queries on other attributes without a full scan. A single item
/// read or write is atomic; there are no multi-item transactions.
#[async_trait]
pub trait StoreClient: Send + Sync + fmt::Debug {
    /// List the names of all tables.
    async fn list_tables(&self) -> StoreResult<Vec<String>>;

    /// Describe a table's status and present indexes.
    async fn describe_table(&self, name: &str) -> StoreResult<TableDescription>;

    /// Create a table with its full key schema, attribute declarations, and
    /// secondary indexes in one call.
    async fn create_table(&self, layout: &TableLayout) -> StoreResult<()>;

    /// Add secondary indexes to an existing table. Purely additive.
    async fn update_table(&self, name: &str, indexes: &[SecondaryIndex]) -> StoreResult<()>;

    /// Write an item, replacing any existing item with the same hash key.
    /// When `condition` is given, the write only applies if the condition
    /// holds against the currently stored item.
    async fn put_item(
        &self,
        table: &str,
        item: Document,
        condition: Option<Condition>,
    ) -> StoreResult<()>;

    /// Read an item by hash key.
    async fn get_item(&self, table: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Delete an item by hash key, returning the removed item if one was
    /// present. The remove-and-return is atomic, which is what makes
    /// single-use credential redemption race-free.
    async fn delete_item(&self, table: &str, id: &str) -> StoreResult<Option<Document>>;

    /// Query a secondary index with equality conditions on its key
    /// attributes. Never scans the table.
    async fn query(
        &self,
        table: &str,
        index: &str,
        conditions: &[KeyCondition],
        limit: Option<usize>,
    ) -> StoreResult<Vec<Document>>;

    /// Read every item in a table.
    async fn scan(&self, table: &str) -> StoreResult<Vec<Document>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_condition_eq() {
        let cond = KeyCondition::eq("ClientId", "abc");
        assert_eq!(cond.attribute, "ClientId");
        assert_eq!(cond.value, Value::String("abc".into()));
    }
}
