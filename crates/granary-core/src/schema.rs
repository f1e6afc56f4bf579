// Table-layout DSL used to describe the required shape of each backing table:
// the hash key, typed attribute declarations, and queryable secondary
// indexes. The schema provisioner consumes these layouts at startup.

use serde::{Deserialize, Serialize};

use crate::options::Throughput;

/// Scalar attribute types understood by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    /// String.
    S,
    /// Number.
    N,
    /// Binary.
    B,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
        }
    }
}

/// A typed attribute declaration. Only attributes used as table or index
/// keys need to be declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub attribute_type: AttributeType,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, attribute_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// A secondary index: an alternate, store-maintained ordering of items by a
/// different attribute, queryable without a full scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryIndex {
    pub name: String,
    pub hash_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range_key: Option<String>,
}

impl SecondaryIndex {
    pub fn new(name: impl Into<String>, hash_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash_key: hash_key.into(),
            range_key: None,
        }
    }

    pub fn with_range(mut self, range_key: impl Into<String>) -> Self {
        self.range_key = Some(range_key.into());
        self
    }

    /// All key attributes of this index, hash key first.
    pub fn key_attributes(&self) -> Vec<&str> {
        let mut keys = vec![self.hash_key.as_str()];
        if let Some(ref range) = self.range_key {
            keys.push(range.as_str());
        }
        keys
    }
}

/// The required shape of one backing table.
///
/// Every table is keyed by a single string hash key (`Id` by convention);
/// relationships between entities are resolved through secondary indexes on
/// foreign-key-like string attributes, never by joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableLayout {
    pub name: String,
    pub hash_key: String,
    pub attributes: Vec<AttributeDefinition>,
    pub indexes: Vec<SecondaryIndex>,
    pub throughput: Throughput,
}

impl TableLayout {
    /// Start a layout keyed by a string `Id` hash key.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hash_key: "Id".to_string(),
            attributes: vec![AttributeDefinition::new("Id", AttributeType::S)],
            indexes: Vec::new(),
            throughput: Throughput::default(),
        }
    }

    /// Declare an additional key attribute.
    pub fn attribute(mut self, name: &str, attribute_type: AttributeType) -> Self {
        self.attributes
            .push(AttributeDefinition::new(name, attribute_type));
        self
    }

    /// Add a secondary index.
    pub fn index(mut self, index: SecondaryIndex) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn with_throughput(mut self, throughput: Throughput) -> Self {
        self.throughput = throughput;
        self
    }

    /// Look up an index by name.
    pub fn find_index(&self, name: &str) -> Option<&SecondaryIndex> {
        self.indexes.iter().find(|ix| ix.name == name)
    }
}
