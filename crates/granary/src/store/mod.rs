//! One store per entity kind over a shared [`StoreClient`].
//!
//! Each store is constructed with its storage client and resolved table
//! name, declares its own table layout, and provisions it through
//! [`initialize`](ApplicationStore::initialize) once at startup. All
//! operations take a cancellation token checked before any network call;
//! a write already issued is not rolled back on cancellation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use granary_core::client::{Condition, Document};
use granary_core::error::{StoreError, StoreResult};

mod application;
mod authorization;
mod device_code;
mod token;

pub use application::ApplicationStore;
pub use authorization::AuthorizationStore;
pub use device_code::DeviceCodeStore;
pub use token::TokenStore;

pub(crate) fn to_document<T: Serialize>(entity: &T) -> StoreResult<Document> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidArgument(
            "entity did not serialize to a document".into(),
        )),
    }
}

pub(crate) fn from_document<T: DeserializeOwned>(doc: Document) -> StoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Write guard for optimistic-concurrency updates: the stored row must still
/// carry the version the caller read.
pub(crate) fn version_guard(expected: i64) -> Condition {
    Condition::ValueEquals {
        attribute: "Version".into(),
        value: Value::from(expected),
    }
}

pub(crate) fn require(value: &str, what: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidArgument(format!("{what} must not be empty")));
    }
    Ok(())
}
