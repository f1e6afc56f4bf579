//! Core storage abstractions for the granary credential store.
//!
//! This crate defines the pieces every backend shares: the error taxonomy,
//! the table-layout schema DSL, the [`StoreClient`] wire-protocol trait, the
//! idempotent schema provisioner, and id/code generation helpers. Typed
//! entity stores live in the `granary` crate; concrete backends (such as
//! `granary-memory`) implement [`StoreClient`].
//!
//! [`StoreClient`]: client::StoreClient

pub mod client;
pub mod codes;
pub mod error;
pub mod options;
pub mod provision;
pub mod schema;

pub use client::{Condition, Document, KeyCondition, StoreClient, TableDescription, TableStatus};
pub use error::{StoreError, StoreResult};
pub use options::{Throughput, WaitOptions};
pub use schema::{AttributeDefinition, AttributeType, SecondaryIndex, TableLayout};
