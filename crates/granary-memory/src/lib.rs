//! In-memory [`StoreClient`](granary_core::StoreClient) backend.
//!
//! Backs the test suites and embedded use. Data lives in a `HashMap` behind
//! a `tokio::sync::RwLock`; conditional writes and removing deletes are
//! atomic under the write lock.

mod store;

pub use store::{MemoryStore, OpCounts};
