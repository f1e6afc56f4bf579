//! Entity models stored as flat attribute documents.
//!
//! Every entity carries an opaque `Id` hash key, a `CreatedOn` timestamp,
//! and a `Version` counter used for optimistic-concurrency updates.
//! Relationships between entities are plain string identifiers resolved
//! through secondary-index queries, never in-memory references.

mod application;
mod authorization;
mod device_code;
mod state;
mod token;

pub use application::{Application, ApplicationKind};
pub use authorization::Authorization;
pub use device_code::DeviceCode;
pub use state::{Activation, Deletion};
pub use token::{Token, TokenKind};
