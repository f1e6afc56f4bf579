//! OAuth2/OpenID-Connect credential storage over a partitioned key-value
//! document store, plus the device-authorization grant engine built on it.
//!
//! The crate has three layers:
//!
//! - [`entity`]: the stored models (applications, authorizations, tokens,
//!   device codes) as flat attribute documents.
//! - [`store`]: one typed store per entity kind over a shared
//!   [`StoreClient`], including idempotent schema provisioning.
//! - [`device`]: the device-authorization state machine, the only layer
//!   that speaks protocol error codes.
//!
//! [`Provider`] bundles the lot behind the verb set an OIDC endpoint layer
//! calls into. Backends implement [`StoreClient`] from `granary-core`; the
//! `granary-memory` crate ships an in-memory one.

pub mod device;
pub mod entity;
pub mod options;
pub mod provider;
pub mod store;

pub use device::{
    DeviceAuthorizationEngine, DeviceFlowError, DeviceGrant, IssuedDeviceCode,
};
pub use entity::{
    Activation, Application, ApplicationKind, Authorization, Deletion, DeviceCode, Token,
    TokenKind,
};
pub use options::{DeviceFlowOptions, ProviderOptions, TableNames};
pub use provider::Provider;
pub use store::{ApplicationStore, AuthorizationStore, DeviceCodeStore, TokenStore};

pub use granary_core::client::StoreClient;
pub use granary_core::error::{StoreError, StoreResult};
pub use granary_core::options::{Throughput, WaitOptions};
