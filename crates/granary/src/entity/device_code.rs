// A device-authorization code pair: one short code the user types in a
// browser, one unguessable code the device polls with.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use granary_core::codes::{new_device_code, new_id, new_user_code};
use granary_core::error::{StoreError, StoreResult};

use super::state::Activation;

/// One pending or authorized device-authorization request.
///
/// The row is the whole state machine: `Pending` until the operator accepts,
/// `Authorized` afterwards, and physically deleted on deny, revoke, or
/// redemption. There is no path back to `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceCode {
    pub id: String,
    pub created_on: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub application: String,
    pub device_code: String,
    pub user_code: String,
    #[serde(rename = "AuthorizedOn")]
    pub authorized: Activation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_polled_at: Option<DateTime<Utc>>,
    pub scopes: Vec<String>,
    pub version: i64,
}

impl DeviceCode {
    /// Build a fresh pending row with generated codes and an expiry window
    /// of `lifetime` from now.
    pub fn new(
        application: impl Into<String>,
        scopes: Vec<String>,
        lifetime: Duration,
        user_code_length: usize,
        device_code_length: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            created_on: now,
            expires_at: now + lifetime,
            application: application.into(),
            device_code: new_device_code(device_code_length),
            user_code: new_user_code(user_code_length),
            authorized: Activation::Pending,
            subject: None,
            last_polled_at: None,
            scopes,
            version: 0,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Record the operator's acceptance. Fails with
    /// [`StoreError::Conflict`] if the code is already authorized; this is
    /// the only writer of the authorized state.
    pub fn authorize(&mut self, subject: impl Into<String>, at: DateTime<Utc>) -> StoreResult<()> {
        if self.authorized.is_authorized() {
            return Err(StoreError::Conflict(format!(
                "device code '{}' is already authorized",
                self.id
            )));
        }
        self.authorized = Activation::Authorized(at);
        self.subject = Some(subject.into());
        Ok(())
    }
}
