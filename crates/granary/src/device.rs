//! The device-authorization grant engine.
//!
//! State machine over a single [`DeviceCode`] row: `Pending` until the
//! operator accepts, `Authorized` afterwards, and deleted on deny, revoke,
//! or redemption. This is the only layer that translates raw store outcomes
//! into protocol-level results (`authorization_pending`, `slow_down`,
//! `access_denied`, `expired_token`).

use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use granary_core::error::{check_cancelled, StoreError, StoreResult};
use granary_core::options::WaitOptions;

use crate::entity::{Activation, DeviceCode};
use crate::options::DeviceFlowOptions;
use crate::store::DeviceCodeStore;

/// Protocol-level outcomes of the device flow, named after the error codes
/// the token endpoint puts on the wire.
#[derive(Debug, thiserror::Error)]
pub enum DeviceFlowError {
    /// The operator has not decided yet; keep polling at the advertised
    /// interval.
    #[error("authorization request is still pending")]
    AuthorizationPending,

    /// The client is polling faster than the advertised interval.
    #[error("polling faster than the advertised interval")]
    SlowDown,

    /// The code was denied, revoked, already redeemed, or never existed.
    /// These are deliberately indistinguishable to the polling client.
    #[error("device code was denied or does not exist")]
    AccessDenied,

    /// The code pair outlived its lifetime before being authorized.
    #[error("device code has expired")]
    ExpiredToken,

    /// A second accept raced an earlier one; the first decision stands.
    #[error("device code is already authorized")]
    AlreadyAuthorized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DeviceFlowError {
    /// RFC 8628 error code for the token-endpoint response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::AccessDenied => "access_denied",
            Self::ExpiredToken => "expired_token",
            Self::AlreadyAuthorized => "invalid_grant",
            Self::Store(_) => "server_error",
        }
    }
}

/// What a device receives when it starts the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDeviceCode {
    /// Row id, usable with [`DeviceAuthorizationEngine::deny`].
    pub id: String,
    /// The unguessable code the device polls with.
    pub device_code: String,
    /// The short code the user types on another device.
    pub user_code: String,
    /// Minimum polling cadence the client must honor.
    pub interval: Duration,
    /// How long the code pair stays redeemable.
    pub expires_in: Duration,
}

/// What a successful redemption hands to the token issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceGrant {
    pub subject: String,
    pub application: String,
    pub scopes: Vec<String>,
}

/// Engine driving the device-authorization state machine over a
/// [`DeviceCodeStore`].
#[derive(Debug, Clone)]
pub struct DeviceAuthorizationEngine {
    store: DeviceCodeStore,
    options: DeviceFlowOptions,
}

impl DeviceAuthorizationEngine {
    pub fn new(store: DeviceCodeStore, options: DeviceFlowOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &DeviceFlowOptions {
        &self.options
    }

    /// Provision the backing table. Idempotent.
    pub async fn initialize(
        &self,
        wait: &WaitOptions,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.store.initialize(wait, cancel).await
    }

    /// Start the flow: persist a fresh pending row and hand both codes to
    /// the device.
    pub async fn issue(
        &self,
        application: &str,
        scopes: Vec<String>,
        cancel: &CancellationToken,
    ) -> StoreResult<IssuedDeviceCode> {
        let code = DeviceCode::new(
            application,
            scopes,
            self.options.code_lifetime,
            self.options.user_code_length,
            self.options.device_code_length,
        );
        self.store.create(&code, cancel).await?;
        tracing::info!(id = %code.id, application, "issued device code pair");
        Ok(IssuedDeviceCode {
            id: code.id,
            device_code: code.device_code,
            user_code: code.user_code,
            interval: self.options.poll_interval,
            expires_in: self.options.code_lifetime,
        })
    }

    /// Resolve the code the user typed, for the verification page.
    pub async fn find_by_user_code(
        &self,
        user_code: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        self.store.find_by_user_code(user_code, cancel).await
    }

    pub async fn find_by_device_code(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        self.store.find_by_device_code(device_code, cancel).await
    }

    /// Record the operator's acceptance of a code the caller has already
    /// resolved through [`find_by_user_code`](Self::find_by_user_code).
    ///
    /// The write is guarded on the stored row still being pending, so a
    /// poll landing between the operator's read and the accept cannot fail
    /// it; of two racing accepts exactly one lands and the loser observes
    /// [`DeviceFlowError::AlreadyAuthorized`].
    pub async fn authorize(
        &self,
        code: &mut DeviceCode,
        subject: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DeviceFlowError> {
        match self.store.authorize(code, subject, cancel).await {
            Ok(()) => {
                tracing::info!(id = %code.id, "device code authorized");
                Ok(())
            }
            Err(StoreError::Conflict(_)) => Err(DeviceFlowError::AlreadyAuthorized),
            Err(other) => Err(other.into()),
        }
    }

    /// Deny or revoke a pending request. The next poll reports access
    /// denied.
    pub async fn deny(&self, id: &str, cancel: &CancellationToken) -> StoreResult<()> {
        self.store.revoke(id, cancel).await?;
        tracing::info!(id, "device code denied");
        Ok(())
    }

    /// One step of the polling loop, called by the token endpoint on each
    /// client request.
    ///
    /// Everything but a redeemed grant comes back as a [`DeviceFlowError`]
    /// carrying the protocol error code. A successful redemption consumes
    /// the row, so it succeeds at most once per issued code.
    pub async fn poll(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> Result<DeviceGrant, DeviceFlowError> {
        check_cancelled(cancel)?;
        let Some(code) = self.store.find_by_device_code(device_code, cancel).await? else {
            // Expired rows linger until overwritten; look again without the
            // expiry filter to report the right error code.
            return match self.store.find_by_device_code_any(device_code, cancel).await? {
                Some(_) => Err(DeviceFlowError::ExpiredToken),
                None => Err(DeviceFlowError::AccessDenied),
            };
        };

        match code.authorized {
            Activation::Authorized(_) => self.redeem(code, cancel).await,
            Activation::Pending => self.enforce_cadence(code, cancel).await,
        }
    }

    /// Redeem an authorized row exactly once: remove-and-return is atomic,
    /// so a concurrent or replayed poll loses the row and observes denial.
    async fn redeem(
        &self,
        code: DeviceCode,
        cancel: &CancellationToken,
    ) -> Result<DeviceGrant, DeviceFlowError> {
        let Some(consumed) = self.store.consume(&code.id, cancel).await? else {
            return Err(DeviceFlowError::AccessDenied);
        };
        let Some(subject) = consumed.subject else {
            return Err(DeviceFlowError::AccessDenied);
        };
        tracing::info!(id = %consumed.id, "device code redeemed");
        Ok(DeviceGrant {
            subject,
            application: consumed.application,
            scopes: consumed.scopes,
        })
    }

    /// Enforce the minimum polling interval on a pending row.
    ///
    /// The first poll records the timestamp. Later polls inside the
    /// interval (with 5% headroom for client-side jitter) get slow_down and
    /// leave the timestamp alone; on or past the boundary the timestamp is
    /// refreshed and the answer stays authorization_pending.
    async fn enforce_cadence(
        &self,
        mut code: DeviceCode,
        cancel: &CancellationToken,
    ) -> Result<DeviceGrant, DeviceFlowError> {
        let now = Utc::now();
        if let Some(last) = code.last_polled_at {
            let elapsed = (now - last).to_std().unwrap_or_default();
            let floor = self.options.poll_interval.mul_f64(0.95);
            if elapsed < floor {
                tracing::debug!(id = %code.id, ?elapsed, "client polling too fast");
                return Err(DeviceFlowError::SlowDown);
            }
        }

        code.last_polled_at = Some(now);
        match self.store.update(&mut code, cancel).await {
            Ok(()) => Err(DeviceFlowError::AuthorizationPending),
            // A concurrent poll refreshed the row first; this one is by
            // definition inside the interval.
            Err(StoreError::Conflict(_)) => Err(DeviceFlowError::SlowDown),
            Err(other) => Err(other.into()),
        }
    }
}
