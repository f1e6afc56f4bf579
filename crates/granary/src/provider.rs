//! The facade the OIDC endpoint layer talks to.
//!
//! Bundles the four entity stores and the device engine behind one object
//! constructed with a storage client and resolved options. The endpoint
//! layer supplies already-validated identifiers; nothing here parses or
//! renders protocol messages.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use granary_core::client::StoreClient;
use granary_core::error::StoreResult;
use granary_core::options::WaitOptions;

use crate::device::{DeviceAuthorizationEngine, DeviceFlowError, DeviceGrant, IssuedDeviceCode};
use crate::entity::{Application, Authorization, DeviceCode, Token};
use crate::options::ProviderOptions;
use crate::store::{ApplicationStore, AuthorizationStore, DeviceCodeStore, TokenStore};

/// Credential storage and device-flow entry point.
#[derive(Debug, Clone)]
pub struct Provider {
    applications: ApplicationStore,
    authorizations: AuthorizationStore,
    tokens: TokenStore,
    device: DeviceAuthorizationEngine,
    wait: WaitOptions,
}

impl Provider {
    pub fn new(client: Arc<dyn StoreClient>, options: ProviderOptions) -> Self {
        let tables = options.tables;
        let throughput = options.throughput;
        let device_store = DeviceCodeStore::new(client.clone(), tables.device_codes)
            .with_throughput(throughput);
        Self {
            applications: ApplicationStore::new(client.clone(), tables.applications)
                .with_throughput(throughput),
            authorizations: AuthorizationStore::new(client.clone(), tables.authorizations)
                .with_throughput(throughput),
            tokens: TokenStore::new(client, tables.tokens).with_throughput(throughput),
            device: DeviceAuthorizationEngine::new(device_store, options.device_flow),
            wait: options.wait,
        }
    }

    /// Provision all four backing tables. Runs once at startup; any failure
    /// here must abort startup rather than let the process serve against a
    /// partially provisioned store.
    pub async fn initialize(&self, cancel: &CancellationToken) -> StoreResult<()> {
        self.applications.initialize(&self.wait, cancel).await?;
        self.authorizations.initialize(&self.wait, cancel).await?;
        self.tokens.initialize(&self.wait, cancel).await?;
        self.device.initialize(&self.wait, cancel).await?;
        tracing::info!("credential store provisioned");
        Ok(())
    }

    // ─── Applications ───

    pub async fn create_application(
        &self,
        application: &Application,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.applications.create(application, cancel).await
    }

    pub async fn find_application(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Application> {
        self.applications.find_by_id(id, cancel).await
    }

    pub async fn find_application_by_client_id(
        &self,
        client_id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Application> {
        self.applications.find_by_client_id(client_id, cancel).await
    }

    pub async fn find_application_by_logout_redirect_uri(
        &self,
        uri: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Application> {
        self.applications.find_by_logout_redirect_uri(uri, cancel).await
    }

    pub async fn list_applications(
        &self,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Application>> {
        self.applications.list(cancel).await
    }

    pub async fn update_application(
        &self,
        application: &mut Application,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.applications.update(application, cancel).await
    }

    /// Soft-delete; the row stays behind and its `ClientId` becomes free
    /// for re-registration.
    pub async fn delete_application(
        &self,
        application: &mut Application,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.applications.delete(application, cancel).await
    }

    // ─── Authorizations ───

    /// Record consent: merge the requested scopes into the subject's
    /// existing grant for this application, or create the grant if this is
    /// the first consent. Never produces a second row for the same pair.
    pub async fn find_or_create_authorization(
        &self,
        subject: &str,
        application: &str,
        scopes: Vec<String>,
        cancel: &CancellationToken,
    ) -> StoreResult<Authorization> {
        match self.authorizations.find(subject, application, cancel).await? {
            Some(mut existing) => {
                if existing.grant_scopes(scopes) {
                    self.authorizations.update(&mut existing, cancel).await?;
                }
                Ok(existing)
            }
            None => {
                let authorization = Authorization::new(subject, application, scopes);
                self.authorizations.create(&authorization, cancel).await?;
                Ok(authorization)
            }
        }
    }

    pub async fn find_authorization(
        &self,
        subject: &str,
        application: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Authorization>> {
        self.authorizations.find(subject, application, cancel).await
    }

    pub async fn update_authorization(
        &self,
        authorization: &mut Authorization,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.authorizations.update(authorization, cancel).await
    }

    pub async fn revoke_authorization(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.authorizations.revoke(id, cancel).await
    }

    // ─── Tokens ───

    pub async fn create_token(&self, token: &Token, cancel: &CancellationToken) -> StoreResult<()> {
        self.tokens.create(token, cancel).await
    }

    pub async fn update_token(
        &self,
        token: &mut Token,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        self.tokens.update(token, cancel).await
    }

    pub async fn revoke_token(&self, id: &str, cancel: &CancellationToken) -> StoreResult<()> {
        self.tokens.revoke(id, cancel).await
    }

    pub async fn find_tokens_by_subject(
        &self,
        subject: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Token>> {
        self.tokens.find_by_subject(subject, cancel).await
    }

    pub async fn find_tokens_by_application(
        &self,
        application: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Token>> {
        self.tokens.find_by_application(application, cancel).await
    }

    pub async fn find_tokens_by_authorization(
        &self,
        authorization: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Token>> {
        self.tokens.find_by_authorization(authorization, cancel).await
    }

    // ─── Device flow ───

    pub async fn issue_device_code(
        &self,
        application: &str,
        scopes: Vec<String>,
        cancel: &CancellationToken,
    ) -> StoreResult<IssuedDeviceCode> {
        self.device.issue(application, scopes, cancel).await
    }

    pub async fn find_device_code_by_user_code(
        &self,
        user_code: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        self.device.find_by_user_code(user_code, cancel).await
    }

    pub async fn find_device_code_by_device_code(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        self.device.find_by_device_code(device_code, cancel).await
    }

    pub async fn authorize_device_code(
        &self,
        code: &mut DeviceCode,
        subject: &str,
        cancel: &CancellationToken,
    ) -> Result<(), DeviceFlowError> {
        self.device.authorize(code, subject, cancel).await
    }

    pub async fn deny_device_code(&self, id: &str, cancel: &CancellationToken) -> StoreResult<()> {
        self.device.deny(id, cancel).await
    }

    pub async fn poll_device_code(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> Result<DeviceGrant, DeviceFlowError> {
        self.device.poll(device_code, cancel).await
    }

    /// Direct access to the engine, for callers that need the configured
    /// interval or lifetime.
    pub fn device(&self) -> &DeviceAuthorizationEngine {
        &self.device
    }
}
