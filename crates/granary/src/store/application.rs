// Application store: soft delete, live-client lookup by ClientId.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use granary_core::client::{KeyCondition, StoreClient};
use granary_core::error::{check_cancelled, StoreError, StoreResult};
use granary_core::options::{Throughput, WaitOptions};
use granary_core::provision::ensure_table;
use granary_core::schema::{AttributeType, SecondaryIndex, TableLayout};

use crate::entity::{Application, Deletion};

use super::{from_document, require, to_document, version_guard};

const CLIENT_ID_INDEX: &str = "ClientId-DeletedOn-index";
const LOGOUT_REDIRECT_URI_INDEX: &str = "LogoutRedirectUri-DeletedOn-index";

/// Store for registered OAuth2 client applications.
///
/// `ClientId` uniqueness is scoped to live rows: both lookup indexes range
/// on `DeletedOn` and every query keys on the not-deleted sentinel, so a
/// soft-deleted application can never shadow a live one.
#[derive(Debug, Clone)]
pub struct ApplicationStore {
    client: Arc<dyn StoreClient>,
    table: String,
    throughput: Throughput,
}

impl ApplicationStore {
    pub fn new(client: Arc<dyn StoreClient>, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            throughput: Throughput::default(),
        }
    }

    pub fn with_throughput(mut self, throughput: Throughput) -> Self {
        self.throughput = throughput;
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn layout(&self) -> TableLayout {
        TableLayout::new(&self.table)
            .attribute("ClientId", AttributeType::S)
            .attribute("LogoutRedirectUri", AttributeType::S)
            .attribute("DeletedOn", AttributeType::S)
            .index(SecondaryIndex::new(CLIENT_ID_INDEX, "ClientId").with_range("DeletedOn"))
            .index(
                SecondaryIndex::new(LOGOUT_REDIRECT_URI_INDEX, "LogoutRedirectUri")
                    .with_range("DeletedOn"),
            )
            .with_throughput(self.throughput)
    }

    /// Provision the backing table. Idempotent.
    pub async fn initialize(
        &self,
        wait: &WaitOptions,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        check_cancelled(cancel)?;
        ensure_table(self.client.as_ref(), &self.layout(), wait).await
    }

    pub async fn create(
        &self,
        application: &Application,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        require(&application.client_id, "client id")?;
        require(&application.display_name, "display name")?;
        check_cancelled(cancel)?;
        self.client
            .put_item(&self.table, to_document(application)?, None)
            .await
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Application> {
        require(id, "application id")?;
        check_cancelled(cancel)?;
        match self.client.get_item(&self.table, id).await? {
            Some(doc) => from_document(doc),
            None => Err(StoreError::NotFound(format!("application '{id}'"))),
        }
    }

    /// Find the live application registered under `client_id`.
    ///
    /// Queries the (ClientId, DeletedOn) index keyed on the not-deleted
    /// sentinel and takes the first match; this is the enforcement point for
    /// "one live client per ClientId".
    pub async fn find_by_client_id(
        &self,
        client_id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Application> {
        require(client_id, "client id")?;
        check_cancelled(cancel)?;
        let matches = self
            .client
            .query(
                &self.table,
                CLIENT_ID_INDEX,
                &[
                    KeyCondition::eq("ClientId", client_id),
                    KeyCondition::eq("DeletedOn", Deletion::NOT_DELETED),
                ],
                Some(1),
            )
            .await?;
        match matches.into_iter().next() {
            Some(doc) => from_document(doc),
            None => Err(StoreError::NotFound(format!("application with client id '{client_id}'"))),
        }
    }

    /// Find the live application registered with this post-logout redirect.
    pub async fn find_by_logout_redirect_uri(
        &self,
        uri: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Application> {
        require(uri, "logout redirect uri")?;
        check_cancelled(cancel)?;
        let matches = self
            .client
            .query(
                &self.table,
                LOGOUT_REDIRECT_URI_INDEX,
                &[
                    KeyCondition::eq("LogoutRedirectUri", uri),
                    KeyCondition::eq("DeletedOn", Deletion::NOT_DELETED),
                ],
                Some(1),
            )
            .await?;
        match matches.into_iter().next() {
            Some(doc) => from_document(doc),
            None => Err(StoreError::NotFound(format!(
                "application with logout redirect uri '{uri}'"
            ))),
        }
    }

    /// All applications, deleted ones included.
    pub async fn list(&self, cancel: &CancellationToken) -> StoreResult<Vec<Application>> {
        check_cancelled(cancel)?;
        self.client
            .scan(&self.table)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Overwrite the stored row if nobody else has updated it since the
    /// caller's read. On success the entity's version is bumped in place; on
    /// conflict the entity is left untouched and the caller must re-read.
    pub async fn update(
        &self,
        application: &mut Application,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        check_cancelled(cancel)?;
        let expected = application.version;
        application.version = expected + 1;
        let doc = to_document(application)?;
        match self
            .client
            .put_item(&self.table, doc, Some(version_guard(expected)))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                application.version = expected;
                match err {
                    StoreError::Conflict(_) => Err(StoreError::Conflict(format!(
                        "application '{}' was modified concurrently",
                        application.id
                    ))),
                    other => Err(other),
                }
            }
        }
    }

    /// Soft-delete: set the tombstone and persist it. Fails with
    /// [`StoreError::Conflict`] if the application is already deleted.
    pub async fn delete(
        &self,
        application: &mut Application,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        application.delete(Utc::now())?;
        match self.update(application, cancel).await {
            Ok(()) => Ok(()),
            Err(err) => {
                application.deleted = Deletion::Active;
                Err(err)
            }
        }
    }
}
