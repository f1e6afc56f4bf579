// Authorization store: one live grant per (subject, application) pair.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use granary_core::client::{KeyCondition, StoreClient};
use granary_core::error::{check_cancelled, StoreError, StoreResult};
use granary_core::options::{Throughput, WaitOptions};
use granary_core::provision::ensure_table;
use granary_core::schema::{AttributeType, SecondaryIndex, TableLayout};

use crate::entity::Authorization;

use super::{from_document, require, to_document, version_guard};

const SUBJECT_APPLICATION_INDEX: &str = "Subject-Application-index";

/// Store for recorded consent grants.
#[derive(Debug, Clone)]
pub struct AuthorizationStore {
    client: Arc<dyn StoreClient>,
    table: String,
    throughput: Throughput,
}

impl AuthorizationStore {
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
            .attribute("Subject", AttributeType::S)
            .attribute("Application", AttributeType::S)
            .index(
                SecondaryIndex::new(SUBJECT_APPLICATION_INDEX, "Subject").with_range("Application"),
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
        authorization: &Authorization,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        require(&authorization.subject, "subject")?;
        require(&authorization.application, "application")?;
        check_cancelled(cancel)?;
        self.client
            .put_item(&self.table, to_document(authorization)?, None)
            .await
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Authorization> {
        require(id, "authorization id")?;
        check_cancelled(cancel)?;
        match self.client.get_item(&self.table, id).await? {
            Some(doc) => from_document(doc),
            None => Err(StoreError::NotFound(format!("authorization '{id}'"))),
        }
    }

    /// Look up the grant a subject holds for an application, if any.
    /// Callers use this to decide between creating a new grant and merging
    /// scopes into the existing one.
    pub async fn find(
        &self,
        subject: &str,
        application: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<Authorization>> {
        require(subject, "subject")?;
        require(application, "application")?;
        check_cancelled(cancel)?;
        let matches = self
            .client
            .query(
                &self.table,
                SUBJECT_APPLICATION_INDEX,
                &[
                    KeyCondition::eq("Subject", subject),
                    KeyCondition::eq("Application", application),
                ],
                Some(1),
            )
            .await?;
        matches.into_iter().next().map(from_document).transpose()
    }

    /// Version-guarded overwrite; see
    /// [`ApplicationStore::update`](super::ApplicationStore::update).
    pub async fn update(
        &self,
        authorization: &mut Authorization,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        check_cancelled(cancel)?;
        let expected = authorization.version;
        authorization.version = expected + 1;
        let doc = to_document(authorization)?;
        match self
            .client
            .put_item(&self.table, doc, Some(version_guard(expected)))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                authorization.version = expected;
                match err {
                    StoreError::Conflict(_) => Err(StoreError::Conflict(format!(
                        "authorization '{}' was modified concurrently",
                        authorization.id
                    ))),
                    other => Err(other),
                }
            }
        }
    }

    /// Hard-delete the grant.
    pub async fn revoke(&self, id: &str, cancel: &CancellationToken) -> StoreResult<()> {
        require(id, "authorization id")?;
        check_cancelled(cancel)?;
        match self.client.delete_item(&self.table, id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("authorization '{id}'"))),
        }
    }
}
