// Token store: three independent single-attribute lookup indexes.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use granary_core::client::{KeyCondition, StoreClient};
use granary_core::error::{check_cancelled, StoreError, StoreResult};
use granary_core::options::{Throughput, WaitOptions};
use granary_core::provision::ensure_table;
use granary_core::schema::{AttributeType, SecondaryIndex, TableLayout};

use crate::entity::Token;

use super::{from_document, require, to_document, version_guard};

const SUBJECT_INDEX: &str = "Subject-index";
const APPLICATION_INDEX: &str = "Application-index";
const AUTHORIZATION_INDEX: &str = "Authorization-index";

/// Store for issued token records.
///
/// The three lookups are independent, never conjunctive, so each gets its
/// own single-attribute index rather than one compound index.
#[derive(Debug, Clone)]
pub struct TokenStore {
    client: Arc<dyn StoreClient>,
    table: String,
    throughput: Throughput,
}

impl TokenStore {
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
            .attribute("Authorization", AttributeType::S)
            .index(SecondaryIndex::new(SUBJECT_INDEX, "Subject"))
            .index(SecondaryIndex::new(APPLICATION_INDEX, "Application"))
            .index(SecondaryIndex::new(AUTHORIZATION_INDEX, "Authorization"))
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

    pub async fn create(&self, token: &Token, cancel: &CancellationToken) -> StoreResult<()> {
        require(&token.subject, "subject")?;
        check_cancelled(cancel)?;
        self.client
            .put_item(&self.table, to_document(token)?, None)
            .await
    }

    pub async fn find_by_id(&self, id: &str, cancel: &CancellationToken) -> StoreResult<Token> {
        require(id, "token id")?;
        check_cancelled(cancel)?;
        match self.client.get_item(&self.table, id).await? {
            Some(doc) => from_document(doc),
            None => Err(StoreError::NotFound(format!("token '{id}'"))),
        }
    }

    pub async fn find_by_subject(
        &self,
        subject: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Token>> {
        require(subject, "subject")?;
        self.query(SUBJECT_INDEX, KeyCondition::eq("Subject", subject), cancel)
            .await
    }

    pub async fn find_by_application(
        &self,
        application: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Token>> {
        require(application, "application")?;
        self.query(
            APPLICATION_INDEX,
            KeyCondition::eq("Application", application),
            cancel,
        )
        .await
    }

    pub async fn find_by_authorization(
        &self,
        authorization: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Token>> {
        require(authorization, "authorization")?;
        self.query(
            AUTHORIZATION_INDEX,
            KeyCondition::eq("Authorization", authorization),
            cancel,
        )
        .await
    }

    async fn query(
        &self,
        index: &str,
        condition: KeyCondition,
        cancel: &CancellationToken,
    ) -> StoreResult<Vec<Token>> {
        check_cancelled(cancel)?;
        self.client
            .query(&self.table, index, &[condition], None)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Version-guarded overwrite; see
    /// [`ApplicationStore::update`](super::ApplicationStore::update).
    pub async fn update(&self, token: &mut Token, cancel: &CancellationToken) -> StoreResult<()> {
        check_cancelled(cancel)?;
        let expected = token.version;
        token.version = expected + 1;
        let doc = to_document(token)?;
        match self
            .client
            .put_item(&self.table, doc, Some(version_guard(expected)))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                token.version = expected;
                match err {
                    StoreError::Conflict(_) => Err(StoreError::Conflict(format!(
                        "token '{}' was modified concurrently",
                        token.id
                    ))),
                    other => Err(other),
                }
            }
        }
    }

    /// Hard-delete the token record.
    pub async fn revoke(&self, id: &str, cancel: &CancellationToken) -> StoreResult<()> {
        require(id, "token id")?;
        check_cancelled(cancel)?;
        match self.client.delete_item(&self.table, id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("token '{id}'"))),
        }
    }
}
