// Device-code store: expiry-filtered code lookups and atomic consumption.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use granary_core::client::{Condition, KeyCondition, StoreClient};
use granary_core::error::{check_cancelled, StoreError, StoreResult};
use granary_core::options::{Throughput, WaitOptions};
use granary_core::provision::ensure_table;
use granary_core::schema::{AttributeType, SecondaryIndex, TableLayout};

use crate::entity::{Activation, DeviceCode};

use super::{from_document, require, to_document, version_guard};

const DEVICE_CODE_INDEX: &str = "DeviceCode-index";
const USER_CODE_INDEX: &str = "UserCode-index";

/// Store for device-authorization code rows.
///
/// Expiry is lazy: there is no reaper, so an expired row can sit in storage
/// until consumed or overwritten, but the code lookups filter it out after
/// the indexed fetch and it behaves as absent.
#[derive(Debug, Clone)]
pub struct DeviceCodeStore {
    client: Arc<dyn StoreClient>,
    table: String,
    throughput: Throughput,
}

impl DeviceCodeStore {
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
            .attribute("DeviceCode", AttributeType::S)
            .attribute("UserCode", AttributeType::S)
            .index(SecondaryIndex::new(DEVICE_CODE_INDEX, "DeviceCode"))
            .index(SecondaryIndex::new(USER_CODE_INDEX, "UserCode"))
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

    pub async fn create(&self, code: &DeviceCode, cancel: &CancellationToken) -> StoreResult<()> {
        require(&code.application, "application")?;
        require(&code.device_code, "device code")?;
        require(&code.user_code, "user code")?;
        check_cancelled(cancel)?;
        self.client
            .put_item(&self.table, to_document(code)?, None)
            .await
    }

    pub async fn find_by_id(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<DeviceCode> {
        require(id, "device code id")?;
        check_cancelled(cancel)?;
        match self.client.get_item(&self.table, id).await? {
            Some(doc) => from_document(doc),
            None => Err(StoreError::NotFound(format!("device code '{id}'"))),
        }
    }

    /// Look up by the short user-entered code. An expired row behaves as
    /// absent even though it may still be physically present.
    pub async fn find_by_user_code(
        &self,
        user_code: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        require(user_code, "user code")?;
        self.find_live(USER_CODE_INDEX, KeyCondition::eq("UserCode", user_code), cancel)
            .await
    }

    /// Look up by the unguessable polling code, with the same expiry filter.
    pub async fn find_by_device_code(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        require(device_code, "device code")?;
        self.find_live(
            DEVICE_CODE_INDEX,
            KeyCondition::eq("DeviceCode", device_code),
            cancel,
        )
        .await
    }

    /// Unfiltered lookup by polling code. The engine uses this to tell an
    /// expired code apart from a denied or consumed one.
    pub(crate) async fn find_by_device_code_any(
        &self,
        device_code: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        require(device_code, "device code")?;
        check_cancelled(cancel)?;
        let matches = self
            .client
            .query(
                &self.table,
                DEVICE_CODE_INDEX,
                &[KeyCondition::eq("DeviceCode", device_code)],
                Some(1),
            )
            .await?;
        matches.into_iter().next().map(from_document).transpose()
    }

    async fn find_live(
        &self,
        index: &str,
        condition: KeyCondition,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        check_cancelled(cancel)?;
        let matches = self
            .client
            .query(&self.table, index, &[condition], Some(1))
            .await?;
        let now = Utc::now();
        match matches.into_iter().next() {
            None => Ok(None),
            Some(doc) => {
                let code: DeviceCode = from_document(doc)?;
                if code.is_expired(now) {
                    Ok(None)
                } else {
                    Ok(Some(code))
                }
            }
        }
    }

    /// Record the operator's acceptance. The write is guarded on the
    /// stored row still being pending, not on its version: routine polls
    /// bump the version while the user is typing the code, and an accept
    /// must only lose to another accept. Of two racing accepts exactly one
    /// lands; the loser gets [`StoreError::Conflict`].
    pub async fn authorize(
        &self,
        code: &mut DeviceCode,
        subject: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        require(subject, "subject")?;
        check_cancelled(cancel)?;
        code.authorize(subject, Utc::now())?;
        code.version += 1;
        let doc = to_document(code)?;
        let guard = Condition::ValueEquals {
            attribute: "AuthorizedOn".into(),
            value: Activation::NOT_AUTHORIZED.into(),
        };
        match self.client.put_item(&self.table, doc, Some(guard)).await {
            Ok(()) => Ok(()),
            Err(err) => {
                code.version -= 1;
                code.authorized = Activation::Pending;
                code.subject = None;
                match err {
                    StoreError::Conflict(_) => Err(StoreError::Conflict(format!(
                        "device code '{}' is already authorized",
                        code.id
                    ))),
                    other => Err(other),
                }
            }
        }
    }

    /// Version-guarded overwrite; see
    /// [`ApplicationStore::update`](super::ApplicationStore::update).
    pub async fn update(
        &self,
        code: &mut DeviceCode,
        cancel: &CancellationToken,
    ) -> StoreResult<()> {
        check_cancelled(cancel)?;
        let expected = code.version;
        code.version = expected + 1;
        let doc = to_document(code)?;
        match self
            .client
            .put_item(&self.table, doc, Some(version_guard(expected)))
            .await
        {
            Ok(()) => Ok(()),
            Err(err) => {
                code.version = expected;
                match err {
                    StoreError::Conflict(_) => Err(StoreError::Conflict(format!(
                        "device code '{}' was modified concurrently",
                        code.id
                    ))),
                    other => Err(other),
                }
            }
        }
    }

    /// Hard-delete the row; the polling client then observes denial.
    pub async fn revoke(&self, id: &str, cancel: &CancellationToken) -> StoreResult<()> {
        require(id, "device code id")?;
        check_cancelled(cancel)?;
        match self.client.delete_item(&self.table, id).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("device code '{id}'"))),
        }
    }

    /// Atomically remove the row and hand back its final state, or `None`
    /// if someone else consumed it first. This is what makes redemption
    /// single-use: the store's remove-and-return yields the row to exactly
    /// one caller.
    pub async fn consume(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> StoreResult<Option<DeviceCode>> {
        require(id, "device code id")?;
        check_cancelled(cancel)?;
        self.client
            .delete_item(&self.table, id)
            .await?
            .map(from_document)
            .transpose()
    }
}
