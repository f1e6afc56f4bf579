// Idempotent, self-healing schema provisioning.
//
// Given a table layout, make the backing store match it: create the table if
// absent, add any missing secondary indexes if present, and block until the
// store reports the table active. Never deletes or narrows existing schema.
// Any non-success from the store is fatal to the caller; this runs once at
// process startup and a partially provisioned table must never be served
// against.

use crate::client::{StoreClient, TableStatus};
use crate::error::{StoreError, StoreResult};
use crate::options::WaitOptions;
use crate::schema::{SecondaryIndex, TableLayout};

/// Ensure the backing store contains a table matching `layout`.
///
/// Calling this twice in a row is a no-op the second time: an existing table
/// with all required indexes triggers neither a create nor an update.
pub async fn ensure_table(
    client: &dyn StoreClient,
    layout: &TableLayout,
    wait: &WaitOptions,
) -> StoreResult<()> {
    let tables = client.list_tables().await?;

    if !tables.iter().any(|name| name == &layout.name) {
        tracing::info!(table = %layout.name, "creating table");
        client.create_table(layout).await?;
        return wait_for_active(client, &layout.name, wait).await;
    }

    let description = client.describe_table(&layout.name).await?;
    let missing: Vec<SecondaryIndex> = layout
        .indexes
        .iter()
        .filter(|index| !description.index_names.iter().any(|name| name == &index.name))
        .cloned()
        .collect();

    if missing.is_empty() {
        tracing::debug!(table = %layout.name, "table schema up to date");
        return Ok(());
    }

    tracing::info!(
        table = %layout.name,
        indexes = ?missing.iter().map(|ix| ix.name.as_str()).collect::<Vec<_>>(),
        "adding missing indexes"
    );
    client.update_table(&layout.name, &missing).await?;
    wait_for_active(client, &layout.name, wait).await
}

/// Poll with bounded exponential backoff until the table reports active.
pub async fn wait_for_active(
    client: &dyn StoreClient,
    table: &str,
    wait: &WaitOptions,
) -> StoreResult<()> {
    let mut delay = wait.initial_delay;

    for attempt in 0..wait.max_attempts {
        let description = client.describe_table(table).await?;
        if description.status == TableStatus::Active {
            tracing::debug!(table, attempt, "table active");
            return Ok(());
        }

        tracing::debug!(table, attempt, status = ?description.status, "waiting for table");
        tokio::time::sleep(delay).await;
        delay = (delay * 2).min(wait.max_delay);
    }

    Err(StoreError::Unavailable(format!(
        "table '{table}' did not become active after {} polls",
        wait.max_attempts
    )))
}
