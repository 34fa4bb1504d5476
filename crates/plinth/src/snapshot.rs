//! Schema snapshot store.
//!
//! One row per distinct migrated schema, unique on `(collection_key,
//! checksum)`, with "latest" resolved by an explicit max-`created_at` query.
//! Re-activating an earlier schema (a revert migration) refreshes that row's
//! `created_at` instead of appending a duplicate, so the reverted schema
//! becomes the effective latest and an unchanged re-run stays a no-op.
//! The store carries an in-process cache keyed by collection; a reader may
//! briefly observe a stale entry after a concurrent write, which is fine
//! because the database row is always authoritative and a cache miss
//! re-reads it.

use crate::db::{DbConn, DbError, SNAPSHOT_TABLE, SnapshotRow};
use crate::error::MigrationError;
use chrono::{DateTime, Utc};
use plinth_schema::CollectionSchema;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// A decoded snapshot: the schema a collection was last migrated to.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub collection_key: String,
    pub schema: CollectionSchema,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// Store for persisted schema snapshots, with a process-wide cache.
///
/// Construct one per process and share it by reference; other components
/// never touch the cache directly.
#[derive(Default)]
pub struct SnapshotStore {
    cache: Mutex<HashMap<String, Arc<SchemaSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the snapshot table if it does not exist yet.
    pub async fn ensure_table<C: DbConn>(
        &self,
        conn: &C,
        caps: &crate::capabilities::DbCapabilities,
    ) -> Result<(), DbError> {
        let id_def = if caps.auto_increment_primary_key {
            "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY"
        } else {
            "BIGINT PRIMARY KEY"
        };
        let default_now = caps.timestamp_default_expression;
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {SNAPSHOT_TABLE} (
    id {id_def},
    collection_key TEXT NOT NULL,
    schema TEXT NOT NULL,
    checksum TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT {default_now},
    UNIQUE (collection_key, checksum)
);"
        );
        conn.execute(&sql).await?;
        Ok(())
    }

    /// Most recent snapshot for a collection, or `None` if it has never been
    /// migrated. Served from cache when possible.
    pub async fn get_latest<C: DbConn>(
        &self,
        conn: &C,
        collection_key: &str,
    ) -> Result<Option<Arc<SchemaSnapshot>>, MigrationError> {
        if let Some(hit) = self.cached(collection_key) {
            return Ok(Some(hit));
        }

        let Some(row) = conn.latest_snapshot(collection_key).await? else {
            return Ok(None);
        };
        let schema: CollectionSchema =
            serde_json::from_str(&row.schema_json).map_err(|source| {
                MigrationError::DiffComputation {
                    collection: collection_key.to_string(),
                    source,
                }
            })?;
        let snapshot = Arc::new(SchemaSnapshot {
            collection_key: row.collection_key,
            schema,
            checksum: row.checksum,
            created_at: row.created_at,
        });
        self.cache
            .lock()
            .expect("snapshot cache poisoned")
            .insert(collection_key.to_string(), Arc::clone(&snapshot));
        Ok(Some(snapshot))
    }

    /// Write a snapshot row on the caller's connection. Runs inside the
    /// caller's migration transaction, so the row becomes visible exactly
    /// when the collection's DDL commits. An identical `(collection_key,
    /// checksum)` row gets its `created_at` refreshed, making it the
    /// effective latest again after a revert.
    ///
    /// The cache is *not* touched here; call [`SnapshotStore::note_committed`]
    /// after the transaction commits.
    pub async fn persist<C: DbConn>(
        &self,
        conn: &C,
        snapshot: &SchemaSnapshot,
    ) -> Result<(), DbError> {
        let row = SnapshotRow {
            collection_key: snapshot.collection_key.clone(),
            schema_json: serde_json::to_string(&snapshot.schema)
                .map_err(|e| DbError::Backend(e.to_string()))?,
            checksum: snapshot.checksum.clone(),
            created_at: snapshot.created_at,
        };
        conn.insert_snapshot(&row).await
    }

    /// Record a committed snapshot in the cache.
    pub fn note_committed(&self, snapshot: Arc<SchemaSnapshot>) {
        self.cache
            .lock()
            .expect("snapshot cache poisoned")
            .insert(snapshot.collection_key.clone(), snapshot);
    }

    fn cached(&self, collection_key: &str) -> Option<Arc<SchemaSnapshot>> {
        self.cache
            .lock()
            .expect("snapshot cache poisoned")
            .get(collection_key)
            .cloned()
    }
}
