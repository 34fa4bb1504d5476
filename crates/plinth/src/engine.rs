//! The migration engine.
//!
//! One [`MigrationEngine`] per process. `migrate` takes a collection
//! definition all the way through inference, diffing, planning, and
//! transactional execution; `plan` stops before executing; `safe_schema`
//! answers the runtime guard question without touching DDL at all.

use crate::capabilities::DbCapabilities;
use crate::db::Database;
use crate::diff::diff_schemas;
use crate::error::MigrationError;
use crate::execute::{apply_plan, render_plan};
use crate::guard::safe_schema;
use crate::plan::{DestructiveOperationWarning, MigrationPlan, build_plan};
use crate::snapshot::{SchemaSnapshot, SnapshotStore};
use chrono::Utc;
use plinth_schema::{CollectionDefinition, CollectionSchema, infer_schema};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// What one `migrate` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStatus {
    /// DDL was executed and a new snapshot committed.
    Applied,
    /// The declared schema already matched the latest snapshot.
    Unchanged,
}

/// Outcome of migrating one collection.
#[derive(Debug, Clone)]
pub struct CollectionReport {
    pub collection: String,
    pub checksum: String,
    pub status: MigrationStatus,
    pub statements: usize,
    pub warnings: Vec<DestructiveOperationWarning>,
}

/// Per-collection in-process locks. Two concurrent migrations of the same
/// collection are a caller bug; the second one fails fast instead of
/// deadlocking or interleaving DDL.
#[derive(Default)]
struct CollectionLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl CollectionLocks {
    fn acquire(&self, collection: &str) -> Option<CollectionLockGuard> {
        let mut held = self.held.lock().expect("collection lock set poisoned");
        if !held.insert(collection.to_string()) {
            return None;
        }
        Some(CollectionLockGuard {
            collection: collection.to_string(),
            held: Arc::clone(&self.held),
        })
    }
}

struct CollectionLockGuard {
    collection: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl Drop for CollectionLockGuard {
    fn drop(&mut self) {
        self.held
            .lock()
            .expect("collection lock set poisoned")
            .remove(&self.collection);
    }
}

pub struct MigrationEngine<D: Database> {
    db: D,
    caps: DbCapabilities,
    store: SnapshotStore,
    locks: CollectionLocks,
}

impl<D: Database> MigrationEngine<D> {
    pub fn new(db: D, caps: DbCapabilities) -> Self {
        Self {
            db,
            caps,
            store: SnapshotStore::new(),
            locks: CollectionLocks::default(),
        }
    }

    pub fn capabilities(&self) -> &DbCapabilities {
        &self.caps
    }

    /// Migrate one collection to its declared schema.
    ///
    /// A no-op (checksum match) returns `Unchanged` without opening a
    /// transaction. Otherwise all DDL plus the snapshot insert run in one
    /// transaction; on failure nothing is recorded and the error carries the
    /// failing table and column.
    pub async fn migrate(
        &self,
        definition: &CollectionDefinition,
    ) -> Result<CollectionReport, MigrationError> {
        let collection = definition.key.as_str();
        info!(%collection, "migration started");
        match self.migrate_inner(definition, collection).await {
            Ok(report) => Ok(report),
            Err(err) => {
                error!(%collection, error = %err, "migration failed");
                Err(err)
            }
        }
    }

    async fn migrate_inner(
        &self,
        definition: &CollectionDefinition,
        collection: &str,
    ) -> Result<CollectionReport, MigrationError> {
        let _guard =
            self.locks
                .acquire(collection)
                .ok_or_else(|| MigrationError::AlreadyRunning {
                    collection: collection.to_string(),
                })?;

        let declared = infer_schema(definition)?;
        let checksum = declared.checksum();

        let conn = self.db.conn().await?;
        self.store.ensure_table(&conn, &self.caps).await?;

        let latest = self.store.get_latest(&conn, collection).await?;
        if let Some(latest) = &latest
            && latest.checksum == checksum
        {
            debug!(%collection, %checksum, "schema unchanged");
            return Ok(CollectionReport {
                collection: collection.to_string(),
                checksum,
                status: MigrationStatus::Unchanged,
                statements: 0,
                warnings: Vec::new(),
            });
        }

        let diff = diff_schemas(latest.as_deref().map(|s| &s.schema), &declared);
        let plan = build_plan(collection, &declared, &diff);
        for warning in &plan.warnings {
            warn!(
                %collection,
                table = %warning.table,
                column = warning.column.as_deref().unwrap_or(""),
                reason = ?warning.reason,
                "destructive operation"
            );
        }
        let statements = render_plan(&plan, &self.caps);

        let snapshot = Arc::new(SchemaSnapshot {
            collection_key: collection.to_string(),
            schema: declared,
            checksum: checksum.clone(),
            created_at: Utc::now(),
        });

        apply_plan(&conn, &statements, &snapshot, &self.store).await?;
        self.store.note_committed(Arc::clone(&snapshot));

        info!(
            %collection,
            %checksum,
            statements = statements.len(),
            warnings = plan.warnings.len(),
            "collection migrated"
        );

        Ok(CollectionReport {
            collection: collection.to_string(),
            checksum,
            status: MigrationStatus::Applied,
            statements: statements.len(),
            warnings: plan.warnings,
        })
    }

    /// Migrate several collections sequentially. Each collection gets its
    /// own transaction; one failure does not stop the rest, and the result
    /// map reports per-collection outcomes.
    pub async fn migrate_all(
        &self,
        definitions: &[CollectionDefinition],
    ) -> BTreeMap<String, Result<CollectionReport, MigrationError>> {
        let mut results = BTreeMap::new();
        for definition in definitions {
            let outcome = self.migrate(definition).await;
            results.insert(definition.key.clone(), outcome);
        }
        results
    }

    /// Compute the plan for a collection without executing it.
    pub async fn plan(
        &self,
        definition: &CollectionDefinition,
    ) -> Result<MigrationPlan, MigrationError> {
        let collection = definition.key.clone();
        let declared = infer_schema(definition)?;

        let conn = self.db.conn().await?;
        self.store.ensure_table(&conn, &self.caps).await?;
        let latest = self.store.get_latest(&conn, &collection).await?;

        let diff = diff_schemas(latest.as_deref().map(|s| &s.schema), &declared);
        Ok(build_plan(&collection, &declared, &diff))
    }

    /// The declared schema restricted to what the latest snapshot confirms
    /// exists. See [`crate::guard::safe_schema`].
    pub async fn safe_schema(
        &self,
        definition: &CollectionDefinition,
    ) -> Result<CollectionSchema, MigrationError> {
        let declared = infer_schema(definition)?;

        let conn = self.db.conn().await?;
        self.store.ensure_table(&conn, &self.caps).await?;
        let latest = self.store.get_latest(&conn, &definition.key).await?;

        Ok(safe_schema(latest.as_deref().map(|s| &s.schema), &declared))
    }
}
