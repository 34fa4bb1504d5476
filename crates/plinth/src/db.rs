//! The relational persistence collaborator.
//!
//! The engine talks to the database through the [`Database`]/[`DbConn`]
//! traits: raw statement execution for DDL and transaction control, plus
//! domain-level CRUD against the snapshot table. The Postgres implementation
//! wraps a deadpool pool and logs every statement via tracing; tests supply
//! an in-memory double.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::Instrument;

/// Name of the append-only snapshot table.
pub const SNAPSHOT_TABLE: &str = "plinth_schema_snapshots";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("pool creation failed: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("{0}")]
    Backend(String),
}

/// A persisted snapshot row in wire form (schema still JSON).
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    pub collection_key: String,
    pub schema_json: String,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

/// A handle that can mint connections.
pub trait Database: Send + Sync {
    type Conn: DbConn;

    fn conn(&self) -> impl Future<Output = Result<Self::Conn, DbError>> + Send;
}

/// One database connection. A migration holds a single connection for its
/// whole transaction, so `BEGIN`/`COMMIT`/`ROLLBACK` issued through
/// [`DbConn::execute`] scope every later call on the same handle.
pub trait DbConn: Send + Sync {
    /// Execute a single statement (DDL or transaction control).
    fn execute(&self, sql: &str) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// Most recent snapshot row for a collection, by `created_at` (id as
    /// tie-break), or `None`.
    fn latest_snapshot(
        &self,
        collection_key: &str,
    ) -> impl Future<Output = Result<Option<SnapshotRow>, DbError>> + Send;

    /// Insert a snapshot row, or refresh the `created_at` of an existing
    /// row with the same `(collection_key, checksum)`. The refresh makes a
    /// re-activated earlier schema the effective latest again after a
    /// revert migration.
    fn insert_snapshot(&self, row: &SnapshotRow) -> impl Future<Output = Result<(), DbError>> + Send;
}

/// Postgres-backed [`Database`] over a deadpool pool.
#[derive(Clone)]
pub struct PgDatabase {
    pool: deadpool_postgres::Pool,
}

impl PgDatabase {
    pub fn new(pool: deadpool_postgres::Pool) -> Self {
        Self { pool }
    }

    /// Build a pool from a connection URL.
    pub fn connect(url: &str) -> Result<Self, DbError> {
        let cfg = deadpool_postgres::Config {
            url: Some(url.to_string()),
            ..Default::default()
        };
        let pool = cfg.create_pool(
            Some(deadpool_postgres::Runtime::Tokio1),
            tokio_postgres::NoTls,
        )?;
        Ok(Self { pool })
    }
}

impl Database for PgDatabase {
    type Conn = PgConn;

    async fn conn(&self) -> Result<PgConn, DbError> {
        let pooled = self.pool.get().await?;
        // Detach the client from the pool: a migration future dropped
        // mid-transaction must close the connection (aborting the open
        // transaction server-side), not hand it back for reuse where a later
        // checkout would commit the abandoned DDL. Migration connections are
        // short-lived and rare; the pool still bounds concurrency.
        let inner = deadpool_postgres::Object::take(pooled);
        Ok(PgConn { inner })
    }
}

/// A Postgres connection detached from its pool for the duration of a
/// migration; every statement runs inside a `tracing::debug_span!`.
pub struct PgConn {
    inner: deadpool_postgres::ClientWrapper,
}

impl PgConn {
    fn client(&self) -> &tokio_postgres::Client {
        use std::ops::Deref;
        self.inner.deref()
    }
}

impl DbConn for PgConn {
    async fn execute(&self, sql: &str) -> Result<u64, DbError> {
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            affected = tracing::field::Empty,
        );
        let affected = self
            .client()
            .execute(sql, &[])
            .instrument(span.clone())
            .await?;
        span.record("affected", affected);
        Ok(affected)
    }

    async fn latest_snapshot(&self, collection_key: &str) -> Result<Option<SnapshotRow>, DbError> {
        let sql = format!(
            "SELECT collection_key, schema, checksum, created_at FROM {SNAPSHOT_TABLE} \
             WHERE collection_key = $1 ORDER BY created_at DESC, id DESC LIMIT 1"
        );
        let span = tracing::debug_span!(
            "db.query",
            sql = %sql,
            rows = tracing::field::Empty,
        );
        let row = self
            .client()
            .query_opt(&sql, &[&collection_key])
            .instrument(span.clone())
            .await?;
        span.record("rows", if row.is_some() { 1u64 } else { 0u64 });
        Ok(row.map(|row| SnapshotRow {
            collection_key: row.get(0),
            schema_json: row.get(1),
            checksum: row.get(2),
            created_at: row.get(3),
        }))
    }

    async fn insert_snapshot(&self, snapshot: &SnapshotRow) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {SNAPSHOT_TABLE} (collection_key, schema, checksum, created_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (collection_key, checksum) \
             DO UPDATE SET created_at = EXCLUDED.created_at"
        );
        let span = tracing::debug_span!(
            "db.execute",
            sql = %sql,
            affected = tracing::field::Empty,
        );
        let affected = self
            .client()
            .execute(
                &sql,
                &[
                    &snapshot.collection_key,
                    &snapshot.schema_json,
                    &snapshot.checksum,
                    &snapshot.created_at,
                ],
            )
            .instrument(span.clone())
            .await?;
        span.record("affected", affected);
        Ok(())
    }
}
