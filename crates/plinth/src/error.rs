use crate::db::DbError;
use plinth_schema::DefinitionError;
use thiserror::Error;

/// A per-collection migration failure.
///
/// The engine never aborts a whole run because one collection failed;
/// `migrate_all` reports these in its per-collection result map.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Configuration bug in the definition; raised before any database
    /// access.
    #[error(transparent)]
    Definition(#[from] DefinitionError),

    /// The persisted snapshot for this collection could not be decoded, so
    /// no diff can be computed. Other collections continue.
    #[error("collection '{collection}': persisted snapshot is unreadable")]
    DiffComputation {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    /// A DDL statement failed; the collection's transaction was rolled back
    /// and its previous snapshot remains authoritative. `column` is filled
    /// when the failing statement targeted a single column.
    #[error("collection '{collection}': migration failed at table '{table}'")]
    Execution {
        collection: String,
        table: String,
        column: Option<String>,
        #[source]
        source: DbError,
    },

    /// Another migration run already holds the advisory lock for this
    /// collection.
    #[error("collection '{collection}': a migration run is already in progress")]
    AlreadyRunning { collection: String },

    /// Connection acquisition or snapshot I/O outside a migration
    /// transaction.
    #[error(transparent)]
    Db(#[from] DbError),
}
