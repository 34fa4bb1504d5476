//! Collection schema migration engine.
//!
//! Each content collection is declared as a typed field tree
//! ([`plinth_schema::CollectionDefinition`]); this crate turns that tree
//! into relational tables and keeps a live database in sync with it:
//!
//! - infer the declared schema ([`plinth_schema::infer_schema`]),
//! - load the snapshot the collection was last migrated to,
//! - diff, plan, and execute the difference in one transaction,
//! - record the new snapshot in the same transaction.
//!
//! The [`engine::MigrationEngine`] is the entry point; everything below it
//! (diff, plan, DDL rendering, guard) is pure and testable without a
//! database.

pub mod capabilities;
pub mod db;
pub mod ddl;
pub mod diff;
pub mod engine;
pub mod error;
pub mod execute;
pub mod guard;
pub mod plan;
pub mod snapshot;

pub use capabilities::{BooleanLiteral, DbCapabilities};
pub use db::{Database, DbConn, DbError, PgDatabase, SnapshotRow};
pub use diff::{ColumnModification, SchemaDiff, diff_schemas};
pub use engine::{CollectionReport, MigrationEngine, MigrationStatus};
pub use error::MigrationError;
pub use execute::{RenderedStatement, apply_plan, render_plan};
pub use guard::safe_schema;
pub use plan::{
    ColumnOperation, DestructiveOperationWarning, MigrationKind, MigrationPlan, TableMigration,
    WarningReason, build_plan,
};
pub use snapshot::{SchemaSnapshot, SnapshotStore};
