//! Diffing of a persisted collection schema against the declared one.
//!
//! The diff is purely structural: it compares the snapshot the collection
//! was last migrated to against the schema inferred from the current
//! definition, and records what must be created, altered, or removed. It
//! never touches the database.

use plinth_schema::{CollectionSchema, CollectionSchemaColumn, CollectionSchemaTable};
use std::collections::BTreeMap;

/// A column whose declared definition no longer matches the persisted one.
#[derive(Debug, Clone)]
pub struct ColumnModification {
    pub table: String,
    /// Column as it was persisted.
    pub from: CollectionSchemaColumn,
    /// Column as currently declared.
    pub to: CollectionSchemaColumn,
}

impl ColumnModification {
    /// True when only the nullability or default changed. Everything else
    /// (type, uniqueness, foreign key) requires rebuilding the column.
    pub fn is_alterable_in_place(&self) -> bool {
        self.from.sql_type == self.to.sql_type
            && self.from.unique == self.to.unique
            && self.from.foreign_key == self.to.foreign_key
            && self.from.primary == self.to.primary
    }
}

/// Difference between the persisted schema and the declared schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaDiff {
    /// Declared tables absent from the snapshot, in declaration order.
    pub missing_tables: Vec<CollectionSchemaTable>,
    /// Declared columns absent from their persisted table.
    pub missing_columns: BTreeMap<String, Vec<CollectionSchemaColumn>>,
    /// Persisted tables no longer declared.
    pub extra_tables: Vec<CollectionSchemaTable>,
    /// Persisted columns no longer declared.
    pub extra_columns: BTreeMap<String, Vec<CollectionSchemaColumn>>,
    /// Columns present on both sides but no longer equal.
    pub modified_columns: Vec<ColumnModification>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.missing_tables.is_empty()
            && self.missing_columns.is_empty()
            && self.extra_tables.is_empty()
            && self.extra_columns.is_empty()
            && self.modified_columns.is_empty()
    }
}

/// Compute the diff from `persisted` (the latest snapshot, if any) to
/// `declared` (the schema inferred from the current definition).
///
/// With no snapshot, every declared table is missing and nothing is extra,
/// which makes first migration and incremental migration the same code path.
pub fn diff_schemas(
    persisted: Option<&CollectionSchema>,
    declared: &CollectionSchema,
) -> SchemaDiff {
    let mut diff = SchemaDiff::default();

    let Some(persisted) = persisted else {
        diff.missing_tables = declared.iter_tables().cloned().collect();
        return diff;
    };

    for table in declared.iter_tables() {
        match persisted.table(&table.name) {
            None => diff.missing_tables.push(table.clone()),
            Some(old) => diff_columns(old, table, &mut diff),
        }
    }

    for table in persisted.iter_tables() {
        if declared.table(&table.name).is_none() {
            diff.extra_tables.push(table.clone());
        }
    }

    diff
}

fn diff_columns(
    persisted: &CollectionSchemaTable,
    declared: &CollectionSchemaTable,
    diff: &mut SchemaDiff,
) {
    for column in &declared.columns {
        match persisted.column(&column.name) {
            None => diff
                .missing_columns
                .entry(declared.name.clone())
                .or_default()
                .push(column.clone()),
            Some(old) if old != column => diff.modified_columns.push(ColumnModification {
                table: declared.name.clone(),
                from: old.clone(),
                to: column.clone(),
            }),
            Some(_) => {}
        }
    }

    for column in &persisted.columns {
        if declared.column(&column.name).is_none() {
            diff.extra_columns
                .entry(declared.name.clone())
                .or_default()
                .push(column.clone());
        }
    }
}
