//! Migration planning.
//!
//! Turns a [`SchemaDiff`] into an ordered [`MigrationPlan`]. Ordering is a
//! total order so two runs over the same diff always produce the same plan:
//! table priority descending (parents before children), then migration kind
//! (creates, then modifies, then removes), then table name. Destructive
//! steps that the schema marks non-auto-removable are filtered out here and
//! surfaced as warnings instead of statements.

use crate::diff::{ColumnModification, SchemaDiff};
use plinth_schema::{
    CollectionSchema, CollectionSchemaColumn, CollectionSchemaTable, TableType,
};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// What a table migration does. The discriminant order is the execution
/// order within one priority band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MigrationKind {
    Create,
    Modify,
    Remove,
}

/// A column-level operation inside a `Modify` migration.
#[derive(Debug, Clone)]
pub enum ColumnOperation {
    Add(CollectionSchemaColumn),
    Modify(ColumnModification),
    Drop(CollectionSchemaColumn),
}

/// One planned migration step against one table.
#[derive(Debug, Clone)]
pub struct TableMigration {
    pub table_name: String,
    pub table_type: TableType,
    pub kind: MigrationKind,
    /// Full table definition for `Create`; `None` otherwise.
    pub table: Option<CollectionSchemaTable>,
    /// Column operations for `Modify`; empty otherwise.
    pub column_ops: Vec<ColumnOperation>,
}

/// Why a destructive step was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningReason {
    /// The table or column is gone from the definition but marked
    /// non-auto-removable, so the planner skipped dropping it.
    RemovalSkipped,
    /// The column changed in a way that cannot be altered in place; it will
    /// be dropped and recreated, losing its data.
    ColumnRecreated,
}

/// A destructive (or skipped-destructive) operation the caller should show
/// to a human before or after applying the plan.
#[derive(Debug, Clone)]
pub struct DestructiveOperationWarning {
    pub collection: String,
    pub table: String,
    pub column: Option<String>,
    pub reason: WarningReason,
}

/// An ordered, deterministic migration plan for one collection.
#[derive(Debug, Clone, Default)]
pub struct MigrationPlan {
    pub collection: String,
    pub migrations: Vec<TableMigration>,
    pub warnings: Vec<DestructiveOperationWarning>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

/// Build the plan for one collection from its diff. `declared` is the schema
/// the diff was computed against; modify steps look their table type up in it.
pub fn build_plan(
    collection: &str,
    declared: &CollectionSchema,
    diff: &SchemaDiff,
) -> MigrationPlan {
    let mut plan = MigrationPlan {
        collection: collection.to_string(),
        ..Default::default()
    };

    for table in &diff.missing_tables {
        plan.migrations.push(TableMigration {
            table_name: table.name.clone(),
            table_type: table.table_type,
            kind: MigrationKind::Create,
            table: Some(table.clone()),
            column_ops: Vec::new(),
        });
    }

    // Column-level changes collapse into one Modify step per table.
    let mut modify_ops: BTreeMap<String, Vec<ColumnOperation>> = BTreeMap::new();

    for (table, columns) in &diff.missing_columns {
        for column in columns {
            modify_ops
                .entry(table.clone())
                .or_default()
                .push(ColumnOperation::Add(column.clone()));
        }
    }

    for modification in &diff.modified_columns {
        if !modification.is_alterable_in_place() {
            plan.warnings.push(DestructiveOperationWarning {
                collection: collection.to_string(),
                table: modification.table.clone(),
                column: Some(modification.to.name.clone()),
                reason: WarningReason::ColumnRecreated,
            });
        }
        modify_ops
            .entry(modification.table.clone())
            .or_default()
            .push(ColumnOperation::Modify(modification.clone()));
    }

    for (table, columns) in &diff.extra_columns {
        for column in columns {
            if !column.can_auto_remove {
                plan.warnings.push(DestructiveOperationWarning {
                    collection: collection.to_string(),
                    table: table.clone(),
                    column: Some(column.name.clone()),
                    reason: WarningReason::RemovalSkipped,
                });
                continue;
            }
            modify_ops
                .entry(table.clone())
                .or_default()
                .push(ColumnOperation::Drop(column.clone()));
        }
    }

    for (table_name, column_ops) in modify_ops {
        // A table with column changes is still declared; only whole-table
        // removals reference tables absent from `declared`.
        let table_type = declared
            .table(&table_name)
            .map(|t| t.table_type)
            .unwrap_or(TableType::DocumentFields);
        plan.migrations.push(TableMigration {
            table_name,
            table_type,
            kind: MigrationKind::Modify,
            table: None,
            column_ops,
        });
    }

    for table in &diff.extra_tables {
        if !table.can_auto_remove {
            plan.warnings.push(DestructiveOperationWarning {
                collection: collection.to_string(),
                table: table.name.clone(),
                column: None,
                reason: WarningReason::RemovalSkipped,
            });
            continue;
        }
        plan.migrations.push(TableMigration {
            table_name: table.name.clone(),
            table_type: table.table_type,
            kind: MigrationKind::Remove,
            table: None,
            column_ops: Vec::new(),
        });
    }

    plan.migrations.sort_by(compare_migrations);
    plan
}

fn compare_migrations(a: &TableMigration, b: &TableMigration) -> Ordering {
    // Priority puts parents before children on create; drops rely on CASCADE
    // so the same order is safe for removes too.
    b.table_type
        .priority()
        .cmp(&a.table_type.priority())
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.table_name.cmp(&b.table_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_schemas;
    use plinth_schema::{CollectionDefinition, CollectionMode, FieldNode, FieldType, infer_schema};

    fn schema(fields: Vec<FieldNode>) -> plinth_schema::CollectionSchema {
        let mut def = CollectionDefinition::new("blog", CollectionMode::Multiple);
        for f in fields {
            def = def.field(f);
        }
        infer_schema(&def).unwrap()
    }

    #[test]
    fn fresh_plan_orders_parents_before_children() {
        let declared = schema(vec![
            FieldNode::leaf("title", FieldType::Text),
            FieldNode::repeater("items", vec![FieldNode::leaf("label", FieldType::Text)]),
        ]);
        let plan = build_plan("blog", &declared, &diff_schemas(None, &declared));
        let names: Vec<&str> = plan.migrations.iter().map(|m| m.table_name.as_str()).collect();
        let doc = names.iter().position(|n| *n == "doc__blog").unwrap();
        let fields = names
            .iter()
            .position(|n| *n == "doc__blog__fields")
            .unwrap();
        let items = names
            .iter()
            .position(|n| *n == "doc__blog__fields__items")
            .unwrap();
        assert!(doc < fields);
        assert!(fields < items);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn plan_is_deterministic() {
        let declared = schema(vec![
            FieldNode::leaf("b", FieldType::Text),
            FieldNode::leaf("a", FieldType::Text),
            FieldNode::repeater("r", vec![FieldNode::leaf("x", FieldType::Text)]),
        ]);
        let a = build_plan("blog", &declared, &diff_schemas(None, &declared));
        let b = build_plan("blog", &declared, &diff_schemas(None, &declared));
        let names_a: Vec<_> = a.migrations.iter().map(|m| m.table_name.clone()).collect();
        let names_b: Vec<_> = b.migrations.iter().map(|m| m.table_name.clone()).collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn added_field_plans_single_modify() {
        let old = schema(vec![FieldNode::leaf("title", FieldType::Text)]);
        let new = schema(vec![
            FieldNode::leaf("title", FieldType::Text),
            FieldNode::leaf("excerpt", FieldType::Textarea),
        ]);
        let plan = build_plan("blog", &new, &diff_schemas(Some(&old), &new));
        assert_eq!(plan.migrations.len(), 1);
        let m = &plan.migrations[0];
        assert_eq!(m.kind, MigrationKind::Modify);
        assert_eq!(m.table_name, "doc__blog__fields");
        assert!(matches!(m.column_ops.as_slice(), [ColumnOperation::Add(c)] if c.name == "excerpt"));
    }

    #[test]
    fn type_change_warns_about_recreation() {
        let old = schema(vec![FieldNode::leaf("count", FieldType::Number)]);
        let new = schema(vec![FieldNode::leaf("count", FieldType::Float)]);
        let plan = build_plan("blog", &new, &diff_schemas(Some(&old), &new));
        assert_eq!(plan.warnings.len(), 1);
        let w = &plan.warnings[0];
        assert_eq!(w.reason, WarningReason::ColumnRecreated);
        assert_eq!(w.column.as_deref(), Some("count"));
    }

    #[test]
    fn protected_column_removal_is_skipped_with_warning() {
        let old = schema(vec![FieldNode::leaf("title", FieldType::Text)]);
        let mut new = old.clone();
        // Simulate a snapshot where the column is protected.
        let mut old_protected = old.clone();
        let table = old_protected.tables.get_mut("doc__blog__fields").unwrap();
        let col = table
            .columns
            .iter_mut()
            .find(|c| c.name == "title")
            .unwrap();
        col.can_auto_remove = false;
        let declared_table = new.tables.get_mut("doc__blog__fields").unwrap();
        declared_table.columns.retain(|c| c.name != "title");

        let plan = build_plan("blog", &new, &diff_schemas(Some(&old_protected), &new));
        assert!(plan.migrations.is_empty());
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].reason, WarningReason::RemovalSkipped);
    }

    #[test]
    fn removed_repeater_plans_table_remove() {
        let old = schema(vec![
            FieldNode::leaf("title", FieldType::Text),
            FieldNode::repeater("items", vec![FieldNode::leaf("label", FieldType::Text)]),
        ]);
        let new = schema(vec![FieldNode::leaf("title", FieldType::Text)]);
        let plan = build_plan("blog", &new, &diff_schemas(Some(&old), &new));
        assert_eq!(plan.migrations.len(), 1);
        assert_eq!(plan.migrations[0].kind, MigrationKind::Remove);
        assert_eq!(plan.migrations[0].table_name, "doc__blog__fields__items");
    }
}
