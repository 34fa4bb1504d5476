//! Plan execution.
//!
//! Rendering and applying are split: [`render_plan`] turns a plan into a
//! flat list of statements (each tagged with the table and column it acts
//! on, for error context), and [`apply_plan`] runs that list plus the
//! snapshot insert inside one transaction on one connection. A failure rolls
//! everything back, snapshot row included, so a half-migrated collection can
//! never be recorded as migrated.

use crate::capabilities::DbCapabilities;
use crate::db::DbConn;
use crate::ddl;
use crate::error::MigrationError;
use crate::plan::{ColumnOperation, MigrationKind, MigrationPlan};
use crate::snapshot::{SchemaSnapshot, SnapshotStore};
use tracing::debug;

/// One rendered statement with its origin for error reporting.
#[derive(Debug, Clone)]
pub struct RenderedStatement {
    pub sql: String,
    pub table: String,
    pub column: Option<String>,
}

/// Render a plan into ordered SQL statements for the given dialect.
pub fn render_plan(plan: &MigrationPlan, caps: &DbCapabilities) -> Vec<RenderedStatement> {
    let mut statements = Vec::new();

    for migration in &plan.migrations {
        match migration.kind {
            MigrationKind::Create => {
                let table = migration
                    .table
                    .as_ref()
                    .expect("create migration carries its table");
                statements.push(RenderedStatement {
                    sql: ddl::create_table_sql(table, caps),
                    table: migration.table_name.clone(),
                    column: None,
                });
            }
            MigrationKind::Modify => {
                for op in &migration.column_ops {
                    render_column_op(&migration.table_name, op, caps, &mut statements);
                }
            }
            MigrationKind::Remove => statements.push(RenderedStatement {
                sql: ddl::drop_table_sql(&migration.table_name),
                table: migration.table_name.clone(),
                column: None,
            }),
        }
    }

    statements
}

fn render_column_op(
    table: &str,
    op: &ColumnOperation,
    caps: &DbCapabilities,
    out: &mut Vec<RenderedStatement>,
) {
    match op {
        ColumnOperation::Add(column) => out.push(RenderedStatement {
            sql: ddl::add_column_sql(table, column, caps),
            table: table.to_string(),
            column: Some(column.name.clone()),
        }),
        ColumnOperation::Drop(column) => out.push(RenderedStatement {
            sql: ddl::drop_column_sql(table, &column.name),
            table: table.to_string(),
            column: Some(column.name.clone()),
        }),
        ColumnOperation::Modify(modification) => {
            if ddl::needs_recreate(modification, caps) {
                out.push(RenderedStatement {
                    sql: ddl::drop_column_sql(table, &modification.to.name),
                    table: table.to_string(),
                    column: Some(modification.to.name.clone()),
                });
                out.push(RenderedStatement {
                    sql: ddl::add_column_sql(table, &modification.to, caps),
                    table: table.to_string(),
                    column: Some(modification.to.name.clone()),
                });
            } else {
                for sql in ddl::alter_column_sql(modification, caps) {
                    out.push(RenderedStatement {
                        sql,
                        table: table.to_string(),
                        column: Some(modification.to.name.clone()),
                    });
                }
            }
        }
    }
}

/// Apply rendered statements and persist the resulting snapshot, all inside
/// one transaction on `conn`. On any error the transaction is rolled back
/// (best effort) and the first failure is returned with its statement's
/// table and column attached.
pub async fn apply_plan<C: DbConn>(
    conn: &C,
    statements: &[RenderedStatement],
    snapshot: &SchemaSnapshot,
    store: &SnapshotStore,
) -> Result<(), MigrationError> {
    let collection = &snapshot.collection_key;

    conn.execute("BEGIN").await?;

    let outcome = run_statements(conn, collection, statements, snapshot, store).await;
    if let Err(err) = outcome {
        // The original error is what matters; a failed rollback on a dead
        // connection resolves itself when the connection drops.
        if let Err(rollback_err) = conn.execute("ROLLBACK").await {
            debug!(%collection, error = %rollback_err, "rollback failed");
        }
        return Err(err);
    }

    conn.execute("COMMIT").await?;
    Ok(())
}

async fn run_statements<C: DbConn>(
    conn: &C,
    collection: &str,
    statements: &[RenderedStatement],
    snapshot: &SchemaSnapshot,
    store: &SnapshotStore,
) -> Result<(), MigrationError> {
    for statement in statements {
        conn.execute(&statement.sql)
            .await
            .map_err(|source| MigrationError::Execution {
                collection: collection.to_string(),
                table: statement.table.clone(),
                column: statement.column.clone(),
                source,
            })?;
    }

    store.persist(conn, snapshot).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::diff_schemas;
    use crate::plan::build_plan;
    use plinth_schema::{
        CollectionDefinition, CollectionMode, FieldNode, FieldType, infer_schema,
    };

    #[test]
    fn fresh_blog_renders_creates_only() {
        let def = CollectionDefinition::new("blog", CollectionMode::Multiple)
            .field(FieldNode::leaf("title", FieldType::Text));
        let declared = infer_schema(&def).unwrap();
        let plan = build_plan("blog", &declared, &diff_schemas(None, &declared));
        let statements = render_plan(&plan, &DbCapabilities::postgres());
        assert_eq!(statements.len(), 2);
        assert!(statements[0].sql.starts_with("CREATE TABLE \"doc__blog\""));
        assert!(
            statements[1]
                .sql
                .starts_with("CREATE TABLE \"doc__blog__fields\"")
        );
    }

    #[test]
    fn in_place_modification_renders_alter_on_postgres() {
        let old = infer_schema(
            &CollectionDefinition::new("blog", CollectionMode::Multiple)
                .field(FieldNode::leaf("excerpt", FieldType::Text)),
        )
        .unwrap();
        let mut new = old.clone();
        let col = new
            .tables
            .get_mut("doc__blog__fields")
            .unwrap()
            .columns
            .iter_mut()
            .find(|c| c.name == "excerpt")
            .unwrap();
        col.nullable = false;

        let plan = build_plan("blog", &new, &diff_schemas(Some(&old), &new));
        let statements = render_plan(&plan, &DbCapabilities::postgres());
        assert_eq!(statements.len(), 1);
        assert!(statements[0].sql.contains("SET NOT NULL"));

        // The same change on SQLite rebuilds the column.
        let statements = render_plan(&plan, &DbCapabilities::sqlite());
        assert_eq!(statements.len(), 2);
        assert!(statements[0].sql.contains("DROP COLUMN"));
        assert!(statements[1].sql.contains("ADD COLUMN"));
    }
}
