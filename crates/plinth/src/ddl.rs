//! DDL rendering.
//!
//! Pure functions from schema types plus a [`DbCapabilities`] descriptor to
//! SQL strings. Nothing in here talks to a database, which keeps every SQL
//! shape testable without one.

use crate::capabilities::DbCapabilities;
use crate::diff::ColumnModification;
use plinth_schema::{
    ColumnDefault, CollectionSchemaColumn, CollectionSchemaTable, SqlType, quote_ident,
};

pub fn sql_type_keyword(sql_type: SqlType) -> &'static str {
    match sql_type {
        SqlType::Text => "TEXT",
        SqlType::Integer => "INTEGER",
        SqlType::BigInt => "BIGINT",
        SqlType::Real => "REAL",
        SqlType::Boolean => "BOOLEAN",
        SqlType::Timestamp => "TIMESTAMPTZ",
        SqlType::Json => "JSONB",
    }
}

pub fn default_expr(default: &ColumnDefault, caps: &DbCapabilities) -> String {
    match default {
        ColumnDefault::Text(value) => format!("'{}'", value.replace('\'', "''")),
        ColumnDefault::Integer(value) => value.to_string(),
        ColumnDefault::Boolean(true) => caps.boolean_literal.true_value.to_string(),
        ColumnDefault::Boolean(false) => caps.boolean_literal.false_value.to_string(),
        ColumnDefault::Now => caps.timestamp_default_expression.to_string(),
    }
}

fn column_def(column: &CollectionSchemaColumn, caps: &DbCapabilities) -> String {
    let mut def = format!(
        "{} {}",
        quote_ident(&column.name),
        sql_type_keyword(column.sql_type)
    );
    if column.primary {
        if caps.auto_increment_primary_key {
            def.push_str(" GENERATED BY DEFAULT AS IDENTITY");
        }
        def.push_str(" PRIMARY KEY");
    } else if !column.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        def.push_str(&format!(" DEFAULT {}", default_expr(default, caps)));
    }
    if column.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(fk) = &column.foreign_key {
        def.push_str(&format!(
            " REFERENCES {} ({})",
            quote_ident(&fk.table),
            quote_ident(&fk.column)
        ));
        if fk.on_delete_cascade {
            def.push_str(" ON DELETE CASCADE");
        }
    }
    def
}

pub fn create_table_sql(table: &CollectionSchemaTable, caps: &DbCapabilities) -> String {
    let mut sql = format!("CREATE TABLE {} (\n", quote_ident(&table.name));
    let defs: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("    {}", column_def(c, caps)))
        .collect();
    sql.push_str(&defs.join(",\n"));
    sql.push_str("\n);");
    sql
}

pub fn add_column_sql(
    table: &str,
    column: &CollectionSchemaColumn,
    caps: &DbCapabilities,
) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {};",
        quote_ident(table),
        column_def(column, caps)
    )
}

pub fn drop_column_sql(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {} DROP COLUMN {};",
        quote_ident(table),
        quote_ident(column)
    )
}

pub fn drop_table_sql(table: &str) -> String {
    format!("DROP TABLE {} CASCADE;", quote_ident(table))
}

/// Statements for a column whose nullability or default changed, on a
/// dialect that supports in-place alteration.
pub fn alter_column_sql(modification: &ColumnModification, caps: &DbCapabilities) -> Vec<String> {
    let table = quote_ident(&modification.table);
    let column = quote_ident(&modification.to.name);
    let mut statements = Vec::new();

    if modification.from.nullable != modification.to.nullable {
        let verb = if modification.to.nullable {
            "DROP NOT NULL"
        } else {
            "SET NOT NULL"
        };
        statements.push(format!("ALTER TABLE {table} ALTER COLUMN {column} {verb};"));
    }

    if modification.from.default != modification.to.default {
        match &modification.to.default {
            Some(default) => statements.push(format!(
                "ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {};",
                default_expr(default, caps)
            )),
            None => statements.push(format!(
                "ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT;"
            )),
        }
    }

    statements
}

/// Whether a modification must go through drop-and-recreate on this dialect.
pub fn needs_recreate(modification: &ColumnModification, caps: &DbCapabilities) -> bool {
    !modification.is_alterable_in_place() || !caps.alter_column
}

#[cfg(test)]
mod tests {
    use super::*;
    use plinth_schema::{ColumnDefault, ForeignKeyRef, SqlType};

    fn caps() -> DbCapabilities {
        DbCapabilities::postgres()
    }

    #[test]
    fn add_column_renders_type_keyword() {
        let column = CollectionSchemaColumn::field("excerpt", SqlType::Text);
        insta::assert_snapshot!(
            add_column_sql("doc__blog__fields", &column, &caps()),
            @r#"ALTER TABLE "doc__blog__fields" ADD COLUMN "excerpt" TEXT;"#
        );
    }

    #[test]
    fn drop_table_cascades() {
        insta::assert_snapshot!(
            drop_table_sql("doc__blog__fields__items"),
            @r#"DROP TABLE "doc__blog__fields__items" CASCADE;"#
        );
    }

    #[test]
    fn create_table_renders_constraints_inline() {
        let table = CollectionSchemaTable {
            name: "ver__blog".to_string(),
            table_type: plinth_schema::TableType::Versions,
            key: plinth_schema::TableKey {
                collection: "blog".to_string(),
                brick: None,
                repeater_path: Vec::new(),
            },
            columns: vec![
                CollectionSchemaColumn::core("id", SqlType::BigInt).primary_key(),
                CollectionSchemaColumn::core("document_id", SqlType::BigInt)
                    .references("doc__blog", "id"),
                CollectionSchemaColumn::core("created_at", SqlType::Timestamp)
                    .default_value(ColumnDefault::Now),
            ],
            can_auto_remove: true,
        };
        let expected = "CREATE TABLE \"ver__blog\" (\n    \
            \"id\" BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY,\n    \
            \"document_id\" BIGINT NOT NULL REFERENCES \"doc__blog\" (\"id\") ON DELETE CASCADE,\n    \
            \"created_at\" TIMESTAMPTZ NOT NULL DEFAULT now()\n);";
        assert_eq!(create_table_sql(&table, &caps()), expected);
    }

    #[test]
    fn identity_clause_respects_capability() {
        let column = CollectionSchemaColumn::core("id", SqlType::BigInt).primary_key();
        let sql = add_column_sql("t", &column, &DbCapabilities::sqlite());
        assert_eq!(sql, "ALTER TABLE \"t\" ADD COLUMN \"id\" BIGINT PRIMARY KEY;");
    }

    #[test]
    fn boolean_default_uses_dialect_literal() {
        let column = CollectionSchemaColumn::field("featured", SqlType::Boolean)
            .default_value(ColumnDefault::Boolean(true));
        let pg = add_column_sql("t", &column, &DbCapabilities::postgres());
        let lite = add_column_sql("t", &column, &DbCapabilities::sqlite());
        assert!(pg.ends_with("DEFAULT true;"));
        assert!(lite.ends_with("DEFAULT 1;"));
    }

    #[test]
    fn alter_in_place_emits_nullability_and_default() {
        let from = CollectionSchemaColumn::field("excerpt", SqlType::Text);
        let mut to = from.clone();
        to.nullable = false;
        to.default = Some(ColumnDefault::Text("".to_string()));
        let m = ColumnModification {
            table: "doc__blog__fields".to_string(),
            from,
            to,
        };
        assert!(!needs_recreate(&m, &caps()));
        let statements = alter_column_sql(&m, &caps());
        assert_eq!(statements.len(), 2);
        assert!(statements[0].contains("SET NOT NULL"));
        assert!(statements[1].contains("SET DEFAULT ''"));
    }

    #[test]
    fn fk_change_needs_recreate() {
        let from = CollectionSchemaColumn::field("ref", SqlType::BigInt);
        let mut to = from.clone();
        to.foreign_key = Some(ForeignKeyRef {
            table: "doc__blog".to_string(),
            column: "id".to_string(),
            on_delete_cascade: true,
        });
        let m = ColumnModification {
            table: "doc__blog__fields".to_string(),
            from,
            to,
        };
        assert!(needs_recreate(&m, &caps()));
    }

    #[test]
    fn sqlite_forces_recreate_even_for_nullability() {
        let from = CollectionSchemaColumn::field("excerpt", SqlType::Text);
        let mut to = from.clone();
        to.nullable = false;
        let m = ColumnModification {
            table: "doc__blog__fields".to_string(),
            from,
            to,
        };
        assert!(needs_recreate(&m, &DbCapabilities::sqlite()));
    }
}
