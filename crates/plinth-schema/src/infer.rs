//! Schema inference: collection definition → relational schema.
//!
//! A depth-first walk of each field tree. Leaf fields append a column to the
//! current table; a repeater closes the current column list and opens a child
//! table whose composite key extends the parent path; tabs are layout-only
//! and contribute nothing. Core columns are injected first on every table,
//! with `source=core` and `can_auto_remove=false`.
//!
//! Fixed bricks fold into the document-fields table (columns prefixed with
//! the brick key); builder bricks get a dedicated table, one row per
//! user-added instance. Repeater rows link to the table owning their
//! enclosing scope via `parent_id`: the document table for document-level and
//! fixed-brick repeaters, the brick table for builder-brick repeaters, and
//! the parent repeater table when nested.

use crate::definition::{BrickKind, CollectionDefinition, FieldNode};
use crate::error::DefinitionError;
use crate::naming::{
    TABLE_JOIN, brick_table_name, document_fields_table_name, document_table_name,
    folded_column_name, repeater_table_name, versions_table_name,
};
use crate::schema::{
    CollectionSchema, CollectionSchemaColumn, CollectionSchemaTable, ColumnDefault, SqlType,
    TableKey, TableType,
};

/// Infer the relational schema for one collection definition.
///
/// Validates the definition first; a `DefinitionError` is a configuration
/// bug and fails fast before any inference proceeds.
pub fn infer_schema(def: &CollectionDefinition) -> Result<CollectionSchema, DefinitionError> {
    def.validate()?;

    let doc_table = document_table_name(&def.key);
    let versions_table = def
        .flags
        .use_revisions
        .then(|| versions_table_name(&def.key));
    let ctx = Inferencer {
        def,
        doc_table: &doc_table,
        versions_table: versions_table.as_deref(),
    };

    let mut schema = CollectionSchema::new(&def.key);
    schema.insert_table(ctx.document_table());
    if let Some(name) = &versions_table {
        schema.insert_table(ctx.versions_table(name));
    }

    // Document-fields scope: document-level fields plus folded fixed bricks.
    let fields_name = document_fields_table_name(&def.key);
    let mut field_columns = Vec::new();
    let mut repeaters = Vec::new();
    ctx.walk(
        &def.fields,
        &mut field_columns,
        &mut repeaters,
        Scope {
            brick: None,
            column_prefix: None,
            base: &fields_name,
            parent_table: &doc_table,
            path: &[],
        },
    );
    for brick in def.bricks.iter().filter(|b| b.kind == BrickKind::Fixed) {
        let folded_base = format!("{fields_name}{TABLE_JOIN}{}", brick.key);
        ctx.walk(
            &brick.fields,
            &mut field_columns,
            &mut repeaters,
            Scope {
                brick: Some(&brick.key),
                column_prefix: Some(&brick.key),
                base: &folded_base,
                parent_table: &doc_table,
                path: &[],
            },
        );
    }
    // The fields table only exists once something lands in it; a collection
    // holding nothing but repeaters has no scalar sidecar.
    if !field_columns.is_empty() {
        let mut columns = ctx.linked_core_columns();
        columns.extend(field_columns);
        schema.insert_table(CollectionSchemaTable {
            name: fields_name.clone(),
            table_type: TableType::DocumentFields,
            key: TableKey {
                collection: def.key.clone(),
                brick: None,
                repeater_path: Vec::new(),
            },
            columns,
            can_auto_remove: true,
        });
    }
    for table in repeaters {
        schema.insert_table(table);
    }

    for brick in def.bricks.iter().filter(|b| b.kind == BrickKind::Builder) {
        let table_name = brick_table_name(&def.key, &brick.key);
        let mut columns = ctx.linked_core_columns();
        let mut field_columns = Vec::new();
        let mut repeaters = Vec::new();
        ctx.walk(
            &brick.fields,
            &mut field_columns,
            &mut repeaters,
            Scope {
                brick: Some(&brick.key),
                column_prefix: None,
                base: &table_name,
                parent_table: &table_name,
                path: &[],
            },
        );
        columns.extend(field_columns);
        schema.insert_table(CollectionSchemaTable {
            name: table_name.clone(),
            table_type: TableType::Brick,
            key: TableKey {
                collection: def.key.clone(),
                brick: Some(brick.key.clone()),
                repeater_path: Vec::new(),
            },
            columns,
            can_auto_remove: true,
        });
        for table in repeaters {
            schema.insert_table(table);
        }
    }

    Ok(schema)
}

struct Inferencer<'a> {
    def: &'a CollectionDefinition,
    doc_table: &'a str,
    versions_table: Option<&'a str>,
}

/// The table scope the walk is currently filling.
struct Scope<'a> {
    brick: Option<&'a str>,
    column_prefix: Option<&'a str>,
    /// Base for repeater table names in this scope.
    base: &'a str,
    /// Table that owns rows of this scope; repeaters reference it via
    /// `parent_id`.
    parent_table: &'a str,
    path: &'a [String],
}

impl Inferencer<'_> {
    fn walk(
        &self,
        fields: &[FieldNode],
        columns: &mut Vec<CollectionSchemaColumn>,
        out: &mut Vec<CollectionSchemaTable>,
        scope: Scope<'_>,
    ) {
        for field in fields {
            match field {
                FieldNode::Leaf {
                    key, field_type, ..
                } => {
                    let name = match scope.column_prefix {
                        Some(prefix) => folded_column_name(prefix, key),
                        None => key.clone(),
                    };
                    columns.push(CollectionSchemaColumn::field(name, field_type.sql_type()));
                }
                FieldNode::Tab { fields, .. } => {
                    self.walk(
                        fields,
                        columns,
                        out,
                        Scope {
                            brick: scope.brick,
                            column_prefix: scope.column_prefix,
                            base: scope.base,
                            parent_table: scope.parent_table,
                            path: scope.path,
                        },
                    );
                }
                FieldNode::Repeater { key, fields } => {
                    let mut child_path = scope.path.to_vec();
                    child_path.push(key.clone());
                    let name = repeater_table_name(scope.base, &child_path);

                    let mut child_columns = self.repeater_core_columns(scope.parent_table);
                    let mut nested = Vec::new();
                    self.walk(
                        fields,
                        &mut child_columns,
                        &mut nested,
                        Scope {
                            brick: scope.brick,
                            column_prefix: None,
                            base: scope.base,
                            parent_table: &name,
                            path: &child_path,
                        },
                    );
                    out.push(CollectionSchemaTable {
                        name: name.clone(),
                        table_type: TableType::Repeater,
                        key: TableKey {
                            collection: self.def.key.clone(),
                            brick: scope.brick.map(str::to_string),
                            repeater_path: child_path,
                        },
                        columns: child_columns,
                        can_auto_remove: true,
                    });
                    out.append(&mut nested);
                }
            }
        }
    }

    fn document_table(&self) -> CollectionSchemaTable {
        let mut columns = vec![
            CollectionSchemaColumn::core("id", SqlType::BigInt).primary_key(),
            CollectionSchemaColumn::core("created_at", SqlType::Timestamp)
                .default_value(ColumnDefault::Now),
            CollectionSchemaColumn::core("updated_at", SqlType::Timestamp)
                .default_value(ColumnDefault::Now),
        ];
        if self.def.flags.use_drafts {
            columns.push(
                CollectionSchemaColumn::core("status", SqlType::Text)
                    .default_value(ColumnDefault::Text("draft".to_string())),
            );
        }
        CollectionSchemaTable {
            name: self.doc_table.to_string(),
            table_type: TableType::Document,
            key: TableKey {
                collection: self.def.key.clone(),
                brick: None,
                repeater_path: Vec::new(),
            },
            columns,
            can_auto_remove: true,
        }
    }

    fn versions_table(&self, name: &str) -> CollectionSchemaTable {
        CollectionSchemaTable {
            name: name.to_string(),
            table_type: TableType::Versions,
            key: TableKey {
                collection: self.def.key.clone(),
                brick: None,
                repeater_path: Vec::new(),
            },
            columns: vec![
                CollectionSchemaColumn::core("id", SqlType::BigInt).primary_key(),
                CollectionSchemaColumn::core("document_id", SqlType::BigInt)
                    .references(self.doc_table, "id"),
                CollectionSchemaColumn::core("version_type", SqlType::Text)
                    .default_value(ColumnDefault::Text("draft".to_string())),
                CollectionSchemaColumn::core("created_at", SqlType::Timestamp)
                    .default_value(ColumnDefault::Now),
            ],
            can_auto_remove: true,
        }
    }

    /// Core columns shared by every field-bearing table: identity, document
    /// linkage, version linkage (when revisions are on), and locale.
    fn linked_core_columns(&self) -> Vec<CollectionSchemaColumn> {
        let mut columns = vec![
            CollectionSchemaColumn::core("id", SqlType::BigInt).primary_key(),
            CollectionSchemaColumn::core("document_id", SqlType::BigInt)
                .references(self.doc_table, "id"),
        ];
        if let Some(versions) = self.versions_table {
            columns
                .push(CollectionSchemaColumn::core("version_id", SqlType::BigInt)
                    .references(versions, "id")
                    .nullable());
        }
        columns.push(CollectionSchemaColumn::core("locale", SqlType::Text));
        columns
    }

    fn repeater_core_columns(&self, parent_table: &str) -> Vec<CollectionSchemaColumn> {
        let mut columns = self.linked_core_columns();
        columns.push(
            CollectionSchemaColumn::core("parent_id", SqlType::BigInt)
                .references(parent_table, "id"),
        );
        columns.push(
            CollectionSchemaColumn::core("sort_order", SqlType::Integer)
                .default_value(ColumnDefault::Integer(0)),
        );
        columns
    }
}
