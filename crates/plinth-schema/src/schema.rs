//! Inferred relational schema types.
//!
//! A [`CollectionSchema`] is what the inferencer produces from one
//! [`crate::CollectionDefinition`], what the snapshot store persists (as
//! JSON), and what the differ compares. All types here serialize with serde
//! so a snapshot round-trips losslessly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The role a table plays in a collection's schema. Drives migration
/// ordering: parents carry a higher priority than their children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    Document,
    Versions,
    DocumentFields,
    Brick,
    Repeater,
}

impl TableType {
    /// Migration priority weight; higher runs first, satisfying foreign-key
    /// direction on create.
    pub fn priority(self) -> u32 {
        match self {
            TableType::Document => 1000,
            TableType::Versions => 900,
            TableType::DocumentFields => 800,
            TableType::Brick => 700,
            TableType::Repeater => 600,
        }
    }
}

/// Dialect-independent SQL column types. Keyword resolution happens in the
/// executor's DDL rendering, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    Text,
    Integer,
    BigInt,
    Real,
    Boolean,
    Timestamp,
    Json,
}

/// Where a column came from: injected by the engine (`Core`) or declared by
/// a leaf field (`Field`). Core columns are never auto-removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnSource {
    Core,
    Field,
}

/// A column default. Literal rendering is capability-driven in the executor
/// (boolean literals and the timestamp-now expression differ per dialect).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnDefault {
    Text(String),
    Integer(i64),
    Boolean(bool),
    Now,
}

/// A simple single-column foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    pub table: String,
    pub column: String,
    pub on_delete_cascade: bool,
}

/// A column of an inferred table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchemaColumn {
    pub name: String,
    pub source: ColumnSource,
    pub sql_type: SqlType,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ColumnDefault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<ForeignKeyRef>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary: bool,
    /// Whether the differ may drop this column once it disappears from the
    /// definition. Always false for core columns.
    #[serde(default = "default_true")]
    pub can_auto_remove: bool,
}

fn default_true() -> bool {
    true
}

impl CollectionSchemaColumn {
    /// A field-sourced column: nullable, no constraints, auto-removable.
    pub fn field(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            source: ColumnSource::Field,
            sql_type,
            nullable: true,
            default: None,
            foreign_key: None,
            unique: false,
            primary: false,
            can_auto_remove: true,
        }
    }

    /// A core column: engine-injected, never auto-removable.
    pub fn core(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            source: ColumnSource::Core,
            sql_type,
            nullable: false,
            default: None,
            foreign_key: None,
            unique: false,
            primary: false,
            can_auto_remove: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key = Some(ForeignKeyRef {
            table: table.into(),
            column: column.into(),
            on_delete_cascade: true,
        });
        self
    }
}

/// The composite key identifying a table within its collection: which brick
/// it belongs to (if any) and the repeater path that led to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableKey {
    pub collection: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brick: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeater_path: Vec<String>,
}

/// One inferred table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchemaTable {
    pub name: String,
    pub table_type: TableType,
    pub key: TableKey,
    pub columns: Vec<CollectionSchemaColumn>,
    #[serde(default = "default_true")]
    pub can_auto_remove: bool,
}

impl CollectionSchemaTable {
    pub fn column(&self, name: &str) -> Option<&CollectionSchemaColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A collection's full inferred schema: its key plus ordered tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub key: String,
    pub tables: IndexMap<String, CollectionSchemaTable>,
}

impl CollectionSchema {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            tables: IndexMap::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&CollectionSchemaTable> {
        self.tables.get(name)
    }

    pub fn iter_tables(&self) -> impl Iterator<Item = &CollectionSchemaTable> {
        self.tables.values()
    }

    pub fn insert_table(&mut self, table: CollectionSchemaTable) {
        self.tables.insert(table.name.clone(), table);
    }

    /// Canonical (order-independent) checksum of this schema.
    pub fn checksum(&self) -> String {
        crate::checksum::schema_checksum(self)
    }
}
