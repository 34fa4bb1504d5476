//! Collection definition and inferred-schema types for plinth.
//!
//! This crate contains the pure half of the migration engine: the typed field
//! tree a collection is declared with, the relational schema inferred from it,
//! and the canonical checksum that decides whether anything changed. Nothing
//! here touches a database.
//!
//! ## Naming Convention
//!
//! Table names are a pure function of the collection key, the brick key, and
//! the repeater path, joined with `__`. Keys therefore must not contain `__`.
//!
//! ## Example
//!
//! ```
//! use plinth_schema::{CollectionDefinition, CollectionMode, FieldNode, FieldType};
//!
//! let blog = CollectionDefinition::new("blog", CollectionMode::Multiple)
//!     .field(FieldNode::leaf("title", FieldType::Text))
//!     .field(FieldNode::repeater(
//!         "items",
//!         vec![FieldNode::leaf("label", FieldType::Text)],
//!     ));
//!
//! let schema = plinth_schema::infer_schema(&blog).unwrap();
//! assert!(schema.table("doc__blog__fields__items").is_some());
//! ```

mod checksum;
mod definition;
mod error;
mod infer;
mod naming;
mod schema;

pub use checksum::schema_checksum;
pub use definition::{
    BrickDefinition, BrickKind, CollectionDefinition, CollectionFlags, CollectionMode, FieldNode,
    FieldType, MAX_REPEATER_DEPTH,
};
pub use error::DefinitionError;
pub use infer::infer_schema;
pub use naming::{
    TABLE_JOIN, brick_table_name, document_fields_table_name, document_table_name, folded_column_name,
    quote_ident, repeater_table_name, versions_table_name,
};
pub use schema::{
    CollectionSchema, CollectionSchemaColumn, CollectionSchemaTable, ColumnDefault, ColumnSource,
    ForeignKeyRef, SqlType, TableKey, TableType,
};

#[cfg(test)]
mod tests;
