//! Canonical schema checksums.
//!
//! The checksum is computed over a canonicalized rendering of the schema:
//! tables and columns sorted by name before serialization. Declaration order
//! therefore never changes the checksum, while any change to a name, type,
//! constraint, or default does.

use crate::schema::{CollectionSchema, CollectionSchemaTable};

/// Compute the canonical checksum of a schema.
///
/// The canonical form is JSON with tables and columns sorted by name; the
/// digest is blake3, rendered as lowercase hex.
pub fn schema_checksum(schema: &CollectionSchema) -> String {
    let mut tables: Vec<CollectionSchemaTable> = schema.iter_tables().cloned().collect();
    tables.sort_by(|a, b| a.name.cmp(&b.name));
    for table in &mut tables {
        table.columns.sort_by(|a, b| a.name.cmp(&b.name));
    }

    let canonical = Canonical {
        key: &schema.key,
        tables,
    };
    // Serializing hand-built structs cannot fail.
    let bytes = serde_json::to_vec(&canonical).expect("canonical schema serializes");
    blake3::hash(&bytes).to_hex().to_string()
}

#[derive(serde::Serialize)]
struct Canonical<'a> {
    key: &'a str,
    tables: Vec<CollectionSchemaTable>,
}

#[cfg(test)]
mod tests {
    use crate::schema::{CollectionSchema, CollectionSchemaColumn, SqlType, TableKey, TableType};

    fn table(name: &str, columns: Vec<CollectionSchemaColumn>) -> crate::CollectionSchemaTable {
        crate::CollectionSchemaTable {
            name: name.to_string(),
            table_type: TableType::DocumentFields,
            key: TableKey {
                collection: "blog".to_string(),
                brick: None,
                repeater_path: Vec::new(),
            },
            columns,
            can_auto_remove: true,
        }
    }

    #[test]
    fn test_column_order_does_not_change_checksum() {
        let a = CollectionSchemaColumn::field("title", SqlType::Text);
        let b = CollectionSchemaColumn::field("excerpt", SqlType::Text);

        let mut first = CollectionSchema::new("blog");
        first.insert_table(table("doc__blog__fields", vec![a.clone(), b.clone()]));

        let mut second = CollectionSchema::new("blog");
        second.insert_table(table("doc__blog__fields", vec![b, a]));

        assert_eq!(first.checksum(), second.checksum());
    }

    #[test]
    fn test_content_change_changes_checksum() {
        let mut first = CollectionSchema::new("blog");
        first.insert_table(table(
            "doc__blog__fields",
            vec![CollectionSchemaColumn::field("title", SqlType::Text)],
        ));

        let mut second = CollectionSchema::new("blog");
        second.insert_table(table(
            "doc__blog__fields",
            vec![CollectionSchemaColumn::field("title", SqlType::BigInt)],
        ));

        assert_ne!(first.checksum(), second.checksum());
    }
}
