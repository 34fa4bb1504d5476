//! Runtime schema guard.
//!
//! Between a definition change and the next migration run, the declared
//! schema and the physical schema disagree. The guard computes the safe
//! intersection: every declared table and column that actually exists in
//! the database right now, with the shape it physically has. Query builders
//! working from the guarded schema never reference a column a migration has
//! not created yet.

use plinth_schema::CollectionSchema;

/// The declared schema restricted to what the latest snapshot says exists.
///
/// Tables and columns only present in `declared` are dropped. Columns
/// present on both sides keep their *persisted* shape, since that is what a
/// query will actually hit. With no snapshot at all the collection has no
/// tables, and the result is empty.
pub fn safe_schema(
    persisted: Option<&CollectionSchema>,
    declared: &CollectionSchema,
) -> CollectionSchema {
    let mut safe = CollectionSchema::new(declared.key.clone());

    let Some(persisted) = persisted else {
        return safe;
    };

    for table in declared.iter_tables() {
        let Some(persisted_table) = persisted.table(&table.name) else {
            continue;
        };
        let mut guarded = table.clone();
        guarded.columns = table
            .columns
            .iter()
            .filter_map(|column| persisted_table.column(&column.name).cloned())
            .collect();
        safe.insert_table(guarded);
    }

    safe
}
