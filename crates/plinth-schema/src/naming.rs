//! Deterministic table and column naming.
//!
//! Every name here is a pure function of the definition, so inferring twice
//! from an unchanged definition always yields the same tables. Names are
//! namespaced by a table-type prefix (`doc`, `ver`, `brick`) so that a brick
//! key can never collide with a core table name.

/// The join delimiter for derived table names. Collection, brick, and field
/// keys must not contain it (enforced at definition time).
pub const TABLE_JOIN: &str = "__";

/// Name of a collection's document table.
pub fn document_table_name(collection: &str) -> String {
    format!("doc{TABLE_JOIN}{collection}")
}

/// Name of a collection's versions table.
pub fn versions_table_name(collection: &str) -> String {
    format!("ver{TABLE_JOIN}{collection}")
}

/// Name of a collection's document-fields table (document-level fields plus
/// folded fixed bricks).
pub fn document_fields_table_name(collection: &str) -> String {
    format!("doc{TABLE_JOIN}{collection}{TABLE_JOIN}fields")
}

/// Name of a builder brick's table.
pub fn brick_table_name(collection: &str, brick: &str) -> String {
    format!("brick{TABLE_JOIN}{collection}{TABLE_JOIN}{brick}")
}

/// Name of a repeater table: the owning scope's base name plus the full
/// repeater path. The base is the document-fields name (with the brick key
/// appended for folded fixed bricks) or a builder brick's table name, so
/// nested repeaters stay unique and a parent's name is always a prefix of
/// its children's.
pub fn repeater_table_name(base_table: &str, path: &[String]) -> String {
    let mut name = base_table.to_string();
    for segment in path {
        name.push_str(TABLE_JOIN);
        name.push_str(segment);
    }
    name
}

/// Column name for a fixed brick's leaf field folded into the
/// document-fields table.
pub fn folded_column_name(brick: &str, field: &str) -> String {
    format!("{brick}{TABLE_JOIN}{field}")
}

/// Quote a SQL identifier.
///
/// Always quotes to avoid issues with reserved keywords, doubling any
/// embedded quotes.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}
