use thiserror::Error;

/// A configuration bug in a collection definition.
///
/// These are raised before any schema is inferred and before any database
/// access happens; a definition that fails validation fails the whole
/// migration command at startup.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("collection key must not be empty")]
    EmptyCollectionKey,

    #[error("key '{key}' must not contain the table-name join delimiter '__'")]
    KeyContainsDelimiter { key: String },

    #[error("collection '{collection}': duplicate field key '{key}' in table scope '{scope}'")]
    DuplicateFieldKey {
        collection: String,
        scope: String,
        key: String,
    },

    #[error("collection '{collection}': duplicate brick key '{key}'")]
    DuplicateBrickKey { collection: String, key: String },

    #[error(
        "collection '{collection}': repeater '{path}' exceeds the maximum nesting depth of {max}"
    )]
    RepeaterDepthExceeded {
        collection: String,
        path: String,
        max: usize,
    },
}
