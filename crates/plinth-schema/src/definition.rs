//! Declarative content-model definitions.
//!
//! A [`CollectionDefinition`] is supplied once at process start (by the
//! configuration layer, out of scope here) and is immutable for the process's
//! life. It is a tree: collections own document-level fields plus bricks, and
//! every field is a leaf, a repeater (opening a child table per entry), or a
//! tab (layout only, contributes no columns).

use crate::error::DefinitionError;
use crate::naming::TABLE_JOIN;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum repeater nesting depth, enforced at definition time.
pub const MAX_REPEATER_DEPTH: usize = 3;

/// Whether a collection holds one document or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionMode {
    Single,
    Multiple,
}

/// Behavior flags declared on a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionFlags {
    pub use_drafts: bool,
    pub use_revisions: bool,
    pub use_translations: bool,
}

/// The declared kind of a leaf field. Maps to a SQL type via a fixed,
/// dialect-independent lookup (see [`FieldType::sql_type`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Wysiwyg,
    Number,
    Float,
    Checkbox,
    Select,
    Datetime,
    Colour,
    Link,
    Media,
    Json,
}

impl FieldType {
    /// Fixed field-kind → SQL-type lookup. Dialect-specific keyword
    /// resolution happens only in the executor, never here.
    pub fn sql_type(self) -> crate::schema::SqlType {
        use crate::schema::SqlType;
        match self {
            FieldType::Text
            | FieldType::Textarea
            | FieldType::Wysiwyg
            | FieldType::Select
            | FieldType::Colour
            | FieldType::Link
            | FieldType::Media => SqlType::Text,
            FieldType::Number => SqlType::BigInt,
            FieldType::Float => SqlType::Real,
            FieldType::Checkbox => SqlType::Boolean,
            FieldType::Datetime => SqlType::Timestamp,
            FieldType::Json => SqlType::Json,
        }
    }
}

/// A node in a brick's (or the document's) field tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldNode {
    /// A scalar field; becomes a column on the current table.
    Leaf {
        key: String,
        field_type: FieldType,
        #[serde(default)]
        translatable: bool,
    },
    /// A dynamic list of child field groups; each entry becomes a row in a
    /// child table whose composite key extends the parent path.
    Repeater { key: String, fields: Vec<FieldNode> },
    /// Layout-only grouping; contributes no columns.
    Tab { key: String, fields: Vec<FieldNode> },
}

impl FieldNode {
    pub fn leaf(key: impl Into<String>, field_type: FieldType) -> Self {
        FieldNode::Leaf {
            key: key.into(),
            field_type,
            translatable: false,
        }
    }

    pub fn repeater(key: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        FieldNode::Repeater {
            key: key.into(),
            fields,
        }
    }

    pub fn tab(key: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        FieldNode::Tab {
            key: key.into(),
            fields,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            FieldNode::Leaf { key, .. }
            | FieldNode::Repeater { key, .. }
            | FieldNode::Tab { key, .. } => key,
        }
    }
}

/// A reusable field group attached to a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickDefinition {
    pub key: String,
    pub kind: BrickKind,
    pub fields: Vec<FieldNode>,
}

/// Fixed bricks are singletons folded into the document-fields table;
/// builder bricks are user-added instances with a dedicated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrickKind {
    Fixed,
    Builder,
}

impl BrickDefinition {
    pub fn fixed(key: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        Self {
            key: key.into(),
            kind: BrickKind::Fixed,
            fields,
        }
    }

    pub fn builder(key: impl Into<String>, fields: Vec<FieldNode>) -> Self {
        Self {
            key: key.into(),
            kind: BrickKind::Builder,
            fields,
        }
    }
}

/// A named content type: document-level fields plus bricks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDefinition {
    pub key: String,
    pub mode: CollectionMode,
    #[serde(default)]
    pub flags: CollectionFlags,
    #[serde(default)]
    pub fields: Vec<FieldNode>,
    #[serde(default)]
    pub bricks: Vec<BrickDefinition>,
}

impl CollectionDefinition {
    pub fn new(key: impl Into<String>, mode: CollectionMode) -> Self {
        Self {
            key: key.into(),
            mode,
            flags: CollectionFlags::default(),
            fields: Vec::new(),
            bricks: Vec::new(),
        }
    }

    pub fn flags(mut self, flags: CollectionFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn field(mut self, field: FieldNode) -> Self {
        self.fields.push(field);
        self
    }

    pub fn brick(mut self, brick: BrickDefinition) -> Self {
        self.bricks.push(brick);
        self
    }

    /// Validate the definition: key hygiene, per-table-scope field key
    /// uniqueness, and repeater nesting depth.
    ///
    /// A table scope is the set of leaf fields that land in one table: the
    /// document-fields scope (document fields plus folded fixed bricks), one
    /// scope per builder brick, and one per repeater. Tabs are transparent.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.key.is_empty() {
            return Err(DefinitionError::EmptyCollectionKey);
        }
        check_key(&self.key)?;

        let mut brick_keys = HashSet::new();
        for brick in &self.bricks {
            check_key(&brick.key)?;
            if !brick_keys.insert(brick.key.as_str()) {
                return Err(DefinitionError::DuplicateBrickKey {
                    collection: self.key.clone(),
                    key: brick.key.clone(),
                });
            }
        }

        // Document-fields scope: document fields and every fixed brick's
        // fields share one table. Folded leaf columns are prefixed with the
        // brick key, so collisions can only happen within one brick.
        let mut doc_scope = ScopeChecker::new(self, "document-fields");
        self.walk_scope(&self.fields, &mut doc_scope, 0, &[])?;
        for brick in self.bricks.iter().filter(|b| b.kind == BrickKind::Fixed) {
            let mut scope = ScopeChecker::new(self, &brick.key);
            self.walk_scope(&brick.fields, &mut scope, 0, &[])?;
        }

        for brick in self.bricks.iter().filter(|b| b.kind == BrickKind::Builder) {
            let mut scope = ScopeChecker::new(self, &brick.key);
            self.walk_scope(&brick.fields, &mut scope, 0, &[])?;
        }

        Ok(())
    }

    /// Recursive scope walk: leaves register in the current scope, repeaters
    /// open a fresh scope one level deeper, tabs are transparent.
    fn walk_scope(
        &self,
        fields: &[FieldNode],
        scope: &mut ScopeChecker<'_>,
        depth: usize,
        path: &[&str],
    ) -> Result<(), DefinitionError> {
        for field in fields {
            check_key(field.key())?;
            match field {
                FieldNode::Leaf { key, .. } => scope.insert(key)?,
                FieldNode::Tab { fields, .. } => {
                    self.walk_scope(fields, scope, depth, path)?;
                }
                FieldNode::Repeater { key, fields } => {
                    scope.insert(key)?;
                    let mut child_path: Vec<&str> = path.to_vec();
                    child_path.push(key);
                    if depth + 1 > MAX_REPEATER_DEPTH {
                        return Err(DefinitionError::RepeaterDepthExceeded {
                            collection: self.key.clone(),
                            path: child_path.join("."),
                            max: MAX_REPEATER_DEPTH,
                        });
                    }
                    let scope_name = child_path.join(".");
                    let mut child_scope = ScopeChecker::new(self, &scope_name);
                    self.walk_scope(fields, &mut child_scope, depth + 1, &child_path)?;
                }
            }
        }
        Ok(())
    }
}

fn check_key(key: &str) -> Result<(), DefinitionError> {
    if key.contains(TABLE_JOIN) {
        return Err(DefinitionError::KeyContainsDelimiter {
            key: key.to_string(),
        });
    }
    Ok(())
}

struct ScopeChecker<'a> {
    collection: &'a str,
    scope: String,
    seen: HashSet<String>,
}

impl<'a> ScopeChecker<'a> {
    fn new(def: &'a CollectionDefinition, scope: &str) -> Self {
        Self {
            collection: &def.key,
            scope: scope.to_string(),
            seen: HashSet::new(),
        }
    }

    fn insert(&mut self, key: &str) -> Result<(), DefinitionError> {
        if !self.seen.insert(key.to_string()) {
            return Err(DefinitionError::DuplicateFieldKey {
                collection: self.collection.to_string(),
                scope: self.scope.clone(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}
