//! Database capability descriptor.
//!
//! The engine never branches on a dialect name; everything dialect-specific
//! is expressed as a flat set of flags and expressions consumed by the DDL
//! rendering functions. New dialects are a new descriptor value, not new
//! code paths.

/// Capabilities of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbCapabilities {
    /// Whether `ALTER TABLE ... ALTER COLUMN` can change nullability and
    /// defaults in place. When false, every column modification falls back
    /// to drop-and-recreate.
    pub alter_column: bool,
    /// Whether primary keys can self-populate via an identity clause.
    pub auto_increment_primary_key: bool,
    /// Literals for boolean defaults.
    pub boolean_literal: BooleanLiteral,
    /// Operator the query layer should use for fuzzy matching. Carried in
    /// the descriptor for consumers of the safe schema; DDL never uses it.
    pub fuzzy_match_operator: &'static str,
    /// Expression for "now" timestamp defaults.
    pub timestamp_default_expression: &'static str,
}

/// How the dialect spells boolean literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BooleanLiteral {
    pub true_value: &'static str,
    pub false_value: &'static str,
}

impl DbCapabilities {
    pub fn postgres() -> Self {
        Self {
            alter_column: true,
            auto_increment_primary_key: true,
            boolean_literal: BooleanLiteral {
                true_value: "true",
                false_value: "false",
            },
            fuzzy_match_operator: "ILIKE",
            timestamp_default_expression: "now()",
        }
    }

    pub fn sqlite() -> Self {
        Self {
            alter_column: false,
            auto_increment_primary_key: false,
            boolean_literal: BooleanLiteral {
                true_value: "1",
                false_value: "0",
            },
            fuzzy_match_operator: "LIKE",
            timestamp_default_expression: "CURRENT_TIMESTAMP",
        }
    }

    pub fn mysql() -> Self {
        Self {
            alter_column: true,
            auto_increment_primary_key: true,
            boolean_literal: BooleanLiteral {
                true_value: "1",
                false_value: "0",
            },
            fuzzy_match_operator: "LIKE",
            timestamp_default_expression: "CURRENT_TIMESTAMP",
        }
    }
}
