use brine_nifxml_tree::TreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NifError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document error: {0}")]
    Tree(#[from] TreeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema version {found} is not supported (minimum is {minimum})")]
    UnsupportedSchemaVersion {
        found:   String,
        minimum: String,
    },

    #[error("The {category} {name} is defined twice")]
    DuplicateDefinition {
        category: &'static str,
        name:     String,
    },

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Malformed version {0}")]
    MalformedVersion(String),

    #[error("Syntax error in expression {expr}: {msg}")]
    SyntaxError {
        expr: String,
        msg:  String,
    },

    #[error("Unbound reference {0}")]
    UnboundReference(String),

    #[error("Division by zero in {0}")]
    DivisionByZero(String),

    #[error("Arithmetic overflow in {0}")]
    Overflow(String),

    #[error("The {what} {name} is not defined")]
    UnresolvedType {
        what: &'static str,
        name: String,
    },

    #[error("Invalid {what} {value}")]
    InvalidValue {
        what:  &'static str,
        value: String,
    },
}
