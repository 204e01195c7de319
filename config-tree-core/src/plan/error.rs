use thiserror::Error;

use crate::path::TreePath;
use crate::tree::Shape;

/// Reasons a desired state cannot be turned into statements.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiffError {
    /// Desired key is missing from live state and creation is disallowed.
    #[error("{}", schema_message(.path, .hint))]
    SchemaViolation {
        path: TreePath,
        hint: Option<String>,
    },
    /// Desired and live values disagree on shape.
    #[error("{path} requires a {expected} value, found {found}")]
    TypeMismatch {
        path: TreePath,
        expected: Shape,
        found: Shape,
    },
    /// A value or key was refused by the value guard.
    #[error("invalid value for {path}: {reason}")]
    Rejected { path: TreePath, reason: String },
}

fn schema_message(path: &TreePath, hint: &Option<String>) -> String {
    let base = format!("key {path} not found, cannot create new keys in safe mode");
    match hint {
        Some(hint) => format!("{base} ({hint})"),
        None => base,
    }
}
