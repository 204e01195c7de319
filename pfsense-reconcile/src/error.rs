use config_tree_core::{ApplyError, DiffError, ParseError, Shape, TreePath};
use thiserror::Error;

/// Everything that can stop a reconciliation.
///
/// Errors are final for the invocation: nothing is retried and no partial
/// result is returned.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Wrong platform, missing shell, or missing package.
    #[error("precondition failed: {0}")]
    Precondition(String),
    /// The shell exited with a nonzero status.
    #[error("error {action}: shell exited with status {status}: {stderr}")]
    Transport {
        action: &'static str,
        status: i32,
        stderr: String,
        stdout: String,
    },
    /// The shell output was not framed or not parseable. Carries the raw output.
    #[error("error converting shell output to JSON: {reason}\n--- output ---\n{output}")]
    Format { reason: String, output: String },
    /// A key the live tree does not have, or must not have as a flat value.
    #[error("{message}")]
    SchemaViolation { path: TreePath, message: String },
    #[error("{path} requires a {expected} value, found {found}")]
    TypeMismatch {
        path: TreePath,
        expected: Shape,
        found: Shape,
    },
    #[error("invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("{0} not found")]
    NotFound(String),
    /// The request needs something this tool deliberately never does.
    #[error("unsupported request: {0}")]
    Unsupported(String),
    #[error("{section} changed on the firewall while the change was being planned")]
    ConcurrentModification { section: TreePath },
    #[error("cannot commit to a snapshot; use --dry-run")]
    Snapshot,
    #[error(transparent)]
    Apply(#[from] ApplyError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl From<DiffError> for ReconcileError {
    fn from(err: DiffError) -> Self {
        let message = err.to_string();
        match err {
            DiffError::SchemaViolation { path, .. } => {
                ReconcileError::SchemaViolation { path, message }
            }
            DiffError::TypeMismatch {
                path,
                expected,
                found,
            } => ReconcileError::TypeMismatch {
                path,
                expected,
                found,
            },
            DiffError::Rejected { path, reason } => ReconcileError::Validation {
                field: path.to_string(),
                reason,
            },
        }
    }
}

impl ReconcileError {
    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ReconcileError::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use config_tree_core::{DiffError, TreePath};

    use super::ReconcileError;

    #[test]
    fn rejected_values_become_validation_errors() {
        let err: ReconcileError = DiffError::Rejected {
            path: TreePath::key("system").child("hostname"),
            reason: "contains ';'".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid value for system.hostname: contains ';'"
        );
    }

    #[test]
    fn schema_violation_names_hint() {
        let err: ReconcileError = DiffError::SchemaViolation {
            path: TreePath::key("system").child("group"),
            hint: Some("use the group operation".to_string()),
        }
        .into();
        assert!(err.to_string().ends_with("(use the group operation)"));
    }
}
