use std::fmt::{self, Display, Formatter};

use serde::Serialize;

use crate::path::TreePath;
use crate::tree::ConfigTree;

/// One ordered mutation of a configuration tree.
///
/// Statements are applied in emission order; later ones may rely on earlier
/// ones (an [`Statement::Increment`] followed by a record that uses the new
/// counter value, for example).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Statement {
    /// Store `value` at `path`, creating intermediate mappings.
    Set { path: TreePath, value: ConfigTree },
    /// Append `value` to the list at `path`.
    Append { path: TreePath, value: ConfigTree },
    /// Remove the entry at `path`.
    Remove { path: TreePath },
    /// Add one to the numeric counter at `path`.
    Increment { path: TreePath },
    /// Turn a vacant value at `path` into an empty container.
    InitContainer { path: TreePath },
}

impl Statement {
    pub fn set(path: TreePath, value: impl Into<ConfigTree>) -> Self {
        Statement::Set {
            path,
            value: value.into(),
        }
    }

    pub fn path(&self) -> &TreePath {
        match self {
            Statement::Set { path, .. }
            | Statement::Append { path, .. }
            | Statement::Remove { path }
            | Statement::Increment { path }
            | Statement::InitContainer { path } => path,
        }
    }

    /// The value carried by the statement, if any.
    pub fn value(&self) -> Option<&ConfigTree> {
        match self {
            Statement::Set { value, .. } | Statement::Append { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Set { path, value } => write!(f, "set {path} = {value}"),
            Statement::Append { path, value } => write!(f, "append {path} += {value}"),
            Statement::Remove { path } => write!(f, "remove {path}"),
            Statement::Increment { path } => write!(f, "increment {path}"),
            Statement::InitContainer { path } => write!(f, "init {path}"),
        }
    }
}
