use crate::path::TreePath;
use crate::plan::error::DiffError;
use crate::tree::ConfigTree;

/// Checks applied to every key and scalar before it may appear in a statement.
pub trait ValueGuard {
    /// `field` is the key the value is stored under (the list key for list items).
    fn check_value(&self, path: &TreePath, field: &str, value: &str) -> Result<(), String>;

    fn check_key(&self, _path: &TreePath, _key: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Guard that accepts everything. Only for trusted input.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ValueGuard for AcceptAll {
    fn check_value(&self, _path: &TreePath, _field: &str, _value: &str) -> Result<(), String> {
        Ok(())
    }
}

/// Run `guard` over every key and scalar of `value`, which will be stored at `path`.
pub fn guard_tree(
    guard: &dyn ValueGuard,
    path: &TreePath,
    field: &str,
    value: &ConfigTree,
) -> Result<(), DiffError> {
    match value {
        ConfigTree::Scalar(raw) => guard
            .check_value(path, field, raw)
            .map_err(|reason| DiffError::Rejected {
                path: path.clone(),
                reason,
            }),
        ConfigTree::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                guard_tree(guard, &path.index(i), field, item)?;
            }
            Ok(())
        }
        ConfigTree::Mapping(entries) => {
            for (key, item) in entries {
                let child = path.child(key.as_str());
                guard
                    .check_key(path, key)
                    .map_err(|reason| DiffError::Rejected {
                        path: child.clone(),
                        reason,
                    })?;
                guard_tree(guard, &child, key, item)?;
            }
            Ok(())
        }
        ConfigTree::Absent => Ok(()),
    }
}
