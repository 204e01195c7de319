use tracing::debug;

use crate::path::TreePath;
use crate::plan::error::DiffError;
use crate::plan::guard::{guard_tree, ValueGuard};
use crate::statement::Statement;
use crate::tree::{ConfigTree, Shape};

/// Looks up what to tell the user about a key the live tree does not have.
pub type KeyHint = fn(&TreePath) -> Option<String>;

/// Whether keys missing from live state may be introduced.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreatePolicy {
    pub allow_create: bool,
    /// Field catalog consulted when a missing key is refused.
    pub hint: Option<KeyHint>,
}

impl CreatePolicy {
    pub fn allowing_create() -> Self {
        Self {
            allow_create: true,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: KeyHint) -> Self {
        self.hint = Some(hint);
        self
    }

    fn refuse(&self, path: TreePath) -> DiffError {
        let hint = self.hint.and_then(|lookup| lookup(&path));
        DiffError::SchemaViolation { path, hint }
    }
}

/// Plan the statements that converge the flat section at `section` toward `desired`.
///
/// `desired` must be a mapping. Each value is a scalar, a list of scalars
/// (compared as a set and replaced whole) or a mapping of scalars (compared
/// key by key). A vacant live section counts as an empty mapping and is
/// initialised before the first statement that writes into it.
pub fn plan_section(
    section: &TreePath,
    desired: &ConfigTree,
    live: &ConfigTree,
    policy: CreatePolicy,
    guard: &dyn ValueGuard,
) -> Result<Vec<Statement>, DiffError> {
    let Some(entries) = desired.as_mapping() else {
        return Err(mismatch(section, Shape::Mapping, desired));
    };
    if !live.is_vacant() && live.as_mapping().is_none() {
        return Err(mismatch(section, Shape::Mapping, live));
    }

    // Every key and value is checked before any statement exists.
    guard_tree(guard, section, section.leaf_key().unwrap_or_default(), desired)?;

    let mut out = Vec::new();
    for (key, want) in entries {
        let path = section.child(key.as_str());
        let have = live.get(key);
        if have.is_none() && !policy.allow_create {
            return Err(policy.refuse(path));
        }

        match want {
            ConfigTree::Scalar(value) => {
                if scalar_differs(&path, have, value)? {
                    out.push(Statement::set(path, value.as_str()));
                }
            }
            ConfigTree::Sequence(items) => {
                for (i, item) in items.iter().enumerate() {
                    if item.as_scalar().is_none() {
                        return Err(mismatch(&path.index(i), Shape::Scalar, item));
                    }
                }
                let have_set = match have {
                    None => Default::default(),
                    Some(node) => node
                        .scalar_set()
                        .filter(|_| matches!(node, ConfigTree::Sequence(_)) || node.is_vacant())
                        .ok_or_else(|| mismatch(&path, Shape::Sequence, node))?,
                };
                let want_set = want.scalar_set().unwrap_or_default();
                if have_set != want_set {
                    out.push(Statement::Set {
                        path,
                        value: want.clone(),
                    });
                }
            }
            ConfigTree::Mapping(subs) => {
                if let Some(node) = have {
                    if !node.is_vacant() && node.as_mapping().is_none() {
                        return Err(mismatch(&path, Shape::Mapping, node));
                    }
                }
                let first = out.len();
                for (sub_key, sub_want) in subs {
                    let sub_path = path.child(sub_key.as_str());
                    let Some(value) = sub_want.as_scalar() else {
                        return Err(mismatch(&sub_path, Shape::Scalar, sub_want));
                    };
                    let sub_have = have.and_then(|node| node.get(sub_key));
                    if sub_have.is_none() && !policy.allow_create {
                        return Err(policy.refuse(sub_path));
                    }
                    if scalar_differs(&sub_path, sub_have, value)? {
                        out.push(Statement::set(sub_path, value));
                    }
                }
                if out.len() > first && have.map_or(true, ConfigTree::is_vacant) {
                    out.insert(first, Statement::InitContainer { path });
                }
            }
            ConfigTree::Absent => return Err(mismatch(&path, Shape::Scalar, want)),
        }
    }

    // pfSense stores an empty section as "", which PHP cannot index into.
    if live.is_vacant() && !out.is_empty() {
        out.insert(
            0,
            Statement::InitContainer {
                path: section.clone(),
            },
        );
    }

    debug!(section = %section, statements = out.len(), "planned section");
    Ok(out)
}

fn scalar_differs(path: &TreePath, have: Option<&ConfigTree>, want: &str) -> Result<bool, DiffError> {
    match have {
        None | Some(ConfigTree::Absent) => Ok(true),
        Some(ConfigTree::Scalar(current)) => Ok(current != want),
        Some(other) => Err(mismatch(path, Shape::Scalar, other)),
    }
}

fn mismatch(path: &TreePath, expected: Shape, found: &ConfigTree) -> DiffError {
    DiffError::TypeMismatch {
        path: path.clone(),
        expected,
        found: found.shape(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{plan_section, CreatePolicy};
    use crate::path::TreePath;
    use crate::plan::error::DiffError;
    use crate::plan::guard::AcceptAll;
    use crate::statement::Statement;
    use crate::tree::{ConfigTree, Shape};

    fn tree(raw: &str) -> ConfigTree {
        serde_json::from_str(raw).expect("json")
    }

    #[test]
    fn equal_scalar_emits_nothing() {
        let out = plan_section(
            &TreePath::key("system"),
            &tree(r#"{"hostname":"fw1"}"#),
            &tree(r#"{"hostname":"fw1"}"#),
            CreatePolicy::default(),
            &AcceptAll,
        )
        .expect("plan");
        assert!(out.is_empty());
    }

    #[test]
    fn vacant_section_needs_create() {
        let err = plan_section(
            &TreePath::key("snmpd"),
            &tree(r#"{"syslocation":"rack 4"}"#),
            &ConfigTree::scalar(""),
            CreatePolicy::default(),
            &AcceptAll,
        )
        .expect_err("safe mode");
        assert_eq!(
            err.to_string(),
            "key snmpd.syslocation not found, cannot create new keys in safe mode"
        );
    }

    #[test]
    fn vacant_containers_are_initialised_first() {
        let out = plan_section(
            &TreePath::key("system"),
            &tree(r#"{"hostname":"fw2","webgui":{"protocol":"https"}}"#),
            &ConfigTree::scalar(""),
            CreatePolicy::allowing_create(),
            &AcceptAll,
        )
        .expect("plan");
        assert_eq!(
            out,
            vec![
                Statement::InitContainer {
                    path: TreePath::key("system")
                },
                Statement::set("system.hostname".parse().expect("path"), "fw2"),
                Statement::InitContainer {
                    path: "system.webgui".parse().expect("path")
                },
                Statement::set("system.webgui.protocol".parse().expect("path"), "https"),
            ]
        );
    }

    #[test]
    fn refused_key_carries_catalog_hint() {
        fn hint(path: &TreePath) -> Option<String> {
            Some(format!("{} is not a known field", path.leaf_key().unwrap_or_default()))
        }
        let err = plan_section(
            &TreePath::key("system"),
            &tree(r#"{"webgui":{"protcol":"https"}}"#),
            &tree(r#"{"webgui":{"protocol":"http"}}"#),
            CreatePolicy::default().with_hint(hint),
            &AcceptAll,
        )
        .expect_err("safe mode");
        assert_eq!(
            err.to_string(),
            "key system.webgui.protcol not found, cannot create new keys in safe mode (protcol is not a known field)"
        );
    }

    #[test]
    fn scalar_against_list_is_a_mismatch() {
        let err = plan_section(
            &TreePath::key("system"),
            &tree(r#"{"dnsserver":"1.1.1.1"}"#),
            &tree(r#"{"dnsserver":["1.1.1.1"]}"#),
            CreatePolicy::default(),
            &AcceptAll,
        )
        .expect_err("mismatch");
        assert_eq!(
            err,
            DiffError::TypeMismatch {
                path: "system.dnsserver".parse().expect("path"),
                expected: Shape::Scalar,
                found: Shape::Sequence,
            }
        );
    }

    #[test]
    fn sub_mapping_emits_one_set_per_changed_key() {
        let out = plan_section(
            &TreePath::key("system"),
            &tree(r#"{"webgui":{"protocol":"https","logincss":"bf7703"}}"#),
            &tree(r#"{"webgui":{"protocol":"http","logincss":"bf7703"}}"#),
            CreatePolicy::default(),
            &AcceptAll,
        )
        .expect("plan");
        assert_eq!(
            out,
            vec![Statement::set(
                "system.webgui.protocol".parse().expect("path"),
                "https"
            )]
        );
    }
}
