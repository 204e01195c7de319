//! In-memory statement application.
//!
//! Mirrors what the remote side does with a statement batch closely enough to
//! predict the post-state of a dry run and to check idempotence in tests.

use thiserror::Error;

use crate::locate::{record_at, record_entries};
use crate::path::{Segment, TreePath};
use crate::statement::Statement;
use crate::tree::{ConfigTree, Shape};

/// Errors raised while applying a statement to an in-memory tree.
#[derive(Debug, Error, PartialEq)]
pub enum ApplyError {
    /// A path segment tried to descend into a value that cannot hold it.
    #[error("cannot address {path}: parent is a {shape}")]
    NotAContainer { path: TreePath, shape: Shape },
    /// A list index skipped past the end of the list.
    #[error("index out of range at {path}")]
    OutOfRange { path: TreePath },
    /// Increment target is not numeric.
    #[error("{path} is not a counter (found {found})")]
    NotACounter { path: TreePath, found: String },
}

/// Apply every statement in order.
pub fn apply_all<'a, I>(tree: &mut ConfigTree, statements: I) -> Result<(), ApplyError>
where
    I: IntoIterator<Item = &'a Statement>,
{
    for statement in statements {
        apply(tree, statement)?;
    }
    Ok(())
}

/// Apply one statement.
pub fn apply(tree: &mut ConfigTree, statement: &Statement) -> Result<(), ApplyError> {
    match statement {
        Statement::Set { path, value } => {
            *slot(tree, path)? = value.clone();
        }
        Statement::Append { path, value } => append(slot(tree, path)?, path, value.clone())?,
        Statement::Remove { path } => remove(tree, path)?,
        Statement::Increment { path } => {
            let target = slot(tree, path)?;
            let next = match &*target {
                ConfigTree::Absent => 1,
                ConfigTree::Scalar(raw) => {
                    raw.trim()
                        .parse::<i64>()
                        .map_err(|_| ApplyError::NotACounter {
                            path: path.clone(),
                            found: raw.clone(),
                        })?
                        + 1
                }
                other => {
                    return Err(ApplyError::NotACounter {
                        path: path.clone(),
                        found: other.shape().to_string(),
                    })
                }
            };
            *target = ConfigTree::Scalar(next.to_string());
        }
        Statement::InitContainer { path } => {
            let target = slot(tree, path)?;
            if target.is_vacant() && !matches!(target, ConfigTree::Mapping(_)) {
                *target = ConfigTree::mapping();
            }
        }
    }
    Ok(())
}

/// Walk to `path`, creating intermediate containers like the remote side does.
fn slot<'a>(tree: &'a mut ConfigTree, path: &TreePath) -> Result<&'a mut ConfigTree, ApplyError> {
    let mut node = tree;
    for segment in path.segments() {
        if node.is_vacant() {
            let wanted = match segment {
                Segment::Key(_) => ConfigTree::mapping(),
                Segment::Index(_) => ConfigTree::Sequence(Vec::new()),
            };
            // An empty mapping also holds integer keys; keep it.
            if !matches!((&*node, segment), (ConfigTree::Mapping(_), Segment::Index(_))) {
                *node = wanted;
            }
        }
        node = match (node, segment) {
            (ConfigTree::Mapping(entries), Segment::Key(key)) => mapping_slot(entries, key),
            (ConfigTree::Mapping(entries), Segment::Index(index)) => {
                mapping_slot(entries, &index.to_string())
            }
            (ConfigTree::Sequence(items), Segment::Index(index)) => {
                if *index == items.len() {
                    items.push(ConfigTree::Absent);
                }
                items
                    .get_mut(*index)
                    .ok_or_else(|| ApplyError::OutOfRange { path: path.clone() })?
            }
            (other, _) => {
                return Err(ApplyError::NotAContainer {
                    path: path.clone(),
                    shape: other.shape(),
                })
            }
        };
    }
    Ok(node)
}

fn mapping_slot<'a>(entries: &'a mut Vec<(String, ConfigTree)>, key: &str) -> &'a mut ConfigTree {
    let pos = match entries.iter().position(|(k, _)| k == key) {
        Some(pos) => pos,
        None => {
            entries.push((key.to_string(), ConfigTree::Absent));
            entries.len() - 1
        }
    };
    &mut entries[pos].1
}

fn append(target: &mut ConfigTree, path: &TreePath, value: ConfigTree) -> Result<(), ApplyError> {
    if target.is_vacant() {
        *target = ConfigTree::Sequence(Vec::new());
    }
    match target {
        ConfigTree::Sequence(items) => {
            items.push(value);
            Ok(())
        }
        ConfigTree::Mapping(entries) => {
            let keys: Option<Vec<usize>> = entries.iter().map(|(k, _)| k.parse().ok()).collect();
            let Some(keys) = keys else {
                return Err(ApplyError::NotAContainer {
                    path: path.clone(),
                    shape: Shape::Mapping,
                });
            };
            let next = keys.iter().max().map_or(0, |max| max + 1);
            entries.push((next.to_string(), value));
            Ok(())
        }
        other => Err(ApplyError::NotAContainer {
            path: path.clone(),
            shape: other.shape(),
        }),
    }
}

fn remove(tree: &mut ConfigTree, path: &TreePath) -> Result<(), ApplyError> {
    let Some((parent_path, last)) = path.split_last() else {
        *tree = ConfigTree::Absent;
        return Ok(());
    };
    let Some(parent) = descend_existing(tree, &parent_path) else {
        return Ok(());
    };
    match (parent, last) {
        (ConfigTree::Mapping(entries), Segment::Key(key)) => {
            entries.retain(|(k, _)| k != key);
        }
        (list, Segment::Index(index)) => unset_position(list, *index),
        _ => {}
    }
    Ok(())
}

/// Unsetting a list entry leaves a gap in the remaining positions. The list
/// reads back as a list only while its positions still run `0..n`.
fn unset_position(list: &mut ConfigTree, index: usize) {
    if record_at(list, index).is_none() {
        return;
    }
    let remaining: Vec<(usize, ConfigTree)> = record_entries(list)
        .into_iter()
        .filter(|(pos, _)| *pos != index)
        .map(|(pos, record)| (pos, record.clone()))
        .collect();
    let contiguous = remaining.iter().enumerate().all(|(i, (pos, _))| i == *pos);
    *list = if contiguous {
        ConfigTree::Sequence(remaining.into_iter().map(|(_, record)| record).collect())
    } else {
        ConfigTree::Mapping(
            remaining
                .into_iter()
                .map(|(pos, record)| (pos.to_string(), record))
                .collect(),
        )
    };
}

fn descend_existing<'a>(tree: &'a mut ConfigTree, path: &TreePath) -> Option<&'a mut ConfigTree> {
    let mut node = tree;
    for segment in path.segments() {
        node = match (node, segment) {
            (ConfigTree::Mapping(entries), Segment::Key(key)) => {
                entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)?
            }
            (ConfigTree::Mapping(entries), Segment::Index(index)) => {
                let key = index.to_string();
                entries.iter_mut().find(|(k, _)| *k == key).map(|(_, v)| v)?
            }
            (ConfigTree::Sequence(items), Segment::Index(index)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{apply, apply_all, ApplyError};
    use crate::path::TreePath;
    use crate::statement::Statement;
    use crate::tree::ConfigTree;

    fn parse(raw: &str) -> ConfigTree {
        serde_json::from_str(raw).expect("json")
    }

    #[test]
    fn set_creates_intermediate_mappings() {
        let mut tree = parse(r#"{"system":{}}"#);
        let path: TreePath = "system.webgui.protocol".parse().expect("path");
        apply(&mut tree, &Statement::set(path.clone(), "https")).expect("apply");
        assert_eq!(tree.at(&path).as_scalar(), Some("https"));
    }

    #[test]
    fn append_to_empty_element_starts_a_list() {
        let mut tree = parse(r#"{"aliases":""}"#);
        let statements = [
            Statement::InitContainer {
                path: TreePath::key("aliases"),
            },
            Statement::Append {
                path: TreePath::key("aliases").child("alias"),
                value: ConfigTree::from_pairs([("name", "web".into())]),
            },
        ];
        apply_all(&mut tree, &statements).expect("apply");
        assert_eq!(tree, parse(r#"{"aliases":{"alias":[{"name":"web"}]}}"#));
    }

    #[test]
    fn append_to_sparse_list_uses_next_key() {
        let mut tree = parse(r#"{"rule":{"0":{"t":"a"},"3":{"t":"b"}}}"#);
        let statement = Statement::Append {
            path: TreePath::key("rule"),
            value: ConfigTree::from_pairs([("t", "c".into())]),
        };
        apply(&mut tree, &statement).expect("apply");
        let path: TreePath = "rule[4].t".parse().expect("path");
        assert_eq!(tree.at(&path).as_scalar(), Some("c"));
    }

    #[test]
    fn increment_counts_up_from_text() {
        let mut tree = parse(r#"{"system":{"nextgid":"2000"}}"#);
        let path: TreePath = "system.nextgid".parse().expect("path");
        apply(&mut tree, &Statement::Increment { path: path.clone() }).expect("apply");
        assert_eq!(tree.at(&path).as_scalar(), Some("2001"));
    }

    #[test]
    fn increment_rejects_non_numeric() {
        let mut tree = parse(r#"{"n":"abc"}"#);
        let err = apply(
            &mut tree,
            &Statement::Increment {
                path: TreePath::key("n"),
            },
        )
        .expect_err("not a counter");
        assert!(matches!(err, ApplyError::NotACounter { .. }));
    }

    #[test]
    fn remove_leaves_a_gap_like_unset() {
        let mut tree = parse(r#"{"rule":[{"t":"a"},{"t":"b"},{"t":"c"},{"t":"d"}]}"#);
        let rule = TreePath::key("rule");
        apply(&mut tree, &Statement::Remove { path: rule.index(3) }).expect("last");
        assert_eq!(tree, parse(r#"{"rule":[{"t":"a"},{"t":"b"},{"t":"c"}]}"#));

        apply(&mut tree, &Statement::Remove { path: rule.index(1) }).expect("middle");
        assert_eq!(tree, parse(r#"{"rule":{"0":{"t":"a"},"2":{"t":"c"}}}"#));

        // later positions keep addressing the same records
        apply(&mut tree, &Statement::Remove { path: rule.index(2) }).expect("after gap");
        assert_eq!(tree, parse(r#"{"rule":[{"t":"a"}]}"#));
    }

    #[test]
    fn remove_missing_entry_is_a_no_op() {
        let mut tree = parse(r#"{"cert":[{"refid":"a"}]}"#);
        let before = tree.clone();
        apply(
            &mut tree,
            &Statement::Remove {
                path: TreePath::key("cert").index(5),
            },
        )
        .expect("apply");
        assert_eq!(tree, before);
    }
}
