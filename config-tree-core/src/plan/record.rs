use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::locate::{locate, record_at, MatchIndex};
use crate::path::TreePath;
use crate::plan::error::DiffError;
use crate::plan::guard::{guard_tree, ValueGuard};
use crate::statement::Statement;
use crate::tree::{ConfigTree, Shape};

/// How a record field decides whether it changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compare {
    /// String equality.
    #[default]
    Text,
    /// Unordered list equality; duplicates collapse.
    Set,
    /// Structural equality of nested values.
    Deep,
}

/// Comparison policy for one record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,
    pub compare: Compare,
    /// Composite fields are rewritten whole whenever any field of the record changes.
    pub composite: bool,
}

impl FieldRule {
    pub fn text(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compare: Compare::Text,
            composite: false,
        }
    }

    pub fn set(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compare: Compare::Set,
            composite: false,
        }
    }

    pub fn composite(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compare: Compare::Deep,
            composite: true,
        }
    }
}

/// Where a record list lives and how its records are correlated and compared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// Path of the list holding the records.
    pub list: TreePath,
    /// Field whose value is unique within the list.
    pub identity: String,
    /// Fields with a non-default comparison policy. Others compare as text.
    pub fields: Vec<FieldRule>,
    /// Container to initialise before the first record is appended to a vacant list.
    pub init_container: Option<TreePath>,
}

impl RecordSchema {
    pub fn new(list: TreePath, identity: impl Into<String>) -> Self {
        Self {
            list,
            identity: identity.into(),
            fields: Vec::new(),
            init_container: None,
        }
    }

    pub fn with_field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    pub fn with_init_container(mut self, path: TreePath) -> Self {
        self.init_container = Some(path);
        self
    }

    fn rule(&self, name: &str) -> FieldRule {
        self.fields
            .iter()
            .find(|rule| rule.name == name)
            .cloned()
            .unwrap_or_else(|| FieldRule::text(name))
    }
}

/// Whether a record should exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    #[default]
    Present,
    Absent,
}

/// Statements for one record plus where it was found.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPlan {
    pub index: MatchIndex,
    pub statements: Vec<Statement>,
}

impl RecordPlan {
    /// True when the plan appends a new record.
    pub fn creates(&self) -> bool {
        self.statements
            .iter()
            .any(|s| matches!(s, Statement::Append { .. }))
    }
}

/// Plan the statements that make `records` hold `desired` (or not hold it).
///
/// `desired` is a mapping that must carry the identity field. Absent values
/// are skipped, so optional fields that were not provided are left alone.
pub fn plan_record(
    schema: &RecordSchema,
    records: &ConfigTree,
    desired: &ConfigTree,
    presence: Presence,
    guard: &dyn ValueGuard,
) -> Result<RecordPlan, DiffError> {
    let Some(fields) = desired.as_mapping() else {
        return Err(DiffError::TypeMismatch {
            path: schema.list.clone(),
            expected: Shape::Mapping,
            found: desired.shape(),
        });
    };
    let identity_path = schema.list.child(schema.identity.as_str());
    let identity = desired.get(&schema.identity).unwrap_or(&ConfigTree::Absent);
    let Some(identity_value) = identity.as_scalar() else {
        return Err(DiffError::TypeMismatch {
            path: identity_path,
            expected: Shape::Scalar,
            found: identity.shape(),
        });
    };

    let index = locate(records, &schema.identity, identity_value);
    let mut statements = Vec::new();

    match (presence, index) {
        (Presence::Absent, MatchIndex::Found(pos)) => {
            statements.push(Statement::Remove {
                path: schema.list.index(pos),
            });
        }
        (Presence::Absent, MatchIndex::Unresolved) => {}
        (Presence::Present, MatchIndex::Unresolved) => {
            guard_tree(guard, &schema.list, &schema.identity, desired)?;
            if records.is_vacant() {
                if let Some(container) = &schema.init_container {
                    statements.push(Statement::InitContainer {
                        path: container.clone(),
                    });
                }
            }
            let record = ConfigTree::from_pairs(
                fields
                    .iter()
                    .filter(|(_, value)| !value.is_absent())
                    .map(|(key, value)| (key.clone(), value.clone())),
            );
            statements.push(Statement::Append {
                path: schema.list.clone(),
                value: record,
            });
        }
        (Presence::Present, MatchIndex::Found(pos)) => {
            let base = schema.list.index(pos);
            guard_tree(guard, &base, &schema.identity, desired)?;
            let live = record_at(records, pos).unwrap_or(&ConfigTree::Absent);

            let mut changed = Vec::new();
            for (name, want) in fields.iter().filter(|(_, v)| !v.is_absent()) {
                let rule = schema.rule(name);
                let path = base.child(name.as_str());
                if field_differs(&rule, &path, live.get(name), want)? {
                    changed.push(name.as_str());
                }
            }

            if !changed.is_empty() {
                for (name, want) in fields.iter().filter(|(_, v)| !v.is_absent()) {
                    let rule = schema.rule(name);
                    if rule.composite || changed.contains(&name.as_str()) {
                        statements.push(Statement::Set {
                            path: base.child(name.as_str()),
                            value: want.clone(),
                        });
                    }
                }
            }
        }
    }

    debug!(
        list = %schema.list,
        identity = identity_value,
        ?index,
        statements = statements.len(),
        "planned record"
    );
    Ok(RecordPlan { index, statements })
}

fn field_differs(
    rule: &FieldRule,
    path: &TreePath,
    have: Option<&ConfigTree>,
    want: &ConfigTree,
) -> Result<bool, DiffError> {
    let Some(have) = have.filter(|h| !h.is_absent()) else {
        return Ok(true);
    };
    match rule.compare {
        Compare::Text => match (have, want) {
            (ConfigTree::Scalar(a), ConfigTree::Scalar(b)) => Ok(a != b),
            (ConfigTree::Scalar(_), other) => Err(DiffError::TypeMismatch {
                path: path.clone(),
                expected: Shape::Scalar,
                found: other.shape(),
            }),
            (other, ConfigTree::Scalar(_)) => Err(DiffError::TypeMismatch {
                path: path.clone(),
                expected: Shape::Scalar,
                found: other.shape(),
            }),
            (ConfigTree::Sequence(have_items), ConfigTree::Sequence(want_items)) => {
                if have_items.len() != want_items.len() {
                    return Ok(true);
                }
                for (i, (h, w)) in have_items.iter().zip(want_items).enumerate() {
                    if field_differs(rule, &path.index(i), Some(h), w)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            (ConfigTree::Mapping(_), ConfigTree::Mapping(_)) => Ok(have != want),
            (other, want) => Err(DiffError::TypeMismatch {
                path: path.clone(),
                expected: want.shape(),
                found: other.shape(),
            }),
        },
        Compare::Set => {
            let want_set = want.scalar_set().ok_or_else(|| DiffError::TypeMismatch {
                path: path.clone(),
                expected: Shape::Sequence,
                found: want.shape(),
            })?;
            let have_set = have.scalar_set().ok_or_else(|| DiffError::TypeMismatch {
                path: path.clone(),
                expected: Shape::Sequence,
                found: have.shape(),
            })?;
            Ok(want_set != have_set)
        }
        Compare::Deep => Ok(have != want),
    }
}
