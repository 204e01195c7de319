use serde::Serialize;
use tracing::warn;

use crate::tree::ConfigTree;

/// Result of looking up a record by its identity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "match", content = "position", rename_all = "lowercase")]
pub enum MatchIndex {
    /// Position of the first matching record.
    Found(usize),
    /// No record carries the identity value.
    Unresolved,
}

impl MatchIndex {
    pub fn position(self) -> Option<usize> {
        match self {
            MatchIndex::Found(position) => Some(position),
            MatchIndex::Unresolved => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, MatchIndex::Found(_))
    }
}

/// List-shaped view of a record list: `(position, record)` pairs.
///
/// Sequences yield their positions. Mappings whose keys are all non-negative
/// integers (a list the remote side has removed entries from) yield those keys.
/// Anything else yields nothing.
pub fn record_entries(records: &ConfigTree) -> Vec<(usize, &ConfigTree)> {
    match records {
        ConfigTree::Sequence(items) => items.iter().enumerate().collect(),
        ConfigTree::Mapping(entries) => {
            let parsed: Option<Vec<(usize, &ConfigTree)>> = entries
                .iter()
                .map(|(key, value)| key.parse::<usize>().ok().map(|pos| (pos, value)))
                .collect();
            parsed.unwrap_or_default()
        }
        ConfigTree::Scalar(_) | ConfigTree::Absent => Vec::new(),
    }
}

/// Return the record stored at `position`.
pub fn record_at(records: &ConfigTree, position: usize) -> Option<&ConfigTree> {
    record_entries(records)
        .into_iter()
        .find(|(pos, _)| *pos == position)
        .map(|(_, record)| record)
}

/// Every position whose `field` equals `value`, in list order.
pub fn locate_all(records: &ConfigTree, field: &str, value: &str) -> Vec<usize> {
    record_entries(records)
        .into_iter()
        .filter(|(_, record)| record.get_str(field) == Some(value))
        .map(|(pos, _)| pos)
        .collect()
}

/// Find the first record whose `field` equals `value` (string equality).
///
/// Duplicate identities are not an error; the first one wins and a warning
/// names every candidate.
pub fn locate(records: &ConfigTree, field: &str, value: &str) -> MatchIndex {
    let matches = locate_all(records, field, value);
    if matches.len() > 1 {
        warn!(
            identity = field,
            value,
            positions = ?matches,
            "duplicate record identity, using the first match"
        );
    }
    matches
        .first()
        .copied()
        .map_or(MatchIndex::Unresolved, MatchIndex::Found)
}
