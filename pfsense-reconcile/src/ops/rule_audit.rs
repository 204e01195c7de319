use std::collections::BTreeSet;

use config_tree_core::{record_entries, ConfigTree, Presence, Statement, TreePath};
use serde::Deserialize;
use tracing::info;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::php::{Directive, Subsystem};

/// Trackers are often written as bare numbers in parameter files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Tracker {
    Number(u64),
    Text(String),
}

impl Tracker {
    fn as_text(&self) -> String {
        match self {
            Tracker::Number(n) => n.to_string(),
            Tracker::Text(s) => s.clone(),
        }
    }
}

/// One entry of the desired rule set. Other rule fields may be present and
/// are ignored, so the same list can drive both `rule` and `rule-audit`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditedRule {
    pub tracker: Tracker,
    #[serde(default)]
    pub state: Presence,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleAuditParams {
    pub rules: Vec<AuditedRule>,
    /// Remove unlisted rules instead of only reporting them.
    #[serde(default)]
    pub enforce: bool,
}

pub fn plan(mut view: LiveView<'_>, params: &RuleAuditParams) -> Result<Change, ReconcileError> {
    let list = TreePath::key("filter").child("rule");
    let wanted: BTreeSet<String> = params
        .rules
        .iter()
        .filter(|rule| rule.state == Presence::Present)
        .map(|rule| rule.tracker.as_text())
        .collect();

    let filter = view.fetch(&TreePath::key("filter"))?;
    let records = filter.get("rule").cloned().unwrap_or_default();

    let mut matched = 0usize;
    let mut unlisted = Vec::new();
    for (pos, rule) in record_entries(&records) {
        match rule.get_str("tracker") {
            Some(tracker) if wanted.contains(tracker) => matched += 1,
            _ => unlisted.push((pos, rule.clone())),
        }
    }
    if matched == 0 {
        let trackers: Vec<&str> = wanted.iter().map(String::as_str).collect();
        return Err(ReconcileError::NotFound(format!(
            "filter rule matching any of the trackers [{}]",
            trackers.join(", ")
        )));
    }
    info!(matched, unlisted = unlisted.len(), "filter rules audited");

    let mut change = view.change();
    if params.enforce && !unlisted.is_empty() {
        let mut positions: Vec<usize> = unlisted.iter().map(|(pos, _)| *pos).collect();
        positions.sort_unstable_by(|a, b| b.cmp(a));
        change.extend(
            positions
                .into_iter()
                .map(|pos| Statement::Remove { path: list.index(pos) }),
        );
        change.post.push(
            Directive::MarkDirty {
                subsystem: Subsystem::Filter,
            }
            .into(),
        );
    }
    change.extras.insert(
        "audit".to_string(),
        ConfigTree::Sequence(unlisted.into_iter().map(|(_, rule)| rule).collect()),
    );
    change.report("filter_rules", list);
    Ok(change)
}
