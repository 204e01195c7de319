use config_tree_core::{plan_section, ConfigTree, CreatePolicy, TreePath};
use serde::Deserialize;

use crate::catalog::{missing_key_hint, record_list_hint};
use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::validate::FieldValidator;

/// Flat values for top-level sections. Only sections that are given are touched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigParams {
    /// Refuse keys the live section does not already have.
    #[serde(default = "safe_mode_default")]
    pub safe_mode: bool,
    pub snmpd: Option<ConfigTree>,
    pub syslog: Option<ConfigTree>,
    pub system: Option<ConfigTree>,
    pub widgets: Option<ConfigTree>,
    pub hasync: Option<ConfigTree>,
    pub nat: Option<ConfigTree>,
    pub installedpackages: Option<ConfigTree>,
}

fn safe_mode_default() -> bool {
    true
}

impl ConfigParams {
    fn sections(&self) -> Vec<(&'static str, &ConfigTree)> {
        [
            ("snmpd", &self.snmpd),
            ("syslog", &self.syslog),
            ("system", &self.system),
            ("widgets", &self.widgets),
            ("hasync", &self.hasync),
            ("nat", &self.nat),
            ("installedpackages", &self.installedpackages),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
        .collect()
    }
}

pub fn plan(mut view: LiveView<'_>, params: &ConfigParams) -> Result<Change, ReconcileError> {
    let validator = FieldValidator::new();
    let policy = CreatePolicy {
        allow_create: !params.safe_mode,
        hint: Some(missing_key_hint),
    };

    let mut statements = Vec::new();
    let mut reported = Vec::new();
    for (name, desired) in params.sections() {
        let section = TreePath::key(name);
        for (key, _) in desired.as_mapping().unwrap_or_default() {
            if let Some(hint) = record_list_hint(key) {
                let path = section.child(key.as_str());
                return Err(ReconcileError::SchemaViolation {
                    message: format!("{path} cannot be set as a flat value ({hint})"),
                    path,
                });
            }
        }
        let live = view.fetch(&section)?;
        statements.extend(plan_section(&section, desired, &live, policy, &validator)?);
        reported.push((name, section));
    }

    let mut change = view.change();
    change.extend(statements);
    for (name, section) in reported {
        change.report(name, section);
    }
    Ok(change)
}
