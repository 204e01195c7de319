//! One module per managed section. Each plans a [`Change`] from live state.

pub mod alias;
pub mod authserver;
pub mod cert;
pub mod config;
pub mod frr_raw;
pub mod group;
pub mod interface;
pub mod password;
pub mod rule;
pub mod rule_audit;
pub mod services;
pub mod virtualip;

use std::time::{SystemTime, UNIX_EPOCH};

use config_tree_core::ConfigTree;

use crate::commit::{commit_change, Change, LiveView, Outcome, RunOptions};
use crate::error::ReconcileError;
use crate::remote::ConfigAccess;

/// A reconciliation request.
#[derive(Debug, Clone)]
pub enum Operation {
    Config(config::ConfigParams),
    Alias(alias::AliasParams),
    AuthServer(authserver::AuthServerParams),
    Cert(cert::CertParams),
    Group(group::GroupParams),
    Rule(rule::RuleParams),
    RuleAudit(rule_audit::RuleAuditParams),
    Interface(interface::InterfaceParams),
    Password(password::PasswordParams),
    VirtualIp(virtualip::VirtualIpParams),
    FrrRaw(frr_raw::FrrRawParams),
    Apply(services::ApplyParams),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Config(_) => "config",
            Operation::Alias(_) => "alias",
            Operation::AuthServer(_) => "authserver",
            Operation::Cert(_) => "cert",
            Operation::Group(_) => "group",
            Operation::Rule(_) => "rule",
            Operation::RuleAudit(_) => "rule-audit",
            Operation::Interface(_) => "interface",
            Operation::Password(_) => "password",
            Operation::VirtualIp(_) => "virtualip",
            Operation::FrrRaw(_) => "frr-raw",
            Operation::Apply(_) => "apply",
        }
    }

    pub fn plan(&self, view: LiveView<'_>) -> Result<Change, ReconcileError> {
        match self {
            Operation::Config(params) => config::plan(view, params),
            Operation::Alias(params) => alias::plan(view, params),
            Operation::AuthServer(params) => authserver::plan(view, params),
            Operation::Cert(params) => cert::plan(view, params),
            Operation::Group(params) => group::plan(view, params),
            Operation::Rule(params) => rule::plan(view, params),
            Operation::RuleAudit(params) => rule_audit::plan(view, params),
            Operation::Interface(params) => interface::plan(view, params),
            Operation::Password(params) => password::plan(view, params),
            Operation::VirtualIp(params) => virtualip::plan(view, params),
            Operation::FrrRaw(params) => frr_raw::plan(view, params),
            Operation::Apply(params) => services::plan(view, params),
        }
    }
}

/// Check preconditions, plan, then commit or predict.
pub fn run(
    access: &dyn ConfigAccess,
    operation: &Operation,
    options: RunOptions,
) -> Result<Outcome, ReconcileError> {
    access.check_preconditions()?;
    let change = operation.plan(LiveView::new(access))?;
    tracing::debug!(
        operation = operation.name(),
        steps = change.steps.len(),
        post = change.post.len(),
        "planned"
    );
    commit_change(access, change, options)
}

/// Build a record from optional scalar fields, leaving out the missing ones.
pub(crate) fn record_of<'a, I>(fields: I) -> ConfigTree
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    ConfigTree::from_pairs(
        fields
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, ConfigTree::scalar(v)))),
    )
}

/// A PHP `uniqid()`-style identifier: seconds and microseconds in hex.
pub(crate) fn uniqid() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("{:08x}{:05x}", now.as_secs(), now.subsec_micros())
}
