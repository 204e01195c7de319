//! PHP encoding for the pfSense developer shell.
//!
//! This is the only place that produces shell text. Every key and string goes
//! through [`quote`], so a value can never terminate its literal no matter what
//! the validators let through. The shell reads its input line by line and acts
//! on a bare `exec` or `exit` line, so no encoded value ever contains a raw
//! line break either.

use std::fmt::Write as _;

use config_tree_core::{ConfigTree, Segment, Statement, TreePath};
use serde::{Deserialize, Serialize};

/// A service that can be reconfigured after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Interfaces,
    Hostname,
    Hosts,
    Resolv,
    Timezone,
    Ntp,
    ReloadDns,
    Snmp,
    Filter,
    Hasync,
    Dnsmasq,
    Unbound,
    RestartWebgui,
    Frr,
}

impl Service {
    pub const ALL: [Service; 14] = [
        Service::Interfaces,
        Service::Hostname,
        Service::Hosts,
        Service::Resolv,
        Service::Timezone,
        Service::Ntp,
        Service::ReloadDns,
        Service::Snmp,
        Service::Filter,
        Service::Hasync,
        Service::Dnsmasq,
        Service::Unbound,
        Service::RestartWebgui,
        Service::Frr,
    ];
}

/// Subsystems with a pending-changes flag in the web GUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Filter,
}

impl Subsystem {
    fn name(self) -> &'static str {
        match self {
            Subsystem::Filter => "filter",
        }
    }
}

/// A named pfSense function call. The set is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Directive {
    /// Save `$config` to `config.xml`.
    Persist,
    MarkDirty { subsystem: Subsystem },
    /// Hash `password` into the user record at `user`.
    SetUserPassword { user: TreePath, password: String },
    /// Push the user record at `user` to the operating system.
    SyncUser { user: TreePath },
    Reconfigure { service: Service },
}

/// One line of a commit script.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Step {
    Mutate(Statement),
    Call(Directive),
}

impl Step {
    pub fn statement(&self) -> Option<&Statement> {
        match self {
            Step::Mutate(statement) => Some(statement),
            Step::Call(_) => None,
        }
    }
}

impl From<Statement> for Step {
    fn from(statement: Statement) -> Self {
        Step::Mutate(statement)
    }
}

impl From<Directive> for Step {
    fn from(directive: Directive) -> Self {
        Step::Call(directive)
    }
}

/// Encode a single-quoted PHP string literal.
///
/// Line breaks are spliced in as double-quoted escapes (`'a'."\n".'b'`) so the
/// encoded text always stays on one line.
pub fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        match c {
            '\'' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("'.\"\\n\".'"),
            '\r' => out.push_str("'.\"\\r\".'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Encode a tree path as a `$config` lvalue.
pub fn path(path: &TreePath) -> String {
    let mut out = String::from("$config");
    for segment in path.segments() {
        match segment {
            Segment::Key(key) => {
                let _ = write!(out, "[{}]", quote(key));
            }
            Segment::Index(index) => {
                let _ = write!(out, "[{index}]");
            }
        }
    }
    out
}

/// Encode a value as a PHP literal. Mappings and sequences become arrays.
pub fn value(tree: &ConfigTree) -> String {
    match tree {
        ConfigTree::Scalar(raw) => quote(raw),
        ConfigTree::Absent => "null".to_string(),
        ConfigTree::Sequence(items) => {
            let inner: Vec<String> = items.iter().map(value).collect();
            format!("[{}]", inner.join(", "))
        }
        ConfigTree::Mapping(entries) => {
            let inner: Vec<String> = entries
                .iter()
                .map(|(key, item)| format!("{} => {}", quote(key), value(item)))
                .collect();
            format!("[{}]", inner.join(", "))
        }
    }
}

pub fn statement(statement: &Statement) -> String {
    match statement {
        Statement::Set { path: target, value: v } => format!("{} = {};", path(target), value(v)),
        Statement::Append { path: target, value: v } => {
            format!("{}[] = {};", path(target), value(v))
        }
        Statement::Remove { path: target } => format!("unset({});", path(target)),
        Statement::Increment { path: target } => format!("{}++;", path(target)),
        Statement::InitContainer { path: target } => {
            let lvalue = path(target);
            format!("if (empty({lvalue})) {lvalue} = [];")
        }
    }
}

pub fn directive(directive: &Directive) -> String {
    match directive {
        Directive::Persist => "write_config();".to_string(),
        Directive::MarkDirty { subsystem } => {
            format!("mark_subsystem_dirty({});", quote(subsystem.name()))
        }
        Directive::SetUserPassword { user, password } => {
            format!("local_user_set_password({}, {});", path(user), quote(password))
        }
        Directive::SyncUser { user } => format!("local_user_set({});", path(user)),
        Directive::Reconfigure { service } => reconfigure(*service).to_string(),
    }
}

fn reconfigure(service: Service) -> &'static str {
    match service {
        Service::Interfaces => "interfaces_configure();",
        Service::Hostname => "system_hostname_configure();",
        Service::Hosts => "system_hosts_generate();",
        Service::Resolv => "system_resolvconf_generate();",
        Service::Timezone => "system_timezone_configure();",
        Service::Ntp => "system_ntp_configure();",
        Service::ReloadDns => "send_event('service reload dns');",
        Service::Snmp => "services_snmpd_configure();",
        Service::Filter => {
            "require_once('filter.inc'); filter_configure(); clear_subsystem_dirty('filter');"
        }
        Service::Hasync => "interfaces_sync_setup();",
        Service::Dnsmasq => "services_dnsmasq_configure();",
        Service::Unbound => "services_unbound_configure();",
        Service::RestartWebgui => "system_webgui_start();",
        Service::Frr => "include('/usr/local/pkg/frr.inc'); frr_generate_config();",
    }
}

pub fn step(step: &Step) -> String {
    match step {
        Step::Mutate(s) => statement(s),
        Step::Call(d) => directive(d),
    }
}

/// Encode steps one per line.
pub fn lines(steps: &[Step]) -> String {
    steps.iter().map(step).collect::<Vec<_>>().join("\n")
}

/// Script that prints the subtree at `target` as JSON between the shell markers.
pub fn fetch_script(target: &TreePath) -> String {
    format!(
        "echo \"\\n\".json_encode({}).\"\\n\";\nexec\nexit\n",
        path(target)
    )
}

/// Script that runs `steps`, then `post`, then persists.
pub fn commit_script(steps: &[Step], post: &[Step]) -> String {
    let mut out = String::new();
    for line in steps.iter().chain(post).map(step) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&directive(&Directive::Persist));
    out.push_str("\nexec\nexit\n");
    out
}
