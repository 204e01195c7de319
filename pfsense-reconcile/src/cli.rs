use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "pfsense-reconcile")]
#[command(about = "Converge pfSense configuration sections toward declarative desired state")]
pub struct Cli {
    /// Target description (TOML). Defaults to the local developer shell.
    #[arg(long, global = true)]
    pub target: Option<PathBuf>,
    /// Plan against a config.xml or JSON snapshot instead of a live firewall.
    #[arg(long, global = true)]
    pub snapshot: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Reconcile flat top-level sections (snmpd, syslog, system, ...).
    Config(OpArgs),
    /// Manage one firewall alias.
    Alias(OpArgs),
    /// Manage one LDAP or RADIUS authentication server.
    Authserver(OpArgs),
    /// Manage one certificate.
    Cert(OpArgs),
    /// Manage one user group.
    Group(OpArgs),
    /// Manage one filter rule by tracker.
    Rule(OpArgs),
    /// Report (or remove) filter rules missing from a desired list.
    RuleAudit(OpArgs),
    /// Configure one interface and optionally its gateway.
    Interface(OpArgs),
    /// Set a local user's password and SSH keys.
    Password(OpArgs),
    /// Manage one virtual IP.
    Virtualip(OpArgs),
    /// Install raw FRR daemon configuration.
    FrrRaw(OpArgs),
    /// Run service reconfiguration hooks.
    Apply(OpArgs),
    /// Print a section of the live (or snapshot) configuration.
    Dump(DumpArgs),
}

#[derive(Parser, Debug)]
pub struct OpArgs {
    /// Parameter file (TOML, or JSON with a .json extension).
    #[arg(long)]
    pub params: PathBuf,
    /// Plan and predict without writing.
    #[arg(long)]
    pub dry_run: bool,
    /// Refuse to commit if the planned sections changed since they were read.
    #[arg(long)]
    pub stale_guard: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Path such as `system.group[0]`. Omit for the whole tree.
    pub path: Option<String>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
