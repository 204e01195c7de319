use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use config_tree_core::{parse_file, TreePath};
use pfsense_reconcile::catalog::LIST_TAGS;
use pfsense_reconcile::commit::RunOptions;
use pfsense_reconcile::ops::{self, Operation};
use pfsense_reconcile::params::load_params;
use pfsense_reconcile::remote::{ConfigAccess, MemoryAccessor, ShellAccessor};
use pfsense_reconcile::report::{render_outcome, render_tree};
use pfsense_reconcile::target::{default_target, load_target};
use pfsense_reconcile::transport::CommandTransport;
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, DumpArgs, OpArgs, OutputFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let access = open_access(cli.target.as_deref(), cli.snapshot.as_deref())?;
    let access = access.as_ref();

    match cli.command {
        Command::Config(args) => run_op(access, args, Operation::Config),
        Command::Alias(args) => run_op(access, args, Operation::Alias),
        Command::Authserver(args) => run_op(access, args, Operation::AuthServer),
        Command::Cert(args) => run_op(access, args, Operation::Cert),
        Command::Group(args) => run_op(access, args, Operation::Group),
        Command::Rule(args) => run_op(access, args, Operation::Rule),
        Command::RuleAudit(args) => run_op(access, args, Operation::RuleAudit),
        Command::Interface(args) => run_op(access, args, Operation::Interface),
        Command::Password(args) => run_op(access, args, Operation::Password),
        Command::Virtualip(args) => run_op(access, args, Operation::VirtualIp),
        Command::FrrRaw(args) => run_op(access, args, Operation::FrrRaw),
        Command::Apply(args) => run_op(access, args, Operation::Apply),
        Command::Dump(args) => run_dump(access, args),
    }
}

/// Logs go to stderr so JSON output stays parseable.
fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "pfsense_reconcile=warn",
        1 => "pfsense_reconcile=debug",
        _ => "pfsense_reconcile=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(level.parse()?)
                .add_directive(level.replace("pfsense_reconcile", "config_tree_core").parse()?),
        )
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn open_access(target: Option<&Path>, snapshot: Option<&Path>) -> Result<Box<dyn ConfigAccess>> {
    if let Some(path) = snapshot {
        let tree = parse_file(path, LIST_TAGS)
            .with_context(|| format!("failed to load snapshot {}", path.display()))?;
        return Ok(Box::new(MemoryAccessor::snapshot(tree)));
    }

    let target = match target {
        Some(path) => load_target(path)?,
        None => default_target(),
    };
    let transport = CommandTransport::new(target.launcher.clone());
    Ok(Box::new(ShellAccessor::new(target, transport)))
}

fn run_op<P: DeserializeOwned>(
    access: &dyn ConfigAccess,
    args: OpArgs,
    wrap: fn(P) -> Operation,
) -> Result<()> {
    let params = load_params(&args.params)?;
    let operation = wrap(params);
    let options = RunOptions {
        dry_run: args.dry_run,
        stale_guard: args.stale_guard,
    };

    let outcome = ops::run(access, &operation, options)
        .with_context(|| format!("{} failed", operation.name()))?;

    match args.format {
        OutputFormat::Text => println!("{}", render_outcome(operation.name(), &outcome)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
    }
    Ok(())
}

fn run_dump(access: &dyn ConfigAccess, args: DumpArgs) -> Result<()> {
    let path = match &args.path {
        Some(raw) => raw
            .parse::<TreePath>()
            .with_context(|| format!("invalid path {raw}"))?,
        None => TreePath::root(),
    };
    access.check_preconditions()?;
    let tree = access
        .fetch(&path)
        .with_context(|| format!("failed to read {path}"))?;

    match args.format {
        OutputFormat::Text => println!("{tree}"),
        OutputFormat::Json => println!("{}", render_tree(&tree)),
    }
    Ok(())
}
