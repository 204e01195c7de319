//! Declarative reconciliation of pfSense configuration.
//!
//! Each operation reads the sections it manages from the firewall, compares
//! them with the desired state, and commits the smallest set of statements
//! that closes the gap. A dry run stops after planning and predicts the
//! post-state instead.
//!
//! # Architecture
//!
//! - [`remote`]: fetch and commit through the developer shell ([`transport`],
//!   [`target`]), or against an in-memory snapshot
//! - [`ops`]: one planner per managed section
//! - [`validate`]: field classes every interpolated value must satisfy
//! - [`php`]: the single encoder from statements to shell text
//! - [`commit`]: dry-run prediction, optional stale guard, commit and re-read
//! - [`catalog`]: list tags and record-list hints
//! - [`report`]: terminal rendering
//!
//! Generic tree handling, locating, diffing and statement application live in
//! `config-tree-core`.
//!
//! # Examples
//!
//! ```ignore
//! use config_tree_core::parse_file;
//! use pfsense_reconcile::catalog::LIST_TAGS;
//! use pfsense_reconcile::commit::RunOptions;
//! use pfsense_reconcile::ops::{run, Operation};
//! use pfsense_reconcile::params::load_params;
//! use pfsense_reconcile::remote::MemoryAccessor;
//!
//! let snapshot = MemoryAccessor::snapshot(parse_file("config.xml".as_ref(), LIST_TAGS)?);
//! let alias = Operation::Alias(load_params("alias.toml".as_ref())?);
//! let outcome = run(&snapshot, &alias, RunOptions { dry_run: true, ..Default::default() })?;
//! println!("{}", outcome.generated_statements);
//! ```

pub mod catalog;
pub mod commit;
pub mod error;
pub mod ops;
pub mod params;
pub mod php;
pub mod remote;
pub mod report;
pub mod target;
pub mod transport;
pub mod validate;
