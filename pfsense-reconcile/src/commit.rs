use std::collections::BTreeMap;

use config_tree_core::{apply_all, ConfigTree, Statement, TreePath};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ReconcileError;
use crate::php::{self, Step};
use crate::remote::ConfigAccess;

/// Records every fetch made while planning.
pub struct LiveView<'a> {
    access: &'a dyn ConfigAccess,
    reads: Vec<(TreePath, ConfigTree)>,
}

impl<'a> LiveView<'a> {
    pub fn new(access: &'a dyn ConfigAccess) -> Self {
        Self {
            access,
            reads: Vec::new(),
        }
    }

    /// Fetch `path`, reusing an earlier read of the same path.
    pub fn fetch(&mut self, path: &TreePath) -> Result<ConfigTree, ReconcileError> {
        if let Some((_, tree)) = self.reads.iter().find(|(p, _)| p == path) {
            return Ok(tree.clone());
        }
        let tree = self.access.fetch(path)?;
        self.reads.push((path.clone(), tree.clone()));
        Ok(tree)
    }

    pub fn file_exists(&self, path: &str) -> Result<bool, ReconcileError> {
        self.access.file_exists(path)
    }

    pub fn access(&self) -> &'a dyn ConfigAccess {
        self.access
    }

    /// Start a change that carries the reads made so far.
    pub fn change(self) -> Change {
        Change {
            reads: self.reads,
            ..Change::default()
        }
    }
}

/// A planned change and what to report afterwards.
#[derive(Debug, Clone, Default)]
pub struct Change {
    /// Live state the plan was computed from.
    pub reads: Vec<(TreePath, ConfigTree)>,
    pub steps: Vec<Step>,
    /// Steps that run after `steps`, before persisting.
    pub post: Vec<Step>,
    /// Sections returned in the outcome, by report name.
    pub report: Vec<(String, TreePath)>,
    pub extras: BTreeMap<String, ConfigTree>,
}

impl Change {
    pub fn push(&mut self, step: impl Into<Step>) {
        self.steps.push(step.into());
    }

    pub fn extend<I>(&mut self, statements: I)
    where
        I: IntoIterator<Item = Statement>,
    {
        self.steps.extend(statements.into_iter().map(Step::Mutate));
    }

    pub fn report(&mut self, name: &str, path: TreePath) {
        self.report.push((name.to_string(), path));
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.post.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.steps.iter().chain(&self.post).filter_map(Step::statement)
    }
}

/// How to run a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dry_run: bool,
    /// Re-read the planned sections before committing and refuse if they moved.
    pub stale_guard: bool,
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    pub changed: bool,
    pub dry_run: bool,
    /// Post-state (predicted on a dry run) of each reported section, plus extras.
    #[serde(flatten)]
    pub sections: BTreeMap<String, ConfigTree>,
    #[serde(rename = "generatedStatements")]
    pub generated_statements: String,
}

/// Commit `change` (or predict it on a dry run) and build the outcome.
pub fn commit_change(
    access: &dyn ConfigAccess,
    change: Change,
    options: RunOptions,
) -> Result<Outcome, ReconcileError> {
    let text = php::lines(&change.steps.iter().chain(&change.post).cloned().collect::<Vec<_>>());
    let changed = !change.is_empty();

    let mut sections = if options.dry_run || !changed {
        let mut scratch = ConfigTree::Absent;
        let seed: Vec<Statement> = change
            .reads
            .iter()
            .map(|(path, tree)| Statement::Set {
                path: path.clone(),
                value: tree.clone(),
            })
            .collect();
        apply_all(&mut scratch, &seed)?;
        apply_all(&mut scratch, change.statements())?;
        change
            .report
            .iter()
            .map(|(name, path)| (name.clone(), scratch.at(path).clone()))
            .collect::<BTreeMap<_, _>>()
    } else {
        if options.stale_guard {
            for (path, seen) in &change.reads {
                if access.fetch(path)? != *seen {
                    return Err(ReconcileError::ConcurrentModification {
                        section: path.clone(),
                    });
                }
            }
        }
        access.commit(&change.steps, &change.post)?;
        info!(steps = change.steps.len() + change.post.len(), "change committed");

        let mut fresh = BTreeMap::new();
        for (name, path) in &change.report {
            fresh.insert(name.clone(), access.fetch(path)?);
        }
        fresh
    };
    debug!(changed, dry_run = options.dry_run, "reconciliation finished");

    sections.extend(change.extras);
    Ok(Outcome {
        changed,
        dry_run: options.dry_run,
        sections,
        generated_statements: text,
    })
}
