//! Reading and writing the live configuration.

use std::cell::RefCell;
use std::collections::BTreeSet;

use config_tree_core::{apply_all, parse_json, ConfigTree, TreePath};
use tracing::{debug, info};

use crate::error::ReconcileError;
use crate::php::{self, Step};
use crate::target::RemoteTarget;
use crate::transport::Transport;

/// Access to a firewall's `$config`.
pub trait ConfigAccess {
    /// Fail unless the target looks like a pfSense host.
    fn check_preconditions(&self) -> Result<(), ReconcileError>;

    /// Fetch the subtree at `path`. The root path fetches everything.
    fn fetch(&self, path: &TreePath) -> Result<ConfigTree, ReconcileError>;

    /// Run `steps`, then `post`, then persist the configuration.
    fn commit(&self, steps: &[Step], post: &[Step]) -> Result<(), ReconcileError>;

    /// Whether a file exists on the firewall.
    fn file_exists(&self, path: &str) -> Result<bool, ReconcileError>;

    fn target(&self) -> &RemoteTarget;
}

/// Talks to `pfSsh.php` through a [`Transport`].
pub struct ShellAccessor<T> {
    target: RemoteTarget,
    transport: T,
}

impl<T: Transport> ShellAccessor<T> {
    pub fn new(target: RemoteTarget, transport: T) -> Self {
        Self { target, transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn run_shell(&self, action: &'static str, script: &str) -> Result<String, ReconcileError> {
        debug!(%action, script, "sending script");
        let out = self
            .transport
            .run(std::slice::from_ref(&self.target.shell_path), Some(script))?;
        if !out.success() {
            return Err(ReconcileError::Transport {
                action,
                status: out.status,
                stderr: out.stderr,
                stdout: out.stdout,
            });
        }
        Ok(out.stdout)
    }
}

impl<T: Transport> ConfigAccess for ShellAccessor<T> {
    fn check_preconditions(&self) -> Result<(), ReconcileError> {
        let uname = self
            .transport
            .run(&["uname".to_string(), "-s".to_string()], None)?;
        let platform = uname.stdout.trim();
        if !uname.success() || platform != self.target.platform {
            return Err(ReconcileError::Precondition(format!(
                "pfSense platform expected: {} found: {}",
                self.target.platform, platform
            )));
        }
        if !self.file_exists(&self.target.shell_path)? {
            return Err(ReconcileError::Precondition(format!(
                "pfSense shell not found at {}",
                self.target.shell_path
            )));
        }
        Ok(())
    }

    fn fetch(&self, path: &TreePath) -> Result<ConfigTree, ReconcileError> {
        let out = self.run_shell("reading config", &php::fetch_script(path))?;
        let payload = unframe(&out, &self.target)?;
        parse_json(payload.as_bytes()).map_err(|err| ReconcileError::Format {
            reason: err.to_string(),
            output: payload.to_string(),
        })
    }

    fn commit(&self, steps: &[Step], post: &[Step]) -> Result<(), ReconcileError> {
        let script = php::commit_script(steps, post);
        self.run_shell("writing config", &script)?;
        info!(steps = steps.len() + post.len(), "configuration written");
        Ok(())
    }

    fn file_exists(&self, path: &str) -> Result<bool, ReconcileError> {
        let argv = ["test".to_string(), "-f".to_string(), path.to_string()];
        Ok(self.transport.run(&argv, None)?.success())
    }

    fn target(&self) -> &RemoteTarget {
        &self.target
    }
}

/// Cut the payload out of the shell output.
fn unframe<'a>(out: &'a str, target: &RemoteTarget) -> Result<&'a str, ReconcileError> {
    let start = format!("\n{}\n", target.exec_marker);
    let end = format!("\n{}", target.exit_marker);
    let missing = |marker: &str| ReconcileError::Format {
        reason: format!("marker {marker:?} not found"),
        output: out.to_string(),
    };
    let from = out.find(&start).ok_or_else(|| missing(&target.exec_marker))? + start.len();
    let len = out[from..]
        .find(&end)
        .ok_or_else(|| missing(&target.exit_marker))?;
    Ok(out[from..from + len].trim())
}

/// An in-memory configuration, loaded from a snapshot or built by tests.
///
/// A read-only accessor refuses commits with [`ReconcileError::Snapshot`]; a
/// writable one applies statements to its tree and records the script text.
pub struct MemoryAccessor {
    target: RemoteTarget,
    tree: RefCell<ConfigTree>,
    files: BTreeSet<String>,
    writable: bool,
    commits: RefCell<Vec<String>>,
}

impl MemoryAccessor {
    /// Read-only view of `tree`.
    pub fn snapshot(tree: ConfigTree) -> Self {
        let target = RemoteTarget::default();
        let mut files = BTreeSet::from([target.shell_path.clone()]);
        if has_package(&tree, "frr") {
            files.insert(target.frr_include.clone());
        }
        Self {
            target,
            tree: RefCell::new(tree),
            files,
            writable: false,
            commits: RefCell::new(Vec::new()),
        }
    }

    /// Mutable in-memory firewall.
    pub fn writable(tree: ConfigTree) -> Self {
        Self {
            writable: true,
            ..Self::snapshot(tree)
        }
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.insert(path.into());
        self
    }

    /// Scripts committed so far.
    pub fn commits(&self) -> Vec<String> {
        self.commits.borrow().clone()
    }

    pub fn tree(&self) -> ConfigTree {
        self.tree.borrow().clone()
    }

    /// Replace part of the tree behind the planner's back.
    pub fn poke(&self, path: &TreePath, value: ConfigTree) -> Result<(), ReconcileError> {
        let set = config_tree_core::Statement::Set {
            path: path.clone(),
            value,
        };
        apply_all(&mut self.tree.borrow_mut(), [&set])?;
        Ok(())
    }
}

impl ConfigAccess for MemoryAccessor {
    fn check_preconditions(&self) -> Result<(), ReconcileError> {
        Ok(())
    }

    fn fetch(&self, path: &TreePath) -> Result<ConfigTree, ReconcileError> {
        Ok(self.tree.borrow().at(path).clone())
    }

    fn commit(&self, steps: &[Step], post: &[Step]) -> Result<(), ReconcileError> {
        if !self.writable {
            return Err(ReconcileError::Snapshot);
        }
        let statements = steps.iter().chain(post).filter_map(Step::statement);
        apply_all(&mut self.tree.borrow_mut(), statements)?;
        self.commits
            .borrow_mut()
            .push(php::commit_script(steps, post));
        Ok(())
    }

    fn file_exists(&self, path: &str) -> Result<bool, ReconcileError> {
        Ok(self.files.contains(path))
    }

    fn target(&self) -> &RemoteTarget {
        &self.target
    }
}

fn has_package(tree: &ConfigTree, name: &str) -> bool {
    let packages = tree.at(&TreePath::key("installedpackages").child("package"));
    let listed = match packages {
        ConfigTree::Sequence(items) => items.iter().collect::<Vec<_>>(),
        ConfigTree::Mapping(_) => vec![packages],
        _ => Vec::new(),
    };
    listed.iter().any(|package| {
        package
            .get_str("name")
            .is_some_and(|n| n.eq_ignore_ascii_case(name))
    })
}
