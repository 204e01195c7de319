use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where and how to reach the pfSense developer shell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteTarget {
    /// Path of `pfSsh.php` on the firewall.
    pub shell_path: String,
    /// Expected `uname -s` output.
    pub platform: String,
    /// Argument prefix for every command, e.g. `["ssh", "root@fw"]`. Empty runs locally.
    pub launcher: Vec<String>,
    pub exec_marker: String,
    pub exit_marker: String,
    /// Include file whose presence means the FRR package is installed.
    pub frr_include: String,
}

impl Default for RemoteTarget {
    fn default() -> Self {
        Self {
            shell_path: "/usr/local/sbin/pfSsh.php".to_string(),
            platform: "FreeBSD".to_string(),
            launcher: Vec::new(),
            exec_marker: "pfSense shell: exec".to_string(),
            exit_marker: "pfSense shell: exit".to_string(),
            frr_include: "/usr/local/pkg/frr.inc".to_string(),
        }
    }
}

/// Errors returned when loading target files.
#[derive(Debug, Error)]
pub enum TargetLoadError {
    #[error("failed to read target file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse target file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load a target description from a TOML file. Missing keys take their defaults.
pub fn load_target(path: &Path) -> Result<RemoteTarget, TargetLoadError> {
    let raw = fs::read_to_string(path).map_err(|source| TargetLoadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_target(&raw, path.display().to_string())
}

/// Built-in target for running on the firewall itself.
pub fn default_target() -> RemoteTarget {
    let embedded = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/targets/default.toml"));
    parse_target(embedded, "embedded target".to_string()).unwrap_or_default()
}

fn parse_target(raw: &str, path: String) -> Result<RemoteTarget, TargetLoadError> {
    toml::from_str(raw).map_err(|source| TargetLoadError::Parse { path, source })
}
