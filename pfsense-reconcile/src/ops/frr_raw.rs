use config_tree_core::{ConfigTree, Presence, Statement, TreePath};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::ops::uniqid;
use crate::php::{Directive, Service};
use crate::validate::{FieldClass, FieldValidator};

const DAEMONS: [&str; 4] = ["zebra", "bgpd", "ospfd", "ospf6d"];

/// Raw FRR daemon configurations, each base64 encoded.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrrRawParams {
    #[serde(default)]
    pub state: Presence,
    pub zebra: Option<String>,
    pub bgpd: Option<String>,
    pub ospfd: Option<String>,
    pub ospf6d: Option<String>,
}

impl FrrRawParams {
    fn daemons(&self) -> [(&'static str, Option<&str>); 4] {
        [
            (DAEMONS[0], self.zebra.as_deref()),
            (DAEMONS[1], self.bgpd.as_deref()),
            (DAEMONS[2], self.ospfd.as_deref()),
            (DAEMONS[3], self.ospf6d.as_deref()),
        ]
    }
}

pub fn plan(mut view: LiveView<'_>, params: &FrrRawParams) -> Result<Change, ReconcileError> {
    let provided: Vec<(&str, &str)> = params
        .daemons()
        .into_iter()
        .filter_map(|(daemon, raw)| raw.map(|raw| (daemon, raw)))
        .collect();
    if provided.is_empty() {
        return Err(ReconcileError::validation(
            DAEMONS.join("|"),
            "at least one daemon configuration is required",
        ));
    }

    let include = view.access().target().frr_include.clone();
    if !view.file_exists(&include)? {
        return Err(ReconcileError::Precondition(format!(
            "pfsense-pkg-frr package not installed ({include} missing)"
        )));
    }

    let validator = FieldValidator::new().with_all(&DAEMONS, FieldClass::Base64);
    for (daemon, raw) in &provided {
        validator.check(daemon, raw)?;
    }

    let packages_path = TreePath::key("installedpackages");
    let raw_path = packages_path.child("frrglobalraw");
    let entry = raw_path.child("config").index(0);
    let packages = view.fetch(&packages_path)?;
    let live = packages.at(&TreePath::key("frrglobalraw").child("config").index(0));

    let mut statements = Vec::new();
    match params.state {
        Presence::Present => {
            for (daemon, raw) in &provided {
                if live.get_str(daemon) != Some(*raw) {
                    statements.push(Statement::set(entry.child(*daemon), *raw));
                }
            }
        }
        Presence::Absent => {
            if !live.is_absent() {
                statements.push(Statement::Remove { path: entry });
            }
        }
    }

    let mut change = view.change();
    if !statements.is_empty() {
        change.extend(statements);
        change.extend(gui_reset(&packages_path));
        change.post.push(
            Directive::Reconfigure {
                service: Service::Frr,
            }
            .into(),
        );
    }
    change.report("frrglobalraw", raw_path);
    Ok(change)
}

/// Replace the GUI-managed FRR settings so the raw configuration wins.
fn gui_reset(packages: &TreePath) -> Vec<Statement> {
    let enabled = || ConfigTree::from_pairs([("enable", ConfigTree::scalar("on"))]);
    let mut frr = enabled();
    frr.insert("password", ConfigTree::scalar(uniqid()));
    vec![
        Statement::Remove {
            path: packages.child("frr"),
        },
        Statement::Remove {
            path: packages.child("frrbgp"),
        },
        Statement::set(packages.child("frrbgp").child("config"), enabled()),
        Statement::set(packages.child("frr").child("config"), frr),
    ]
}

#[cfg(test)]
mod tests {
    use config_tree_core::{Statement, TreePath};
    use pretty_assertions::assert_eq;

    use super::{plan, FrrRawParams};
    use crate::commit::{commit_change, LiveView, RunOptions};
    use crate::error::ReconcileError;
    use crate::php::{Directive, Service, Step};
    use crate::remote::MemoryAccessor;

    const FRR_INC: &str = "/usr/local/pkg/frr.inc";

    fn params(toml_src: &str) -> FrrRawParams {
        toml::from_str(toml_src).expect("params")
    }

    fn firewall() -> MemoryAccessor {
        MemoryAccessor::writable(
            serde_json::from_str(
                r#"{"installedpackages":{"frrglobalraw":{"config":[{"zebra":"aG9zdG5hbWUgZncx"}]}}}"#,
            )
            .expect("json"),
        )
        .with_file(FRR_INC)
    }

    #[test]
    fn missing_package_is_a_precondition_failure() {
        let access = MemoryAccessor::writable(
            serde_json::from_str(r#"{"installedpackages":""}"#).expect("json"),
        );
        let err = plan(LiveView::new(&access), &params("bgpd = \"cm91dGVy\"\n")).expect_err("no frr");
        assert!(matches!(err, ReconcileError::Precondition(_)));
    }

    #[test]
    fn at_least_one_daemon_is_required() {
        let access = firewall();
        let err = plan(LiveView::new(&access), &params("state = \"present\"\n")).expect_err("empty");
        assert!(matches!(err, ReconcileError::Validation { .. }));
    }

    #[test]
    fn changed_daemon_resets_gui_and_regenerates() {
        let access = firewall();
        let change = plan(
            LiveView::new(&access),
            &params("zebra = \"aG9zdG5hbWUgZncx\"\nbgpd = \"cm91dGVyIGJncCA2NTAwMQ==\"\n"),
        )
        .expect("plan");
        let paths: Vec<String> = change.statements().map(|s| s.path().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "installedpackages.frrglobalraw.config[0].bgpd",
                "installedpackages.frr",
                "installedpackages.frrbgp",
                "installedpackages.frrbgp.config",
                "installedpackages.frr.config",
            ]
        );
        assert_eq!(
            change.post,
            vec![Step::Call(Directive::Reconfigure {
                service: Service::Frr
            })]
        );

        commit_change(&access, change, RunOptions::default()).expect("commit");
        let tree = access.tree();
        let frr = tree.at(&TreePath::key("installedpackages").child("frr").child("config"));
        assert_eq!(frr.get_str("enable"), Some("on"));
        assert!(frr.get_str("password").is_some());
    }

    #[test]
    fn unchanged_raw_config_plans_nothing() {
        let access = firewall();
        let change = plan(LiveView::new(&access), &params("zebra = \"aG9zdG5hbWUgZncx\"\n"))
            .expect("plan");
        assert!(change.is_empty());
    }

    #[test]
    fn absent_removes_raw_entry() {
        let access = firewall();
        let change = plan(
            LiveView::new(&access),
            &params("state = \"absent\"\nzebra = \"\"\n"),
        )
        .expect("plan");
        assert_eq!(
            change.statements().next(),
            Some(&Statement::Remove {
                path: "installedpackages.frrglobalraw.config[0]".parse().expect("path")
            })
        );
    }
}
