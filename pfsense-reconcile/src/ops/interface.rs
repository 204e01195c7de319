use config_tree_core::{plan_record, Presence, RecordSchema, Statement, TreePath};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::ops::record_of;
use crate::validate::{FieldClass, FieldValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceName {
    Wan,
    Lan,
    Opt1,
    Opt2,
}

impl InterfaceName {
    fn as_str(self) -> &'static str {
        match self {
            InterfaceName::Wan => "wan",
            InterfaceName::Lan => "lan",
            InterfaceName::Opt1 => "opt1",
            InterfaceName::Opt2 => "opt2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProtocol {
    #[default]
    Inet,
    Inet6,
}

impl GatewayProtocol {
    fn as_str(self) -> &'static str {
        match self {
            GatewayProtocol::Inet => "inet",
            GatewayProtocol::Inet6 => "inet6",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterfaceParams {
    pub name: InterfaceName,
    #[serde(default = "enabled")]
    pub enable: bool,
    pub ipaddr: Option<String>,
    #[serde(default, deserialize_with = "crate::params::optional_text_or_number")]
    pub subnet: Option<String>,
    pub descr: Option<String>,
    /// Gateway address. When given, a gateway record is kept in sync.
    pub gateway: Option<String>,
    #[serde(default = "default_gateway_name")]
    pub gateway_name: String,
    #[serde(default = "default_gateway_weight", deserialize_with = "crate::params::text_or_number")]
    pub gateway_weight: String,
    /// Address family of the gateway record.
    #[serde(default)]
    pub ipprotocol: GatewayProtocol,
}

fn enabled() -> bool {
    true
}

fn default_gateway_name() -> String {
    "Default_GW".to_string()
}

fn default_gateway_weight() -> String {
    "1".to_string()
}


pub fn plan(mut view: LiveView<'_>, params: &InterfaceParams) -> Result<Change, ReconcileError> {
    let interfaces_path = TreePath::key("interfaces");
    let gateways_path = TreePath::key("gateways");
    let name = params.name.as_str();
    let base = interfaces_path.child(name);
    let validator = FieldValidator::new()
        .with_all(&["ipaddr", "subnet", "gateway", "interface", "weight", "ipprotocol"], FieldClass::Token)
        .with("name", FieldClass::Name);

    let interfaces = view.fetch(&interfaces_path)?;
    let gateways = view.fetch(&gateways_path)?;
    let Some(live) = interfaces.get(name).filter(|iface| !iface.is_absent()) else {
        return Err(ReconcileError::NotFound(format!("interface {name}")));
    };

    let mut statements = Vec::new();
    let fields = [
        ("ipaddr", params.ipaddr.as_deref()),
        ("subnet", params.subnet.as_deref()),
        ("descr", params.descr.as_deref()),
    ];
    for (key, value) in fields {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            continue;
        };
        validator.check(key, value)?;
        if live.get_str(key) != Some(value) {
            statements.push(Statement::set(base.child(key), value));
        }
    }

    match (params.enable, live.contains_key("enable")) {
        (true, false) => statements.push(Statement::set(base.child("enable"), "")),
        (false, true) => {
            return Err(ReconcileError::Unsupported(format!(
                "disabling {name} would remove {}",
                base.child("enable")
            )))
        }
        _ => {}
    }

    if let Some(address) = &params.gateway {
        let schema = RecordSchema::new(gateways_path.child("gateway_item"), "name")
            .with_init_container(gateways_path.clone());
        let desired = record_of([
            ("interface", Some(name)),
            ("gateway", Some(address.as_str())),
            ("name", Some(params.gateway_name.as_str())),
            ("weight", Some(params.gateway_weight.as_str())),
            ("ipprotocol", Some(params.ipprotocol.as_str())),
        ]);
        let records = gateways.get("gateway_item").cloned().unwrap_or_default();
        let planned = plan_record(&schema, &records, &desired, Presence::Present, &validator)?;
        statements.extend(planned.statements);

        if live.get_str("gateway") != Some(params.gateway_name.as_str()) {
            statements.push(Statement::set(base.child("gateway"), params.gateway_name.as_str()));
        }
    }

    let mut change = view.change();
    change.extend(statements);
    change.report("interfaces", interfaces_path);
    change.report("gateways", gateways_path);
    Ok(change)
}

#[cfg(test)]
mod tests {
    use config_tree_core::{Statement, TreePath};
    use pretty_assertions::assert_eq;

    use super::{plan, GatewayProtocol, InterfaceParams};
    use crate::commit::{commit_change, LiveView, RunOptions};
    use crate::error::ReconcileError;
    use crate::remote::MemoryAccessor;

    fn firewall() -> MemoryAccessor {
        MemoryAccessor::writable(
            serde_json::from_str(
                r#"{
                    "interfaces":{
                        "wan":{"if":"vtnet0","enable":"","ipaddr":"dhcp"},
                        "lan":{"if":"vtnet1","ipaddr":"192.168.1.1","subnet":"24","descr":"LAN"}
                    },
                    "gateways":""
                }"#,
            )
            .expect("json"),
        )
    }

    fn params(toml_src: &str) -> InterfaceParams {
        toml::from_str(toml_src).expect("params")
    }

    #[test]
    fn missing_interface_is_not_found() {
        let access = firewall();
        let err = plan(LiveView::new(&access), &params("name = \"opt1\"\n")).expect_err("missing");
        assert!(matches!(err, ReconcileError::NotFound(_)));
    }

    #[test]
    fn enabling_sets_empty_flag() {
        let access = firewall();
        let change = plan(
            LiveView::new(&access),
            &params("name = \"lan\"\nipaddr = \"192.168.1.1\"\nsubnet = 24\n"),
        )
        .expect("plan");
        let statements: Vec<&Statement> = change.statements().collect();
        assert_eq!(
            statements,
            vec![&Statement::set("interfaces.lan.enable".parse().expect("path"), "")]
        );
    }

    #[test]
    fn gateway_family_is_limited_to_inet_and_inet6() {
        let v6 = params("name = \"wan\"\ngateway = \"2001:db8::1\"\nipprotocol = \"inet6\"\n");
        assert_eq!(v6.ipprotocol, GatewayProtocol::Inet6);
        assert!(toml::from_str::<InterfaceParams>("name = \"wan\"\nipprotocol = \"inet46\"\n").is_err());
    }

    #[test]
    fn disabling_is_unsupported() {
        let access = firewall();
        let err = plan(LiveView::new(&access), &params("name = \"wan\"\nenable = false\n"))
            .expect_err("disable");
        assert!(matches!(err, ReconcileError::Unsupported(_)));
    }

    #[test]
    fn gateway_record_is_created_and_linked() {
        let access = firewall();
        let request = params("name = \"wan\"\nipaddr = \"203.0.113.10\"\nsubnet = \"29\"\ngateway = \"203.0.113.9\"\n");
        let change = plan(LiveView::new(&access), &request).expect("plan");
        let paths: Vec<String> = change.statements().map(|s| s.path().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "interfaces.wan.ipaddr",
                "interfaces.wan.subnet",
                "gateways",
                "gateways.gateway_item",
                "interfaces.wan.gateway",
            ]
        );

        commit_change(&access, change, RunOptions::default()).expect("commit");
        let tree = access.tree();
        let gateway = tree.at(&TreePath::key("gateways").child("gateway_item").index(0));
        assert_eq!(gateway.get_str("gateway"), Some("203.0.113.9"));
        assert_eq!(gateway.get_str("interface"), Some("wan"));
        assert_eq!(gateway.get_str("ipprotocol"), Some("inet"));
        assert_eq!(gateway.get_str("weight"), Some("1"));

        let again = plan(LiveView::new(&access), &request).expect("replan");
        assert!(again.is_empty());
    }
}
