use config_tree_core::{
    plan_record, ConfigTree, FieldRule, Presence, RecordSchema, Shape, TreePath,
};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::php::{Directive, Subsystem};
use crate::validate::{FieldClass, FieldValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    #[default]
    Pass,
    Block,
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpProtocol {
    #[default]
    Inet,
    Inet6,
    Inet46,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Any,
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum StateType {
    #[default]
    #[serde(rename = "keep state")]
    Keep,
    #[serde(rename = "sloppy state")]
    Sloppy,
    #[serde(rename = "synproxy state")]
    Synproxy,
    #[serde(rename = "none")]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    #[serde(rename = "tcp/udp")]
    TcpUdp,
    Icmp,
    Esp,
    Ah,
    Gre,
    Ipv6,
    Igmp,
    Ospf,
    Any,
    Carp,
    Pfsync,
}

impl RuleAction {
    fn as_str(self) -> &'static str {
        match self {
            RuleAction::Pass => "pass",
            RuleAction::Block => "block",
            RuleAction::Reject => "reject",
        }
    }
}

impl IpProtocol {
    fn as_str(self) -> &'static str {
        match self {
            IpProtocol::Inet => "inet",
            IpProtocol::Inet6 => "inet6",
            IpProtocol::Inet46 => "inet46",
        }
    }
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Any => "any",
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl StateType {
    fn as_str(self) -> &'static str {
        match self {
            StateType::Keep => "keep state",
            StateType::Sloppy => "sloppy state",
            StateType::Synproxy => "synproxy state",
            StateType::None => "none",
        }
    }
}

impl Protocol {
    fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::TcpUdp => "tcp/udp",
            Protocol::Icmp => "icmp",
            Protocol::Esp => "esp",
            Protocol::Ah => "ah",
            Protocol::Gre => "gre",
            Protocol::Ipv6 => "ipv6",
            Protocol::Igmp => "igmp",
            Protocol::Ospf => "ospf",
            Protocol::Any => "any",
            Protocol::Carp => "carp",
            Protocol::Pfsync => "pfsync",
        }
    }
}

/// A filter rule, correlated by its tracker.
///
/// `source` and `destination` are nested address specifications such as
/// `{ network = "lan" }` or `{ address = "10.0.0.1", port = "443" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleParams {
    #[serde(default)]
    pub state: Presence,
    #[serde(deserialize_with = "crate::params::text_or_number")]
    pub tracker: String,
    #[serde(default, rename = "type")]
    pub action: RuleAction,
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default)]
    pub ipprotocol: IpProtocol,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub statetype: StateType,
    pub protocol: Option<Protocol>,
    #[serde(default = "default_icmptype")]
    pub icmptype: String,
    pub descr: Option<String>,
    pub log: Option<String>,
    pub disabled: Option<String>,
    pub quick: Option<String>,
    pub floating: Option<String>,
    #[serde(default = "any_address")]
    pub source: ConfigTree,
    #[serde(default = "any_address")]
    pub destination: ConfigTree,
}

fn default_interface() -> String {
    "lan".to_string()
}

fn default_icmptype() -> String {
    "any".to_string()
}

fn any_address() -> ConfigTree {
    ConfigTree::from_pairs([("any", ConfigTree::scalar(""))])
}

impl RuleParams {
    fn desired(&self) -> ConfigTree {
        let mut record = ConfigTree::from_pairs([
            ("type", ConfigTree::scalar(self.action.as_str())),
            ("tracker", ConfigTree::scalar(&self.tracker)),
            ("ipprotocol", ConfigTree::scalar(self.ipprotocol.as_str())),
            ("interface", ConfigTree::scalar(&self.interface)),
            ("direction", ConfigTree::scalar(self.direction.as_str())),
            ("statetype", ConfigTree::scalar(self.statetype.as_str())),
        ]);
        let optional = [
            ("descr", self.descr.as_deref()),
            ("log", self.log.as_deref()),
            ("disabled", self.disabled.as_deref()),
            ("quick", self.quick.as_deref()),
            ("floating", self.floating.as_deref()),
            ("protocol", self.protocol.map(Protocol::as_str)),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                record.insert(key, ConfigTree::scalar(value));
            }
        }
        // icmptype only means something for ICMP rules.
        if matches!(self.protocol, None | Some(Protocol::Icmp)) {
            record.insert("icmptype", ConfigTree::scalar(&self.icmptype));
        }
        record.insert("source", self.source.clone());
        record.insert("destination", self.destination.clone());
        record
    }
}

pub fn plan(mut view: LiveView<'_>, params: &RuleParams) -> Result<Change, ReconcileError> {
    let section = TreePath::key("filter");
    let schema = RecordSchema::new(section.child("rule"), "tracker")
        .with_field(FieldRule::composite("source"))
        .with_field(FieldRule::composite("destination"))
        .with_init_container(section.clone());
    let validator = FieldValidator::new()
        .with_all(&["tracker", "interface", "protocol", "icmptype"], FieldClass::Token);

    for (field, address) in [("source", &params.source), ("destination", &params.destination)] {
        if address.as_mapping().is_none() {
            return Err(ReconcileError::TypeMismatch {
                path: section.child("rule").child(field),
                expected: Shape::Mapping,
                found: address.shape(),
            });
        }
    }

    let filter = view.fetch(&section)?;
    let records = filter.get("rule").cloned().unwrap_or_default();
    let planned = plan_record(&schema, &records, &params.desired(), params.state, &validator)?;

    let mut change = view.change();
    let touched = !planned.statements.is_empty();
    change.extend(planned.statements);
    if touched {
        change.post.push(
            Directive::MarkDirty {
                subsystem: Subsystem::Filter,
            }
            .into(),
        );
    }
    change.report("filter_rules", section.child("rule"));
    Ok(change)
}
