use config_tree_core::{locate, plan_record, Presence, RecordSchema, TreePath};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::ops::{record_of, uniqid};
use crate::validate::{FieldClass, FieldValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VipMode {
    #[default]
    Ipalias,
    Carp,
    Proxyarp,
    Other,
}

impl VipMode {
    fn as_str(self) -> &'static str {
        match self {
            VipMode::Ipalias => "ipalias",
            VipMode::Carp => "carp",
            VipMode::Proxyarp => "proxyarp",
            VipMode::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VipInterface {
    #[default]
    Lo0,
    Wan,
    Lan,
    Opt1,
    Opt2,
}

impl VipInterface {
    fn as_str(self) -> &'static str {
        match self {
            VipInterface::Lo0 => "lo0",
            VipInterface::Wan => "wan",
            VipInterface::Lan => "lan",
            VipInterface::Opt1 => "opt1",
            VipInterface::Opt2 => "opt2",
        }
    }
}

/// A virtual IP, found by `uniqid` when given and otherwise by `subnet`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VirtualIpParams {
    #[serde(default)]
    pub state: Presence,
    pub uniqid: Option<String>,
    #[serde(default)]
    pub mode: VipMode,
    #[serde(default = "default_type", rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub interface: VipInterface,
    #[serde(default)]
    pub descr: String,
    pub subnet: String,
    #[serde(default = "default_subnet_bits", deserialize_with = "crate::params::text_or_number")]
    pub subnet_bits: String,
}

fn default_type() -> String {
    "single".to_string()
}

fn default_subnet_bits() -> String {
    "32".to_string()
}

pub fn plan(mut view: LiveView<'_>, params: &VirtualIpParams) -> Result<Change, ReconcileError> {
    let section = TreePath::key("virtualip");
    let validator = FieldValidator::new().with_all(
        &["uniqid", "mode", "type", "interface", "subnet", "subnet_bits"],
        FieldClass::Token,
    );

    let live = view.fetch(&section)?;
    let records = live.get("vip").cloned().unwrap_or_default();

    let by_uniqid = params
        .uniqid
        .as_deref()
        .is_some_and(|id| locate(&records, "uniqid", id).is_resolved());
    let identity = if by_uniqid { "uniqid" } else { "subnet" };
    let creating = params.state == Presence::Present
        && !locate(&records, identity, identity_value(params, identity)).is_resolved();

    let uniqid_value = match &params.uniqid {
        Some(id) => Some(id.clone()),
        None if creating => Some(uniqid()),
        None => None,
    };

    let desired = record_of([
        ("mode", Some(params.mode.as_str())),
        ("type", Some(params.kind.as_str())),
        ("uniqid", uniqid_value.as_deref()),
        ("interface", Some(params.interface.as_str())),
        ("descr", Some(params.descr.as_str())),
        ("subnet", Some(params.subnet.as_str())),
        ("subnet_bits", Some(params.subnet_bits.as_str())),
    ]);
    let schema = RecordSchema::new(section.child("vip"), identity).with_init_container(section.clone());
    let planned = plan_record(&schema, &records, &desired, params.state, &validator)?;

    let mut change = view.change();
    change.extend(planned.statements);
    change.report("virtualip", section);
    Ok(change)
}

fn identity_value<'a>(params: &'a VirtualIpParams, identity: &str) -> &'a str {
    match (identity, params.uniqid.as_deref()) {
        ("uniqid", Some(id)) => id,
        _ => &params.subnet,
    }
}
