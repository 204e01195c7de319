use config_tree_core::{plan_record, Presence, RecordSchema, TreePath};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::ops::record_of;
use crate::validate::{FieldClass, FieldValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasType {
    Host,
    Network,
    Port,
    Url,
    UrlPorts,
    Urltable,
    UrltablePorts,
}

impl AliasType {
    fn as_str(self) -> &'static str {
        match self {
            AliasType::Host => "host",
            AliasType::Network => "network",
            AliasType::Port => "port",
            AliasType::Url => "url",
            AliasType::UrlPorts => "url_ports",
            AliasType::Urltable => "urltable",
            AliasType::UrltablePorts => "urltable_ports",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasParams {
    #[serde(default)]
    pub state: Presence,
    pub name: String,
    pub address: Option<String>,
    #[serde(default)]
    pub descr: String,
    #[serde(rename = "type")]
    pub kind: AliasType,
    pub detail: Option<String>,
}

pub fn plan(mut view: LiveView<'_>, params: &AliasParams) -> Result<Change, ReconcileError> {
    let section = TreePath::key("aliases");
    let schema = RecordSchema::new(section.child("alias"), "name").with_init_container(section.clone());
    let validator = FieldValidator::new().with_all(&["name", "type"], FieldClass::Token);

    let desired = record_of([
        ("name", Some(params.name.as_str())),
        ("address", params.address.as_deref()),
        ("descr", Some(params.descr.as_str())),
        ("type", Some(params.kind.as_str())),
        ("detail", params.detail.as_deref()),
    ]);
    let live = view.fetch(&section)?;
    let records = live.get("alias").cloned().unwrap_or_default();
    let planned = plan_record(&schema, &records, &desired, params.state, &validator)?;

    let mut change = view.change();
    change.extend(planned.statements);
    change.report("aliases", section);
    Ok(change)
}
