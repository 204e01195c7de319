use config_tree_core::{
    locate, plan_record, ConfigTree, FieldRule, Presence, RecordSchema, Statement, TreePath,
};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::validate::{FieldClass, FieldValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupScope {
    Local,
    #[default]
    Remote,
}

impl GroupScope {
    fn as_str(self) -> &'static str {
        match self {
            GroupScope::Local => "local",
            GroupScope::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupParams {
    #[serde(default)]
    pub state: Presence,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scope: GroupScope,
    /// Privileges, compared without regard to order.
    #[serde(rename = "priv")]
    pub privileges: Option<Vec<String>>,
}

pub fn plan(mut view: LiveView<'_>, params: &GroupParams) -> Result<Change, ReconcileError> {
    let system_path = TreePath::key("system");
    let list = system_path.child("group");
    let nextgid = system_path.child("nextgid");
    let schema = RecordSchema::new(list.clone(), "name")
        .with_field(FieldRule::set("priv"))
        .with_init_container(list.clone());
    let validator = FieldValidator::new()
        .with("name", FieldClass::Name)
        .with("scope", FieldClass::Token);

    let system = view.fetch(&system_path)?;
    let records = system.get("group").cloned().unwrap_or_default();

    let mut desired = ConfigTree::from_pairs([
        ("name", ConfigTree::scalar(&params.name)),
        ("description", ConfigTree::scalar(&params.description)),
        ("scope", ConfigTree::scalar(params.scope.as_str())),
    ]);
    if let Some(privs) = &params.privileges {
        desired.insert("priv", ConfigTree::scalars(privs));
    }

    let creating = params.state == Presence::Present
        && !locate(&records, "name", &params.name).is_resolved();
    if creating {
        let Some(gid) = system.get_str("nextgid") else {
            return Err(ReconcileError::NotFound(nextgid.to_string()));
        };
        desired.insert("gid", ConfigTree::scalar(gid));
        if !desired.contains_key("priv") {
            desired.insert("priv", ConfigTree::Sequence(Vec::new()));
        }
    }

    let planned = plan_record(&schema, &records, &desired, params.state, &validator)?;

    let mut change = view.change();
    if planned.creates() {
        change.push(Statement::Increment { path: nextgid });
    }
    change.extend(planned.statements);
    change.report("group", list);
    Ok(change)
}
