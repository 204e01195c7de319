use config_tree_core::{plan_record, Presence, RecordSchema, TreePath};
use serde::de::{self, Deserializer};
use serde::Deserialize;

use crate::commit::{Change, LiveView};
use crate::error::ReconcileError;
use crate::ops::record_of;
use crate::params::text_or_number;
use crate::validate::{FieldClass, FieldValidator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Ldap,
    Radius,
}

impl ServerType {
    fn as_str(self) -> &'static str {
        match self {
            ServerType::Ldap => "ldap",
            ServerType::Radius => "radius",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum RadiusProtocol {
    #[serde(rename = "PAP")]
    Pap,
    #[serde(rename = "MD5-CHAP")]
    Md5Chap,
    #[serde(rename = "MS-CHAPv1")]
    MsChapV1,
    #[default]
    #[serde(rename = "MS-CHAPv2")]
    MsChapV2,
}

impl RadiusProtocol {
    fn as_str(self) -> &'static str {
        match self {
            RadiusProtocol::Pap => "PAP",
            RadiusProtocol::Md5Chap => "MD5-CHAP",
            RadiusProtocol::MsChapV1 => "MS-CHAPv1",
            RadiusProtocol::MsChapV2 => "MS-CHAPv2",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum LdapUrlType {
    #[default]
    #[serde(rename = "TCP - Standard")]
    Standard,
    #[serde(rename = "TCP - STARTTLS")]
    StartTls,
    #[serde(rename = "SSL - Encrypted")]
    Ssl,
}

impl LdapUrlType {
    fn as_str(self) -> &'static str {
        match self {
            LdapUrlType::Standard => "TCP - Standard",
            LdapUrlType::StartTls => "TCP - STARTTLS",
            LdapUrlType::Ssl => "SSL - Encrypted",
        }
    }
}

/// Written as `2` or `3`, quoted or bare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LdapVersion {
    V2,
    #[default]
    V3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LdapScope {
    #[default]
    One,
    Subtree,
}

/// An LDAP or RADIUS authentication server. Only the fields of the chosen
/// type are written; defaults match the web GUI's.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthServerParams {
    #[serde(default)]
    pub state: Presence,
    pub refid: String,
    pub name: String,
    pub host: String,
    #[serde(default, rename = "type")]
    pub kind: ServerType,

    #[serde(default)]
    pub radius_protocol: RadiusProtocol,
    pub radius_nasip_attribute: Option<String>,
    pub radius_secret: Option<String>,
    #[serde(default = "defaults::radius_timeout", deserialize_with = "crate::params::text_or_number")]
    pub radius_timeout: String,
    #[serde(default = "defaults::radius_auth_port", deserialize_with = "crate::params::text_or_number")]
    pub radius_auth_port: String,
    #[serde(default = "defaults::radius_acct_port", deserialize_with = "crate::params::text_or_number")]
    pub radius_acct_port: String,

    #[serde(default = "defaults::ldap_port", deserialize_with = "crate::params::text_or_number")]
    pub ldap_port: String,
    #[serde(default)]
    pub ldap_urltype: LdapUrlType,
    #[serde(default, deserialize_with = "ldap_version")]
    pub ldap_protver: LdapVersion,
    #[serde(default)]
    pub ldap_scope: LdapScope,
    pub ldap_basedn: Option<String>,
    pub ldap_authcn: Option<String>,
    #[serde(default)]
    pub ldap_extended_enabled: String,
    #[serde(default)]
    pub ldap_extended_query: String,
    #[serde(default = "defaults::ldap_attr_user")]
    pub ldap_attr_user: String,
    #[serde(default = "defaults::ldap_attr_group")]
    pub ldap_attr_group: String,
    #[serde(default = "defaults::ldap_attr_member")]
    pub ldap_attr_member: String,
    #[serde(default = "defaults::ldap_attr_groupobj")]
    pub ldap_attr_groupobj: String,
    #[serde(default = "defaults::ldap_timeout", deserialize_with = "crate::params::text_or_number")]
    pub ldap_timeout: String,
    pub ldap_binddn: Option<String>,
    pub ldap_bindpw: Option<String>,
}

fn ldap_version<'de, D>(deserializer: D) -> Result<LdapVersion, D::Error>
where
    D: Deserializer<'de>,
{
    match text_or_number(deserializer)?.as_str() {
        "2" => Ok(LdapVersion::V2),
        "3" => Ok(LdapVersion::V3),
        other => Err(de::Error::invalid_value(de::Unexpected::Str(other), &"2 or 3")),
    }
}

mod defaults {
    pub fn radius_timeout() -> String {
        "10".to_string()
    }
    pub fn radius_auth_port() -> String {
        "1812".to_string()
    }
    pub fn radius_acct_port() -> String {
        "1813".to_string()
    }
    pub fn ldap_port() -> String {
        "389".to_string()
    }
    pub fn ldap_attr_user() -> String {
        "samAccountName".to_string()
    }
    pub fn ldap_attr_group() -> String {
        "cn".to_string()
    }
    pub fn ldap_attr_member() -> String {
        "memberOf".to_string()
    }
    pub fn ldap_attr_groupobj() -> String {
        "group".to_string()
    }
    pub fn ldap_timeout() -> String {
        "25".to_string()
    }
}

impl AuthServerParams {
    fn typed_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        match self.kind {
            ServerType::Radius => vec![
                ("radius_protocol", Some(self.radius_protocol.as_str())),
                ("radius_nasip_attribute", self.radius_nasip_attribute.as_deref()),
                ("radius_secret", self.radius_secret.as_deref()),
                ("radius_timeout", Some(&self.radius_timeout)),
                ("radius_auth_port", Some(&self.radius_auth_port)),
                ("radius_acct_port", Some(&self.radius_acct_port)),
            ],
            ServerType::Ldap => vec![
                ("ldap_port", Some(&self.ldap_port)),
                ("ldap_urltype", Some(self.ldap_urltype.as_str())),
                (
                    "ldap_protver",
                    Some(match self.ldap_protver {
                        LdapVersion::V2 => "2",
                        LdapVersion::V3 => "3",
                    }),
                ),
                (
                    "ldap_scope",
                    Some(match self.ldap_scope {
                        LdapScope::One => "one",
                        LdapScope::Subtree => "subtree",
                    }),
                ),
                ("ldap_basedn", self.ldap_basedn.as_deref()),
                ("ldap_authcn", self.ldap_authcn.as_deref()),
                ("ldap_extended_enabled", Some(&self.ldap_extended_enabled)),
                ("ldap_extended_query", Some(&self.ldap_extended_query)),
                ("ldap_attr_user", Some(&self.ldap_attr_user)),
                ("ldap_attr_group", Some(&self.ldap_attr_group)),
                ("ldap_attr_member", Some(&self.ldap_attr_member)),
                ("ldap_attr_groupobj", Some(&self.ldap_attr_groupobj)),
                ("ldap_timeout", Some(&self.ldap_timeout)),
                ("ldap_binddn", self.ldap_binddn.as_deref()),
                ("ldap_bindpw", self.ldap_bindpw.as_deref()),
            ],
        }
    }
}

pub fn plan(mut view: LiveView<'_>, params: &AuthServerParams) -> Result<Change, ReconcileError> {
    let list = TreePath::key("system").child("authserver");
    let schema = RecordSchema::new(list.clone(), "refid").with_init_container(list.clone());
    let validator = FieldValidator::new()
        .with_all(&["refid", "type", "ldap_port", "ldap_timeout"], FieldClass::Token)
        .with_all(&["radius_secret", "ldap_bindpw"], FieldClass::Secret);

    let mut fields = vec![
        ("type", Some(params.kind.as_str())),
        ("refid", Some(params.refid.as_str())),
        ("name", Some(params.name.as_str())),
        ("host", Some(params.host.as_str())),
    ];
    fields.extend(params.typed_fields());
    let desired = record_of(fields);

    let system = view.fetch(&TreePath::key("system"))?;
    let records = system.get("authserver").cloned().unwrap_or_default();
    let planned = plan_record(&schema, &records, &desired, params.state, &validator)?;

    let mut change = view.change();
    change.extend(planned.statements);
    change.report("authserver", list);
    Ok(change)
}
