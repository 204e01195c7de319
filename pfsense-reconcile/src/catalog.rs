//! pfSense layout knowledge shared by the operations.

use config_tree_core::TreePath;

/// Elements that `config.xml` repeats to form lists, even when only one is present.
pub const LIST_TAGS: &[&str] = &[
    "rule",
    "alias",
    "user",
    "group",
    "cert",
    "ca",
    "authserver",
    "vip",
    "gateway_item",
    "item",
    "package",
    "priv",
    "dnsserver",
    "monitor_type",
    "config",
];

/// Keys that hold record lists and the operation that manages each.
const RECORD_LISTS: &[(&str, &str)] = &[
    ("rule", "rule"),
    ("cert", "cert"),
    ("user", "password"),
    ("group", "group"),
    ("authserver", "authserver"),
    ("alias", "alias"),
    ("item", "a dedicated"),
    ("monitor_type", "a dedicated"),
    ("gateway_item", "interface"),
    ("package", "a dedicated"),
];

/// Hint for a key that must not be written as a flat value, if it is one.
pub fn record_list_hint(key: &str) -> Option<String> {
    RECORD_LISTS
        .iter()
        .find(|(list, _)| *list == key)
        .map(|(_, op)| format!("{key} is a record list, use the {op} operation"))
}

/// Hint for a key the safe-create gate refused.
pub fn missing_key_hint(path: &TreePath) -> Option<String> {
    let key = path.leaf_key()?;
    Some(record_list_hint(key).unwrap_or_else(|| {
        format!("check the spelling of {key}, or set safe_mode = false to create it")
    }))
}
