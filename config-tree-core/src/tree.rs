use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::path::{Segment, TreePath};

static ABSENT: ConfigTree = ConfigTree::Absent;

/// The shape of a [`ConfigTree`] value, used in mismatch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Scalar,
    Sequence,
    Mapping,
    Absent,
}

impl Display for Shape {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shape::Scalar => "scalar",
            Shape::Sequence => "sequence",
            Shape::Mapping => "mapping",
            Shape::Absent => "absent",
        };
        f.write_str(name)
    }
}

/// A generic configuration tree value.
///
/// Mappings keep insertion order (the remote side preserves it) but compare
/// as unordered collections.
#[derive(Debug, Clone, Default)]
pub enum ConfigTree {
    /// A leaf string. Numbers and booleans are stored in their textual form.
    Scalar(String),
    /// An ordered list.
    Sequence(Vec<ConfigTree>),
    /// Keyed children with unique keys.
    Mapping(Vec<(String, ConfigTree)>),
    /// The key does not exist.
    #[default]
    Absent,
}

impl ConfigTree {
    /// Build a scalar leaf.
    pub fn scalar(value: impl Into<String>) -> Self {
        ConfigTree::Scalar(value.into())
    }

    /// Build an empty mapping.
    pub fn mapping() -> Self {
        ConfigTree::Mapping(Vec::new())
    }

    /// Build a mapping from `(key, value)` pairs. Later duplicates replace earlier ones.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ConfigTree)>,
    {
        let mut out = ConfigTree::mapping();
        for (key, value) in pairs {
            out.insert(key, value);
        }
        out
    }

    /// Build a sequence of scalars.
    pub fn scalars<S, I>(values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = S>,
    {
        ConfigTree::Sequence(values.into_iter().map(ConfigTree::scalar).collect())
    }

    pub fn shape(&self) -> Shape {
        match self {
            ConfigTree::Scalar(_) => Shape::Scalar,
            ConfigTree::Sequence(_) => Shape::Sequence,
            ConfigTree::Mapping(_) => Shape::Mapping,
            ConfigTree::Absent => Shape::Absent,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ConfigTree::Absent)
    }

    /// True for values that stand for an empty container on the remote side:
    /// absent keys, empty strings (an empty element), and empty collections.
    pub fn is_vacant(&self) -> bool {
        match self {
            ConfigTree::Absent => true,
            ConfigTree::Scalar(value) => value.is_empty(),
            ConfigTree::Sequence(items) => items.is_empty(),
            ConfigTree::Mapping(entries) => entries.is_empty(),
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            ConfigTree::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigTree]> {
        match self {
            ConfigTree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, ConfigTree)]> {
        match self {
            ConfigTree::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Return the child stored under `key`, if this is a mapping that has it.
    pub fn get(&self, key: &str) -> Option<&ConfigTree> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Return the scalar stored under `key`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigTree::as_scalar)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigTree> {
        match self {
            ConfigTree::Mapping(entries) => entries
                .iter_mut()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace `key`. A vacant value is turned into a mapping first;
    /// inserting into a non-empty scalar or a sequence is ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigTree) {
        if self.is_vacant() && !matches!(self, ConfigTree::Mapping(_)) {
            *self = ConfigTree::mapping();
        }
        if let ConfigTree::Mapping(entries) = self {
            let key = key.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key, value)),
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigTree> {
        match self {
            ConfigTree::Mapping(entries) => {
                let pos = entries.iter().position(|(k, _)| k == key)?;
                Some(entries.remove(pos).1)
            }
            _ => None,
        }
    }

    /// Walk `path` and return the value found there, or [`ConfigTree::Absent`].
    ///
    /// Index segments address sequence positions, or integer keys of a sparse
    /// mapping (what the remote side produces after removing list entries).
    pub fn at(&self, path: &TreePath) -> &ConfigTree {
        let mut current = self;
        for segment in path.segments() {
            let next = match (current, segment) {
                (ConfigTree::Mapping(_), Segment::Key(key)) => current.get(key),
                (ConfigTree::Mapping(_), Segment::Index(index)) => {
                    current.get(&index.to_string())
                }
                (ConfigTree::Sequence(items), Segment::Index(index)) => items.get(*index),
                _ => None,
            };
            match next {
                Some(node) => current = node,
                None => return &ABSENT,
            }
        }
        current
    }

    /// Collapse a scalar or list-of-scalars into a set, for order-insensitive
    /// comparison. Vacant values yield the empty set; anything else yields `None`.
    pub fn scalar_set(&self) -> Option<BTreeSet<&str>> {
        match self {
            ConfigTree::Scalar(value) if value.is_empty() => Some(BTreeSet::new()),
            ConfigTree::Scalar(value) => Some(BTreeSet::from([value.as_str()])),
            ConfigTree::Absent => Some(BTreeSet::new()),
            ConfigTree::Sequence(items) => items.iter().map(ConfigTree::as_scalar).collect(),
            ConfigTree::Mapping(entries) if entries.is_empty() => Some(BTreeSet::new()),
            ConfigTree::Mapping(_) => None,
        }
    }
}

impl PartialEq for ConfigTree {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ConfigTree::Scalar(a), ConfigTree::Scalar(b)) => a == b,
            (ConfigTree::Sequence(a), ConfigTree::Sequence(b)) => a == b,
            (ConfigTree::Mapping(a), ConfigTree::Mapping(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| other.get(key) == Some(value))
                    && b.iter().all(|(key, _)| self.contains_key(key))
            }
            (ConfigTree::Absent, ConfigTree::Absent) => true,
            _ => false,
        }
    }
}

impl From<&str> for ConfigTree {
    fn from(value: &str) -> Self {
        ConfigTree::scalar(value)
    }
}

impl From<String> for ConfigTree {
    fn from(value: String) -> Self {
        ConfigTree::Scalar(value)
    }
}

impl From<serde_json::Value> for ConfigTree {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ConfigTree::Absent,
            serde_json::Value::Bool(b) => ConfigTree::Scalar(b.to_string()),
            serde_json::Value::Number(n) => ConfigTree::Scalar(n.to_string()),
            serde_json::Value::String(s) => ConfigTree::Scalar(s),
            serde_json::Value::Array(items) => {
                ConfigTree::Sequence(items.into_iter().map(ConfigTree::from).collect())
            }
            serde_json::Value::Object(map) => {
                ConfigTree::from_pairs(map.into_iter().map(|(k, v)| (k, ConfigTree::from(v))))
            }
        }
    }
}

impl Display for ConfigTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConfigTree::Scalar(value) => write!(f, "{value:?}"),
            ConfigTree::Absent => write!(f, "null"),
            other => {
                let encoded = serde_json::to_string(other).map_err(|_| fmt::Error)?;
                f.write_str(&encoded)
            }
        }
    }
}

impl Serialize for ConfigTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConfigTree::Scalar(value) => serializer.serialize_str(value),
            ConfigTree::Absent => serializer.serialize_unit(),
            ConfigTree::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            ConfigTree::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for ConfigTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TreeVisitor)
    }
}

struct TreeVisitor;

impl<'de> Visitor<'de> for TreeVisitor {
    type Value = ConfigTree;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number, boolean, list, map or null")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<ConfigTree, E> {
        Ok(ConfigTree::Scalar(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<ConfigTree, E> {
        Ok(ConfigTree::Scalar(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<ConfigTree, E> {
        Ok(ConfigTree::Scalar(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<ConfigTree, E> {
        Ok(ConfigTree::Scalar(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<ConfigTree, E> {
        Ok(ConfigTree::scalar(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<ConfigTree, E> {
        Ok(ConfigTree::Scalar(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<ConfigTree, E> {
        Ok(ConfigTree::Absent)
    }

    fn visit_none<E: de::Error>(self) -> Result<ConfigTree, E> {
        Ok(ConfigTree::Absent)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<ConfigTree, D::Error> {
        ConfigTree::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<ConfigTree, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<ConfigTree>()? {
            items.push(item);
        }
        Ok(ConfigTree::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ConfigTree, A::Error> {
        let mut out = ConfigTree::mapping();
        while let Some((key, value)) = map.next_entry::<String, ConfigTree>()? {
            out.insert(key, value);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigTree, Shape};
    use crate::path::TreePath;

    #[test]
    fn mappings_compare_without_regard_to_order() {
        let a = ConfigTree::from_pairs([("x", "1".into()), ("y", "2".into())]);
        let b = ConfigTree::from_pairs([("y", "2".into()), ("x", "1".into())]);
        assert_eq!(a, b);
    }

    #[test]
    fn at_walks_sparse_integer_keys() {
        let tree: ConfigTree = serde_json::from_str(
            r#"{"filter":{"rule":{"0":{"tracker":"1"},"2":{"tracker":"3"}}}}"#,
        )
        .expect("json");
        let path = TreePath::key("filter").child("rule").index(2).child("tracker");
        assert_eq!(tree.at(&path).as_scalar(), Some("3"));
        assert_eq!(tree.at(&TreePath::key("nope")).shape(), Shape::Absent);
    }

    #[test]
    fn numbers_and_booleans_become_strings() {
        let tree: ConfigTree =
            serde_json::from_str(r#"{"port":161,"on":true,"gone":null}"#).expect("json");
        assert_eq!(tree.get_str("port"), Some("161"));
        assert_eq!(tree.get_str("on"), Some("true"));
        assert!(tree.get("gone").is_some_and(ConfigTree::is_absent));
    }

    #[test]
    fn deserialize_keeps_key_order() {
        let tree: ConfigTree = serde_json::from_str(r#"{"b":"1","a":"2"}"#).expect("json");
        let keys: Vec<&str> = tree
            .as_mapping()
            .expect("mapping")
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
