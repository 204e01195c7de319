use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// One step of a [`TreePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// A mapping key.
    Key(String),
    /// A list position (or the integer key of a sparse list).
    Index(usize),
}

/// An absolute path into a configuration tree, e.g. `system.group[3].name`.
///
/// The empty path addresses the whole tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreePath {
    segments: Vec<Segment>,
}

/// Error returned when a dotted path string is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed tree path {input:?}: {reason}")]
pub struct PathError {
    pub input: String,
    pub reason: &'static str,
}

impl TreePath {
    /// The whole tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// A single top-level key.
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Key(key.into())],
        }
    }

    /// Extend with a mapping key.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.into()));
        Self { segments }
    }

    /// Extend with a list position.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Split into the parent path and the final segment.
    pub fn split_last(&self) -> Option<(TreePath, &Segment)> {
        let (last, rest) = self.segments.split_last()?;
        Some((
            TreePath {
                segments: rest.to_vec(),
            },
            last,
        ))
    }

    /// The final mapping key, if the path ends in one.
    pub fn leaf_key(&self) -> Option<&str> {
        match self.segments.last()? {
            Segment::Key(key) => Some(key),
            Segment::Index(_) => None,
        }
    }
}

impl Display for TreePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) if i == 0 => write!(f, "{key}")?,
                Segment::Key(key) => write!(f, ".{key}")?,
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl FromStr for TreePath {
    type Err = PathError;

    /// Parse the dotted form produced by `Display`. An empty string is the root.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = |reason| PathError {
            input: input.to_string(),
            reason,
        };
        let mut path = TreePath::root();
        if input.is_empty() || input == "<root>" {
            return Ok(path);
        }
        for part in input.split('.') {
            let (key, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if key.is_empty() {
                return Err(err("empty key"));
            }
            path = path.child(key);
            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| err("unclosed index"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| err("index is not a number"))?;
                path = path.index(index);
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(err("unexpected text after index"));
                }
            }
        }
        Ok(path)
    }
}

impl Serialize for TreePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::TreePath;

    #[test]
    fn display_and_parse_agree() {
        let path = TreePath::key("system").child("group").index(3).child("name");
        assert_eq!(path.to_string(), "system.group[3].name");
        assert_eq!("system.group[3].name".parse::<TreePath>(), Ok(path));
    }

    #[test]
    fn parse_rejects_unclosed_index() {
        assert!("filter.rule[2".parse::<TreePath>().is_err());
    }

    #[test]
    fn keys_may_contain_dashes() {
        let path: TreePath = "system.webgui.ssl-certref".parse().expect("path");
        assert_eq!(path.leaf_key(), Some("ssl-certref"));
    }
}
