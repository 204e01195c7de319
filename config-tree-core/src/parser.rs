use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::name::QName;
use quick_xml::Reader;
use thiserror::Error;

use crate::tree::ConfigTree;

/// Errors that can occur while importing a configuration snapshot.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input XML could not be decoded or tokenized.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Input bytes were not valid UTF-8 for tag or text extraction.
    #[error("invalid UTF-8 while parsing XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to decode text entity or bytes.
    #[error("failed to decode XML text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    /// Input was not valid JSON.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Failed to read input file.
    #[error("failed to read snapshot file: {0}")]
    Io(#[from] std::io::Error),
    /// Structural issue in XML document.
    #[error("malformed XML: {0}")]
    Malformed(String),
}

/// Parse a JSON document into a [`ConfigTree`].
pub fn parse_json(json: &[u8]) -> Result<ConfigTree, ParseError> {
    Ok(serde_json::from_slice(json)?)
}

/// Parse an XML document into the [`ConfigTree`] of its root element's content.
///
/// Leaf elements become scalars of their trimmed text (`""` when empty).
/// Repeated child tags become sequences, as do tags named in `list_tags` even
/// when they occur once. Attributes are ignored.
pub fn parse_xml(xml: &[u8], list_tags: &[&str]) -> Result<ConfigTree, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<ConfigTree> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(Element::new(qname_to_string(e.name())?)),
            Event::Empty(e) => {
                let element = Element::new(qname_to_string(e.name())?);
                attach(&mut stack, &mut root, element, list_tags)?;
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(std::str::from_utf8(e.as_ref())?);
                }
            }
            Event::End(_) => {
                let element = stack.pop().ok_or_else(|| {
                    ParseError::Malformed("encountered closing tag without open tag".to_string())
                })?;
                attach(&mut stack, &mut root, element, list_tags)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }

    root.ok_or_else(|| ParseError::Malformed("no root element found".to_string()))
}

/// Parse a snapshot file, picking JSON for `.json` files and XML otherwise.
pub fn parse_file(path: &Path, list_tags: &[&str]) -> Result<ConfigTree, ParseError> {
    let bytes = fs::read(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        parse_json(&bytes)
    } else {
        parse_xml(&bytes, list_tags)
    }
}

struct Element {
    tag: String,
    text: String,
    children: Vec<(String, ConfigTree)>,
}

impl Element {
    fn new(tag: String) -> Self {
        Self {
            tag,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn into_tree(self, list_tags: &[&str]) -> ConfigTree {
        if self.children.is_empty() {
            return ConfigTree::scalar(self.text.trim());
        }
        let mut out: Vec<(String, ConfigTree)> = Vec::new();
        for (tag, value) in self.children {
            let listed = list_tags.contains(&tag.as_str());
            match out.iter_mut().find(|(k, _)| *k == tag) {
                Some((_, ConfigTree::Sequence(items))) => items.push(value),
                Some((_, existing)) => {
                    let first = std::mem::take(existing);
                    *existing = ConfigTree::Sequence(vec![first, value]);
                }
                None if listed => out.push((tag, ConfigTree::Sequence(vec![value]))),
                None => out.push((tag, value)),
            }
        }
        ConfigTree::Mapping(out)
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<ConfigTree>,
    element: Element,
    list_tags: &[&str],
) -> Result<(), ParseError> {
    let tag = element.tag.clone();
    let tree = element.into_tree(list_tags);
    if let Some(parent) = stack.last_mut() {
        parent.children.push((tag, tree));
        Ok(())
    } else if root.is_none() {
        *root = Some(tree);
        Ok(())
    } else {
        Err(ParseError::Malformed(
            "multiple top-level elements found".to_string(),
        ))
    }
}

fn qname_to_string(name: QName<'_>) -> Result<String, ParseError> {
    Ok(std::str::from_utf8(name.as_ref())?.to_string())
}
