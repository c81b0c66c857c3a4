//! Minimal element tree read with the quick-xml event reader.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::XmlError;

/// One element with its attributes, child elements and text.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Node {
    /// Local name, without namespace prefix.
    pub name: String,
    /// Attributes with their qualified keys.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    pub text: String,
}

impl Node {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn parse_error(e: impl std::fmt::Display) -> XmlError {
    XmlError::Parse(e.to_string())
}

fn element(start: &BytesStart<'_>) -> Result<Node, XmlError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(parse_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(parse_error)?.into_owned();
        attributes.push((key, value));
    }
    Ok(Node {
        name,
        attributes,
        ..Node::default()
    })
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(XmlError::Parse(format!("second root element <{}>", node.name))),
    }
    Ok(())
}

/// Parse a whole document into its root element.
pub(crate) fn parse_tree(xml: &str) -> Result<Node, XmlError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root = None;
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(element(e)?),
            Ok(Event::Empty(ref e)) => {
                let node = element(e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(ref e)) => {
                let text = e.unescape().map_err(parse_error)?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| XmlError::Parse("unexpected end tag".to_string()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(XmlError::Parse(format!(
                    "at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::Parse(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| XmlError::Parse("document has no root element".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_tree() {
        let root = parse_tree(
            r#"<?xml version="1.0"?>
            <a:root xmlns:a="urn:x" kind="t"><b>one &amp; two</b><c/></a:root>"#,
        )
        .unwrap();
        assert_eq!(root.name, "root");
        assert_eq!(root.attribute("kind"), Some("t"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].text, "one & two");
        assert_eq!(root.children[1].name, "c");
    }

    #[test]
    fn test_malformed_documents() {
        assert!(parse_tree("<a><b></a>").is_err());
        assert!(parse_tree("<a>").is_err());
        assert!(parse_tree("").is_err());
    }
}
