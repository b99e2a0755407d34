//! Generic XML-to-tree parser.
//!
//! # Design
//! Parses arbitrary XML into a `serde_json::Value` tree with no knowledge of
//! Open311 shapes: an element with children becomes an object, repeated
//! sibling names are promoted to an array, a text-only element becomes a
//! string, and an empty element becomes null. Attributes are merged into the
//! element's object as plain keys. Whether a given node "should" be an
//! object or an array is inherently ambiguous at this layer; resolving that
//! ambiguity per response shape is the normalizer's job.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::Open311Error;

/// Parse an XML document into a nested key/value tree.
///
/// The returned value is an object with a single key, the document's root
/// element. Fails with `MalformedResponse` on syntactically invalid XML or
/// input with no root element.
pub fn parse(xml: &str) -> Result<Value, Open311Error> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<(String, Node)> = Vec::new();
    let mut root = Node::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Open311Error::MalformedResponse(format!("XML parse error: {e}")))?;
        match event {
            Event::Start(start) => {
                let name = local_name(start.name().as_ref());
                let mut node = Node::default();
                merge_attributes(&start, &mut node.map)?;
                stack.push((name, node));
            }
            Event::Empty(start) => {
                let name = local_name(start.name().as_ref());
                let mut node = Node::default();
                merge_attributes(&start, &mut node.map)?;
                let parent = match stack.last_mut() {
                    Some((_, parent)) => parent,
                    None => &mut root,
                };
                insert(&mut parent.map, name, node.into_value());
            }
            Event::Text(text) => {
                if let Some((_, node)) = stack.last_mut() {
                    let chunk = text.unescape().map_err(|e| {
                        Open311Error::MalformedResponse(format!("XML parse error: {e}"))
                    })?;
                    node.text.push_str(&chunk);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, node)) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::End(_) => {
                let (name, node) = stack.pop().ok_or_else(|| {
                    Open311Error::MalformedResponse("unbalanced closing tag".to_string())
                })?;
                let parent = match stack.last_mut() {
                    Some((_, parent)) => parent,
                    None => &mut root,
                };
                insert(&mut parent.map, name, node.into_value());
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(Open311Error::MalformedResponse(
            "unexpected end of XML document".to_string(),
        ));
    }
    if root.map.is_empty() {
        return Err(Open311Error::MalformedResponse(
            "XML document has no root element".to_string(),
        ));
    }
    Ok(Value::Object(root.map))
}

/// An element under construction: child values plus accumulated text.
#[derive(Default)]
struct Node {
    map: Map<String, Value>,
    text: String,
}

impl Node {
    /// Collapse a finished element into a value. Mixed content (text next to
    /// child elements) keeps only the children, which is all the GeoReport
    /// dialect ever needs. Surrounding whitespace from pretty-printed
    /// documents is stripped.
    fn into_value(self) -> Value {
        if !self.map.is_empty() {
            return Value::Object(self.map);
        }
        let text = self.text.trim();
        if text.is_empty() {
            Value::Null
        } else {
            Value::String(text.to_string())
        }
    }
}

fn local_name(qname: &[u8]) -> String {
    let name = String::from_utf8_lossy(qname);
    match name.rfind(':') {
        Some(pos) => name[pos + 1..].to_string(),
        None => name.into_owned(),
    }
}

fn merge_attributes(
    start: &quick_xml::events::BytesStart<'_>,
    map: &mut Map<String, Value>,
) -> Result<(), Open311Error> {
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| Open311Error::MalformedResponse(format!("XML parse error: {e}")))?;
        let key = local_name(attr.key.as_ref());
        let value = attr
            .unescape_value()
            .map_err(|e| Open311Error::MalformedResponse(format!("XML parse error: {e}")))?;
        insert(map, key, Value::String(value.into_owned()));
    }
    Ok(())
}

/// Insert a child value, promoting repeated sibling names to an array.
fn insert(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.get_mut(&key) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            map.insert(key, value);
        }
    }
}
