//! Tolerant XML reading into the [`Tei`] arena.
//!
//! The upstream structuring service is imperfect: documents arrive with
//! missing namespaces, stray end tags, undeclared entities, and odd
//! encodings. The reader accepts anything quick-xml can scan, erases
//! namespace prefixes, and only fails when the input contains no
//! element content at all.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::tree::{Node, NodeId, NodeKind, Tei};
use crate::util::decode_text;

impl Tei {
    /// Parse a document from a string.
    pub fn parse(xml: &str) -> Result<Tei> {
        let mut reader = Reader::from_str(xml);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut doc = Tei::with_root();
        let mut stack: Vec<NodeId> = vec![NodeId::ROOT];

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let id = push_element(&mut doc, &stack, &e);
                    stack.push(id);
                }
                Ok(Event::Empty(e)) => {
                    push_element(&mut doc, &stack, &e);
                }
                Ok(Event::End(_)) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                Ok(Event::Text(e)) => {
                    push_text(&mut doc, &stack, &String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::CData(e)) => {
                    push_text(&mut doc, &stack, &String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::GeneralRef(e)) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    if let Some(resolved) = resolve_entity(&entity) {
                        push_text(&mut doc, &stack, &resolved);
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(Error::Xml(e)),
            }
        }

        // Whitespace at the root still becomes a text node; only an
        // element child makes the document usable
        if !doc.children(NodeId::ROOT).any(|c| doc.name(c).is_some()) {
            return Err(Error::MalformedInput("document has no elements".into()));
        }
        Ok(doc)
    }

    /// Parse a document from raw bytes, with encoding fallback.
    pub fn from_bytes(bytes: &[u8]) -> Result<Tei> {
        Tei::parse(&decode_text(bytes))
    }
}

fn push_element(doc: &mut Tei, stack: &[NodeId], e: &quick_xml::events::BytesStart) -> NodeId {
    let name = local_name(e.name().as_ref());
    let mut attrs = Vec::new();
    for attr in e.attributes().flatten() {
        let key = local_name(attr.key.as_ref());
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        attrs.push((key, value));
    }
    let parent = *stack.last().expect("stack holds at least the root");
    let id = NodeId::new(doc.nodes.len());
    doc.nodes.push(Node {
        kind: NodeKind::Element { name, attrs },
        parent: Some(parent),
        children: Vec::new(),
    });
    doc.nodes[parent.index()].children.push(id);
    id
}

fn push_text(doc: &mut Tei, stack: &[NodeId], text: &str) {
    if text.is_empty() {
        return;
    }
    let parent = *stack.last().expect("stack holds at least the root");
    // Merge with a preceding text sibling so entity boundaries vanish
    if let Some(&last) = doc.nodes[parent.index()].children.last()
        && let NodeKind::Text(existing) = &mut doc.nodes[last.index()].kind
    {
        existing.push_str(text);
        return;
    }
    let id = NodeId::new(doc.nodes.len());
    doc.nodes.push(Node {
        kind: NodeKind::Text(text.to_string()),
        parent: Some(parent),
        children: Vec::new(),
    });
    doc.nodes[parent.index()].children.push(id);
}

/// Strip any namespace prefix from an element or attribute name.
fn local_name(name: &[u8]) -> String {
    let start = name
        .iter()
        .rposition(|&b| b == b':')
        .map_or(0, |pos| pos + 1);
    String::from_utf8_lossy(&name[start..]).into_owned()
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    if let Some(hex) = entity.strip_prefix("#x") {
        if let Ok(code) = u32::from_str_radix(hex, 16)
            && let Some(c) = char::from_u32(code)
        {
            return Some(c.to_string());
        }
    } else if let Some(dec) = entity.strip_prefix('#')
        && let Ok(code) = dec.parse::<u32>()
        && let Some(c) = char::from_u32(code)
    {
        return Some(c.to_string());
    }

    None
}
