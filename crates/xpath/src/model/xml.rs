use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::{escape, resolve_predefined_entity};
use quick_xml::events::{BytesStart, Event};

use super::{Node, NodeKind, QName};
use crate::consts::XML_NS;
use crate::error::{Error, ErrorCode};

type Scope = Vec<(Option<String>, String)>;

fn xml_error(e: impl std::error::Error + Send + Sync + 'static) -> Error {
    Error::from_code(ErrorCode::FORG0001, "malformed XML instance")
        .with_source(Some(std::sync::Arc::new(e) as std::sync::Arc<dyn std::error::Error + Send + Sync>))
}

fn resolve(scopes: &[Scope], prefix: Option<&str>) -> Option<String> {
    if prefix == Some("xml") {
        return Some(XML_NS.to_string());
    }
    scopes
        .iter()
        .rev()
        .find_map(|s| s.iter().find(|(p, _)| p.as_deref() == prefix).map(|(_, uri)| uri.clone()))
}

fn open_element(start: &BytesStart<'_>, scopes: &mut Vec<Scope>) -> Result<Node, Error> {
    let mut declared: Scope = Vec::new();
    let mut plain: Vec<(QName, String)> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(xml_error)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        if key == "xmlns" {
            declared.push((None, value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declared.push((Some(prefix.to_string()), value));
        } else {
            plain.push((QName::parse(&key), value));
        }
    }
    scopes.push(declared.clone());

    let raw = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut name = QName::parse(&raw);
    name.ns_uri = resolve(scopes, name.prefix.as_deref());
    let element = Node::new_element(name);
    for (prefix, uri) in &declared {
        element.declare_namespace(prefix.as_deref(), uri);
    }
    for (mut qn, value) in plain {
        // unprefixed attributes are in no namespace
        if qn.prefix.is_some() {
            qn.ns_uri = resolve(scopes, qn.prefix.as_deref());
        }
        element.set_attribute(qn, &value);
    }
    Ok(element)
}

/// Parse an XML document into a detached instance tree.
pub fn parse_document(source: &str) -> Result<Node, Error> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);

    let document = Node::new_document();
    let mut stack: Vec<Node> = vec![document.clone()];
    let mut scopes: Vec<Scope> = Vec::new();

    let append_text = |stack: &[Node], text: &str| {
        if let Some(parent) = stack.last() {
            if parent.kind() == NodeKind::Document {
                return; // whitespace around the document element
            }
            match parent.children().last() {
                Some(last) if last.kind() == NodeKind::Text => {
                    let mut merged = last.raw_value().unwrap_or_default();
                    merged.push_str(text);
                    last.set_value(&merged);
                }
                _ => parent.append_child(&Node::new_text(text)),
            }
        }
    };

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(start) => {
                let element = open_element(&start, &mut scopes)?;
                if let Some(parent) = stack.last() {
                    parent.append_child(&element);
                }
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&start, &mut scopes)?;
                scopes.pop();
                if let Some(parent) = stack.last() {
                    parent.append_child(&element);
                }
            }
            Event::End(_) => {
                scopes.pop();
                if stack.len() > 1 {
                    stack.pop();
                }
            }
            Event::Text(t) => {
                let text = t.decode().map_err(xml_error)?;
                // indentation between elements is not instance data
                if !text.trim().is_empty() {
                    append_text(&stack, &text);
                }
            }
            Event::GeneralRef(r) => {
                let resolved: Cow<'_, str> = if let Some(ch) = r.resolve_char_ref().map_err(xml_error)? {
                    Cow::Owned(ch.to_string())
                } else {
                    let name = r.decode().map_err(xml_error)?;
                    match resolve_predefined_entity(&name) {
                        Some(s) => Cow::Borrowed(s),
                        None => {
                            return Err(Error::from_code(
                                ErrorCode::FORG0001,
                                format!("undeclared entity &{name};"),
                            ));
                        }
                    }
                };
                append_text(&stack, &resolved);
            }
            Event::CData(c) => {
                let text = c.decode().map_err(xml_error)?;
                append_text(&stack, &text);
            }
            Event::Comment(c) => {
                let text = c.decode().map_err(xml_error)?;
                if let Some(parent) = stack.last() {
                    parent.append_child(&Node::new_comment(&text));
                }
            }
            Event::PI(p) => {
                let target = String::from_utf8_lossy(p.target()).into_owned();
                let data = String::from_utf8_lossy(p.content()).trim().to_string();
                if let Some(parent) = stack.last() {
                    parent.append_child(&Node::new_pi(&target, &data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if document.document_element().is_none() {
        return Err(Error::from_code(ErrorCode::FORG0001, "instance has no document element"));
    }
    Ok(document)
}

impl Node {
    /// Serialize the subtree rooted at this node.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node.kind() {
        NodeKind::Document => {
            for c in node.children() {
                write_node(&c, out);
            }
        }
        NodeKind::Element => {
            let name = node.node_name();
            out.push('<');
            out.push_str(&name);
            for (prefix, uri) in node.namespace_declarations() {
                match prefix {
                    Some(p) => out.push_str(&format!(" xmlns:{p}=\"{}\"", escape(&uri))),
                    None => out.push_str(&format!(" xmlns=\"{}\"", escape(&uri))),
                }
            }
            for a in node.attributes() {
                out.push_str(&format!(" {}=\"{}\"", a.node_name(), escape(&a.value())));
            }
            if node.has_children() {
                out.push('>');
                for c in node.children() {
                    write_node(&c, out);
                }
                out.push_str(&format!("</{name}>"));
            } else {
                out.push_str("/>");
            }
        }
        NodeKind::Attribute => out.push_str(&escape(&node.value())),
        NodeKind::Text => out.push_str(&escape(&node.raw_value().unwrap_or_default())),
        NodeKind::Comment => {
            out.push_str(&format!("<!--{}-->", node.raw_value().unwrap_or_default()));
        }
        NodeKind::ProcessingInstruction => {
            out.push_str(&format!("<?{} {}?>", node.local_name(), node.raw_value().unwrap_or_default()));
        }
    }
}
