//! Read-only tree view over a parsed TEI document.
//!
//! The segmenter only sees [`Node`] values, never parser events, so any
//! parser that can produce this tree can drive it.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::tei_import::errors::MarkupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Set for elements only.
    pub tag: Option<String>,
    /// Attributes in source order.
    pub attrs: Vec<(String, String)>,
    /// Payload of text, comment and processing-instruction nodes.
    pub text: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn document() -> Self {
        Node { kind: NodeKind::Document, tag: None, attrs: Vec::new(), text: None, children: Vec::new() }
    }

    pub fn element(tag: &str, attrs: Vec<(String, String)>) -> Self {
        Node { kind: NodeKind::Element, tag: Some(tag.to_string()), attrs, text: None, children: Vec::new() }
    }

    pub fn text(text: &str) -> Self {
        Node { kind: NodeKind::Text, tag: None, attrs: Vec::new(), text: Some(text.to_string()), children: Vec::new() }
    }

    fn leaf(kind: NodeKind, text: String) -> Self {
        Node { kind, tag: None, attrs: Vec::new(), text: Some(text), children: Vec::new() }
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    /// True for an element with this tag name.
    pub fn is(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }

    pub fn tag_name(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Text of this node and all its descendants, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.kind {
            NodeKind::Text => {
                if let Some(t) = &self.text {
                    out.push_str(t);
                }
            }
            NodeKind::Element | NodeKind::Document => {
                for c in &self.children {
                    c.collect_text(out);
                }
            }
            _ => {}
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|c| c.is_element())
    }

    /// First descendant element with this tag, pre-order. Does not match `self`.
    pub fn find_first(&self, tag: &str) -> Option<&Node> {
        for c in self.element_children() {
            if c.is(tag) {
                return Some(c);
            }
            if let Some(found) = c.find_first(tag) {
                return Some(found);
            }
        }
        None
    }

    /// Every descendant element with this tag, pre-order.
    pub fn find_all<'a>(&'a self, tag: &str) -> Vec<&'a Node> {
        let mut found = Vec::new();
        self.collect_all(tag, &mut found);
        found
    }

    fn collect_all<'a>(&'a self, tag: &str, found: &mut Vec<&'a Node>) {
        for c in self.element_children() {
            if c.is(tag) {
                found.push(c);
            }
            c.collect_all(tag, found);
        }
    }
}

/// Resolve the predefined XML entities and character references, leaving
/// anything else (DTD entities such as `&responsibility;`) as literal text.
fn unescape_lenient(raw: &str) -> String {
    if let Ok(s) = quick_xml::escape::unescape(raw) {
        return s.into_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';') {
            Some(semi) => {
                let entity = &tail[..=semi];
                match quick_xml::escape::unescape(entity) {
                    Ok(s) => out.push_str(&s),
                    Err(_) => out.push_str(entity),
                }
                rest = &tail[semi + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn bytes_to_string(bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

fn element_from_start(e: &BytesStart) -> Node {
    let tag = bytes_to_string(e.name().as_ref());
    let attrs = e.attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            let key = bytes_to_string(a.key.as_ref());
            let value = unescape_lenient(&bytes_to_string(&a.value));
            (key, value)
        })
        .collect();
    Node::element(&tag, attrs)
}

fn push_child(stack: &mut [Node], node: Node) {
    if let Some(parent) = stack.last_mut() {
        // Whitespace between the prolog and the root element is not content.
        if parent.kind == NodeKind::Document && node.is_text()
            && node.text.as_deref().map(str::trim).unwrap_or("").is_empty() {
            return;
        }
        parent.children.push(node);
    }
}

/// Parse a whole document. The returned node has kind [`NodeKind::Document`].
///
/// Whitespace text is kept, since it belongs to the verbatim content.
pub fn parse_document(content: &str) -> Result<Node, MarkupError> {
    let mut reader = Reader::from_str(content);
    let mut stack: Vec<Node> = vec![Node::document()];

    loop {
        let event = reader.read_event().map_err(|e| MarkupError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(e) => stack.push(element_from_start(&e)),
            Event::Empty(e) => {
                let node = element_from_start(&e);
                push_child(&mut stack, node);
            }
            Event::End(e) => {
                if stack.len() < 2 {
                    return Err(MarkupError::UnexpectedEnd(bytes_to_string(e.name().as_ref())));
                }
                if let Some(node) = stack.pop() {
                    push_child(&mut stack, node);
                }
            }
            Event::Text(e) => {
                let raw = bytes_to_string(&e);
                push_child(&mut stack, Node::text(&unescape_lenient(&raw)));
            }
            Event::CData(e) => {
                let text = bytes_to_string(&e.into_inner());
                push_child(&mut stack, Node::text(&text));
            }
            Event::Comment(e) => {
                push_child(&mut stack, Node::leaf(NodeKind::Comment, bytes_to_string(&e)));
            }
            Event::PI(e) => {
                push_child(&mut stack, Node::leaf(NodeKind::ProcessingInstruction, bytes_to_string(&e)));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.last().map(|n| n.tag_name().to_string()).unwrap_or_default();
        return Err(MarkupError::Unclosed(open));
    }

    stack.pop().ok_or_else(|| MarkupError::MissingElement("document".to_string()))
}

/// Serialize a node and its subtree. Attribute order and text are kept as is.
pub fn serialize(node: &Node) -> String {
    let mut out = String::new();
    write_node(node, &mut out);
    out
}

fn write_node(node: &Node, out: &mut String) {
    match node.kind {
        NodeKind::Document => {
            for c in &node.children {
                write_node(c, out);
            }
        }
        NodeKind::Element => {
            let tag = node.tag_name();
            out.push('<');
            out.push_str(tag);
            for (k, v) in &node.attrs {
                out.push(' ');
                out.push_str(k);
                out.push_str("=\"");
                out.push_str(&html_escape::encode_double_quoted_attribute(v));
                out.push('"');
            }
            if node.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for c in &node.children {
                    write_node(c, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
        NodeKind::Text => {
            if let Some(t) = &node.text {
                out.push_str(&html_escape::encode_text(t));
            }
        }
        NodeKind::Comment => {
            out.push_str("<!--");
            out.push_str(node.text.as_deref().unwrap_or(""));
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            out.push_str("<?");
            out.push_str(node.text.as_deref().unwrap_or(""));
            out.push_str("?>");
        }
    }
}
