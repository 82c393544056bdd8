//! Mutable in-memory XML tree backing form instances.
//!
//! Nodes are `Rc` handles: cloning a [`Node`] clones the handle, not the
//! subtree. Identity is handle identity, and every node carries a
//! [`NodeId`] that side tables (dependency tags, model item properties) use
//! as key.
//!
//! ```
//! use bindery_xpath::model::{attr, elem, text};
//!
//! // <root id="r"><child>Hello</child><child world="yes"/></root>
//! let root = elem("root")
//!     .attr(attr("id", "r"))
//!     .child(elem("child").child(text("Hello")))
//!     .child(elem("child").attr(attr("world", "yes")))
//!     .build();
//!
//! assert_eq!(root.local_name(), "root");
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.string_value(), "Hello");
//! ```
use core::fmt;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{NodeKind, QName};
use crate::consts::XML_NS;
use crate::deps::ModelId;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a node for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

struct Inner {
    id: NodeId,
    kind: NodeKind,
    name: Option<QName>,
    value: RefCell<Option<String>>, // text / attribute / comment / PI content
    parent: RefCell<Weak<Inner>>,
    attributes: RefCell<Vec<Node>>,
    namespaces: RefCell<Vec<(Option<String>, String)>>, // declarations on this element
    children: RefCell<Vec<Node>>,
    owner_model: Cell<Option<ModelId>>, // documents only
}

#[derive(Clone)]
pub struct Node(Rc<Inner>);

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Node {}
impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.0.id.0)
            .field("kind", &self.0.kind)
            .field("name", &self.0.name)
            .field("value", &self.0.value.borrow())
            .finish()
    }
}

impl Node {
    fn new(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        Node(Rc::new(Inner {
            id: NodeId::next(),
            kind,
            name,
            value: RefCell::new(value),
            parent: RefCell::new(Weak::new()),
            attributes: RefCell::new(Vec::new()),
            namespaces: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            owner_model: Cell::new(None),
        }))
    }

    pub fn new_document() -> Self {
        Self::new(NodeKind::Document, None, None)
    }
    pub fn new_element(name: QName) -> Self {
        Self::new(NodeKind::Element, Some(name), None)
    }
    pub fn new_attribute(name: QName, value: &str) -> Self {
        Self::new(NodeKind::Attribute, Some(name), Some(value.to_string()))
    }
    pub fn new_text(value: &str) -> Self {
        Self::new(NodeKind::Text, None, Some(value.to_string()))
    }
    pub fn new_comment(value: &str) -> Self {
        Self::new(NodeKind::Comment, None, Some(value.to_string()))
    }
    pub fn new_pi(target: &str, data: &str) -> Self {
        Self::new(NodeKind::ProcessingInstruction, Some(QName::local(target)), Some(data.to_string()))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }
    pub fn kind(&self) -> NodeKind {
        self.0.kind
    }
    pub fn name(&self) -> Option<&QName> {
        self.0.name.as_ref()
    }
    pub fn local_name(&self) -> &str {
        self.0.name.as_ref().map_or("", |n| n.local.as_str())
    }
    pub fn namespace_uri(&self) -> Option<&str> {
        self.0.name.as_ref().and_then(|n| n.ns_uri.as_deref())
    }
    /// Lexical name as written (`prefix:local`).
    pub fn node_name(&self) -> String {
        self.0.name.as_ref().map(ToString::to_string).unwrap_or_default()
    }

    pub fn is_element(&self) -> bool {
        self.0.kind == NodeKind::Element
    }

    pub fn parent(&self) -> Option<Node> {
        self.0.parent.borrow().upgrade().map(Node)
    }
    pub fn children(&self) -> Vec<Node> {
        self.0.children.borrow().clone()
    }
    pub fn first_child(&self) -> Option<Node> {
        self.0.children.borrow().first().cloned()
    }
    pub fn attributes(&self) -> Vec<Node> {
        self.0.attributes.borrow().clone()
    }
    pub fn has_children(&self) -> bool {
        !self.0.children.borrow().is_empty()
    }

    /// Attribute in no namespace with the given local name.
    pub fn attribute(&self, local: &str) -> Option<Node> {
        self.attribute_ns(None, local)
    }

    pub fn attribute_ns(&self, ns_uri: Option<&str>, local: &str) -> Option<Node> {
        self.0
            .attributes
            .borrow()
            .iter()
            .find(|a| a.local_name() == local && a.namespace_uri() == ns_uri)
            .cloned()
    }

    /// Set (or create) an attribute; returns the attribute node.
    pub fn set_attribute(&self, name: QName, value: &str) -> Node {
        if let Some(existing) = self.attribute_ns(name.ns_uri.as_deref(), &name.local) {
            *existing.0.value.borrow_mut() = Some(value.to_string());
            return existing;
        }
        let node = Node::new_attribute(name, value);
        *node.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.attributes.borrow_mut().push(node.clone());
        node
    }

    pub fn remove_attribute(&self, attribute: &Node) -> bool {
        let mut attrs = self.0.attributes.borrow_mut();
        let before = attrs.len();
        attrs.retain(|a| a != attribute);
        let removed = attrs.len() != before;
        if removed {
            *attribute.0.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    /// Raw stored value of attribute, text, comment and PI nodes.
    pub fn raw_value(&self) -> Option<String> {
        self.0.value.borrow().clone()
    }

    /// XPath string-value.
    pub fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Document | NodeKind::Element => {
                let mut out = String::new();
                self.collect_text(&mut out);
                out
            }
            _ => self.raw_value().unwrap_or_default(),
        }
    }

    fn collect_text(&self, out: &mut String) {
        for child in self.0.children.borrow().iter() {
            match child.0.kind {
                NodeKind::Text => {
                    if let Some(v) = child.0.value.borrow().as_deref() {
                        out.push_str(v);
                    }
                }
                NodeKind::Element => child.collect_text(out),
                _ => {}
            }
        }
    }

    /// Form value of a node: the attribute value, or the first child's text.
    pub fn value(&self) -> String {
        match self.0.kind {
            NodeKind::Attribute | NodeKind::Text => self.raw_value().unwrap_or_default(),
            NodeKind::Element => match self.first_child() {
                Some(first) if first.kind() == NodeKind::Text => first.raw_value().unwrap_or_default(),
                _ => String::new(),
            },
            _ => String::new(),
        }
    }

    /// Replace the form value of a node. Elements keep their structure: the
    /// first text child is rewritten or a text child is prepended.
    pub fn set_value(&self, value: &str) {
        match self.0.kind {
            NodeKind::Attribute | NodeKind::Text | NodeKind::Comment => {
                *self.0.value.borrow_mut() = Some(value.to_string());
            }
            NodeKind::Element => match self.first_child() {
                Some(first) if first.kind() == NodeKind::Text => {
                    *first.0.value.borrow_mut() = Some(value.to_string());
                }
                Some(first) => {
                    self.insert_before(&Node::new_text(value), &first);
                }
                None => self.append_child(&Node::new_text(value)),
            },
            NodeKind::Document | NodeKind::ProcessingInstruction => {}
        }
    }

    /// Detach `child` from its current parent and append it here.
    pub fn append_child(&self, child: &Node) {
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Insert `child` before `reference`; appends when `reference` is not a child.
    pub fn insert_before(&self, child: &Node, reference: &Node) {
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        let mut children = self.0.children.borrow_mut();
        match children.iter().position(|c| c == reference) {
            Some(idx) => children.insert(idx, child.clone()),
            None => children.push(child.clone()),
        }
    }

    pub fn remove_child(&self, child: &Node) -> bool {
        let mut children = self.0.children.borrow_mut();
        let before = children.len();
        children.retain(|c| c != child);
        let removed = children.len() != before;
        if removed {
            *child.0.parent.borrow_mut() = Weak::new();
        }
        removed
    }

    /// Remove this node from its parent (child or attribute list).
    pub fn detach(&self) {
        if let Some(parent) = self.parent() {
            if self.0.kind == NodeKind::Attribute {
                parent.remove_attribute(self);
            } else {
                parent.remove_child(self);
            }
        }
    }

    /// Top-most ancestor (the document node for attached trees).
    pub fn root(&self) -> Node {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// First element child of the owning document (or of the root).
    pub fn document_element(&self) -> Option<Node> {
        let root = self.root();
        if root.kind() == NodeKind::Element {
            return Some(root);
        }
        root.0.children.borrow().iter().find(|c| c.is_element()).cloned()
    }

    /// Position among the parent's children, `None` for attributes and roots.
    pub fn index_in_parent(&self) -> Option<usize> {
        if self.0.kind == NodeKind::Attribute {
            return None;
        }
        let parent = self.parent()?;
        parent.0.children.borrow().iter().position(|c| c == self)
    }

    pub fn following_siblings(&self) -> Vec<Node> {
        match (self.parent(), self.index_in_parent()) {
            (Some(p), Some(i)) => p.0.children.borrow()[i + 1..].to_vec(),
            _ => Vec::new(),
        }
    }

    /// Preceding siblings, nearest first.
    pub fn preceding_siblings(&self) -> Vec<Node> {
        match (self.parent(), self.index_in_parent()) {
            (Some(p), Some(i)) => p.0.children.borrow()[..i].iter().rev().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Descendants in document order (excluding attributes and self).
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.push_descendants(&mut out);
        out
    }

    fn push_descendants(&self, out: &mut Vec<Node>) {
        for c in self.0.children.borrow().iter() {
            out.push(c.clone());
            c.push_descendants(out);
        }
    }

    pub fn is_ancestor_of(&self, other: &Node) -> bool {
        let mut cur = other.parent();
        while let Some(p) = cur {
            if &p == self {
                return true;
            }
            cur = p.parent();
        }
        false
    }

    pub fn declare_namespace(&self, prefix: Option<&str>, uri: &str) {
        self.0.namespaces.borrow_mut().push((prefix.map(str::to_string), uri.to_string()));
    }

    pub fn namespace_declarations(&self) -> Vec<(Option<String>, String)> {
        self.0.namespaces.borrow().clone()
    }

    /// Resolve a prefix by walking the ancestor chain (including self).
    pub fn lookup_namespace_uri(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NS.to_string());
        }
        let mut cur = Some(self.clone());
        while let Some(n) = cur {
            if let Some((_, uri)) =
                n.0.namespaces.borrow().iter().find(|(p, _)| p.as_deref() == prefix)
            {
                return Some(uri.clone());
            }
            cur = n.parent();
        }
        None
    }

    /// Element whose `id` or `xml:id` attribute equals `id`, searched in the
    /// tree owning this node.
    pub fn element_by_id(&self, id: &str) -> Option<Node> {
        let root = self.root();
        root.descendants().into_iter().filter(Node::is_element).find(|e| {
            e.attribute("id").is_some_and(|a| a.value() == id)
                || e.attribute_ns(Some(XML_NS), "id").is_some_and(|a| a.value() == id)
        })
    }

    /// Deep copy with fresh identities; the copy is detached.
    pub fn deep_clone(&self) -> Node {
        let copy = Node::new(self.0.kind, self.0.name.clone(), self.raw_value());
        copy.0.namespaces.borrow_mut().clone_from(&self.0.namespaces.borrow());
        copy.0.owner_model.set(self.0.owner_model.get());
        for a in self.0.attributes.borrow().iter() {
            let ac = a.deep_clone();
            *ac.0.parent.borrow_mut() = Rc::downgrade(&copy.0);
            copy.0.attributes.borrow_mut().push(ac);
        }
        for c in self.0.children.borrow().iter() {
            let cc = c.deep_clone();
            *cc.0.parent.borrow_mut() = Rc::downgrade(&copy.0);
            copy.0.children.borrow_mut().push(cc);
        }
        copy
    }

    /// Model owning the tree this node belongs to.
    pub fn owner_model(&self) -> Option<ModelId> {
        self.root().0.owner_model.get()
    }

    pub fn set_owner_model(&self, model: Option<ModelId>) {
        self.root().0.owner_model.set(model);
    }
}

pub struct NodeBuilder {
    node: Node,
    pending_children: Vec<Node>,
    pending_attrs: Vec<Node>,
}

impl NodeBuilder {
    fn new(node: Node) -> Self {
        Self { node, pending_children: Vec::new(), pending_attrs: Vec::new() }
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<NodeOrBuilder>) -> Self {
        match child.into() {
            NodeOrBuilder::Built(n) => self.pending_children.push(n),
            NodeOrBuilder::Builder(b) => self.pending_children.push(b.build()),
        }
        self
    }

    #[must_use]
    pub fn children<I: IntoIterator<Item = NodeOrBuilder>>(mut self, it: I) -> Self {
        for c in it {
            self = self.child(c);
        }
        self
    }

    #[must_use]
    pub fn attr(mut self, attr: Node) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attr);
        self
    }

    #[must_use]
    pub fn namespace(self, prefix: &str, uri: &str) -> Self {
        let prefix = (!prefix.is_empty()).then_some(prefix);
        self.node.declare_namespace(prefix, uri);
        self
    }

    pub fn build(self) -> Node {
        for a in self.pending_attrs {
            *a.0.parent.borrow_mut() = Rc::downgrade(&self.node.0);
            self.node.0.attributes.borrow_mut().push(a);
        }
        for c in self.pending_children {
            *c.0.parent.borrow_mut() = Rc::downgrade(&self.node.0);
            self.node.0.children.borrow_mut().push(c);
        }
        self.node
    }
}

pub enum NodeOrBuilder {
    Built(Node),
    Builder(NodeBuilder),
}
impl From<Node> for NodeOrBuilder {
    fn from(n: Node) -> Self {
        NodeOrBuilder::Built(n)
    }
}
impl From<NodeBuilder> for NodeOrBuilder {
    fn from(b: NodeBuilder) -> Self {
        NodeOrBuilder::Builder(b)
    }
}

// Convenience helpers for concise test code.
pub fn doc() -> NodeBuilder {
    NodeBuilder::new(Node::new_document())
}
pub fn elem(name: &str) -> NodeBuilder {
    NodeBuilder::new(Node::new_element(QName::parse(name)))
}
pub fn attr(name: &str, v: &str) -> Node {
    Node::new_attribute(QName::parse(name), v)
}
pub fn text(v: &str) -> Node {
    Node::new_text(v)
}
pub fn comment(v: &str) -> Node {
    Node::new_comment(v)
}
pub fn pi(target: &str, data: &str) -> Node {
    Node::new_pi(target, data)
}
