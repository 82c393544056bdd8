//! Dependency recording for incremental re-evaluation.
//!
//! Every dependency-tracked owner (a bound element or a bind) holds one or
//! more [`DependencySet`]s, each identified by a [`DepSetId`]. Membership of
//! a node in a set is recorded in the out-of-band [`DependencyTags`] table so
//! that `add_node` stays O(1) regardless of set size, and so that clearing
//! one set never touches the tags of another.
use core::fmt;
use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::model::{Node, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model#{}", self.0)
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Aggregate object a binding may depend on besides individual nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepElement {
    Model(ModelId),
    Element(ElementId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepSetId(u64);

impl DepSetId {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// Monotonic set-id source.
#[derive(Debug)]
pub struct DepSetIds {
    next: Cell<u64>,
}

impl Default for DepSetIds {
    fn default() -> Self {
        Self { next: Cell::new(1) }
    }
}

impl DepSetIds {
    pub fn mint(&self) -> DepSetId {
        let id = self.next.get();
        self.next.set(id + 1);
        DepSetId(id)
    }
}

/// Side table: node identity → ids of the sets currently containing it.
#[derive(Debug, Default)]
pub struct DependencyTags {
    tags: RefCell<FxHashMap<NodeId, SmallVec<[DepSetId; 4]>>>,
}

impl DependencyTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tagged(&self, node: &Node, set: DepSetId) -> bool {
        self.tags.borrow().get(&node.id()).is_some_and(|ids| ids.contains(&set))
    }

    /// Tag `node` with `set`; returns `false` when it already was.
    pub fn tag(&self, node: &Node, set: DepSetId) -> bool {
        let mut tags = self.tags.borrow_mut();
        let ids = tags.entry(node.id()).or_default();
        if ids.contains(&set) {
            return false;
        }
        ids.push(set);
        true
    }

    pub fn untag(&self, node: &Node, set: DepSetId) {
        let mut tags = self.tags.borrow_mut();
        if let Some(ids) = tags.get_mut(&node.id()) {
            ids.retain(|id| *id != set);
            if ids.is_empty() {
                tags.remove(&node.id());
            }
        }
    }

    pub fn sets_of(&self, node: &Node) -> Vec<DepSetId> {
        self.tags.borrow().get(&node.id()).map(|ids| ids.to_vec()).unwrap_or_default()
    }

    /// Number of (node, set) tags currently held.
    pub fn len(&self) -> usize {
        self.tags.borrow().values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.borrow().is_empty()
    }
}

/// Sink that expression evaluation funnels dependency reads into.
pub trait DependencyRecorder {
    fn add_node(&self, node: &Node);
    fn add_element(&self, element: DepElement);
}

/// Persistent dependency set owned by a bound element or bind.
#[derive(Debug, Clone)]
pub struct DependencySet {
    id: DepSetId,
    nodes: Vec<Node>,
    elements: SmallVec<[DepElement; 4]>,
}

impl DependencySet {
    pub fn new(id: DepSetId) -> Self {
        Self { id, nodes: Vec::new(), elements: SmallVec::new() }
    }

    pub fn id(&self) -> DepSetId {
        self.id
    }
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
    pub fn elements(&self) -> &[DepElement] {
        &self.elements
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.elements.is_empty()
    }

    /// Membership test through the tag table.
    pub fn contains_node(&self, node: &Node, tags: &DependencyTags) -> bool {
        tags.is_tagged(node, self.id)
    }

    pub fn push_node(&mut self, node: &Node, tags: &DependencyTags) {
        if tags.tag(node, self.id) {
            self.nodes.push(node.clone());
        }
    }

    pub fn push_element(&mut self, element: DepElement) {
        if !self.elements.contains(&element) {
            self.elements.push(element);
        }
    }

    /// Untag every node and forget all entries; required before a rebuild.
    pub fn clear(&mut self, tags: &DependencyTags) {
        for node in self.nodes.drain(..) {
            tags.untag(&node, self.id);
        }
        self.elements.clear();
    }

    /// Recording view for one evaluation.
    pub fn recorder<'a>(&'a mut self, tags: &'a DependencyTags) -> DependencySink<'a> {
        DependencySink { set: RefCell::new(self), tags }
    }
}

pub struct DependencySink<'a> {
    set: RefCell<&'a mut DependencySet>,
    tags: &'a DependencyTags,
}

impl DependencySink<'_> {
    /// Copy another set's entries (bind dependencies composing into a
    /// control's build set).
    pub fn absorb(&self, other: &DependencySet) {
        for node in &other.nodes {
            self.add_node(node);
        }
        for element in &other.elements {
            self.add_element(*element);
        }
    }
}

impl DependencyRecorder for DependencySink<'_> {
    fn add_node(&self, node: &Node) {
        self.set.borrow_mut().push_node(node, self.tags);
    }

    fn add_element(&self, element: DepElement) {
        self.set.borrow_mut().push_element(element);
    }
}
