use bindery_schema::TypeRef;
use bindery_xpath::Node;
use bindery_xpath::model::NodeId;
use rustc_hash::FxHashMap;

use super::bind::BindId;

/// Computed model item properties of one instance node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemProperties {
    pub required: bool,
    pub readonly: bool,
    pub relevant: bool,
    pub valid: bool,
}

impl Default for ItemProperties {
    fn default() -> Self {
        Self { required: false, readonly: false, relevant: true, valid: true }
    }
}

/// Bind assignment, type and properties of one instance node.
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub bind: Option<BindId>,
    pub ty: Option<TypeRef>,
    pub properties: ItemProperties,
}

/// Side table keyed by node identity; instance documents stay free of
/// engine bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct NodeStates {
    map: FxHashMap<NodeId, NodeState>,
}

impl NodeStates {
    pub(crate) fn get(&self, node: &Node) -> NodeState {
        self.map.get(&node.id()).cloned().unwrap_or_default()
    }

    pub(crate) fn properties(&self, node: &Node) -> ItemProperties {
        self.map.get(&node.id()).map(|s| s.properties).unwrap_or_default()
    }

    pub(crate) fn entry(&mut self, node: &Node) -> &mut NodeState {
        self.map.entry(node.id()).or_default()
    }

    /// Forget bind and type assignments; properties survive until the next
    /// revalidation recomputes them.
    pub(crate) fn clear_assignments(&mut self) {
        for state in self.map.values_mut() {
            state.bind = None;
            state.ty = None;
        }
    }

    pub(crate) fn clear(&mut self) {
        self.map.clear();
    }
}
