//! Models: instance documents, binds, model item properties and the
//! rebuild/recalculate/revalidate phases.
use std::cell::RefCell;
use std::rc::Rc;

use bindery_schema::TypeRef;
use bindery_xpath::model::NodeId;
use bindery_xpath::{DepElement, Expression, ModelId, Node};
use rustc_hash::FxHashSet;

use crate::changes::ChangeTracker;
use crate::diagnostics::Diagnostics;
use crate::env::Env;
use crate::error::EngineError;

pub mod bind;
pub mod instance;
pub mod state;

pub use bind::{Bind, BindId, BindSpec};
pub use instance::Instance;
pub use state::{ItemProperties, NodeState};
use state::NodeStates;

/// Nodes changed since the last build pass, and whether the model's
/// structure changed.
#[derive(Debug, Default)]
struct ChangeBuffer {
    nodes: Vec<Node>,
    ids: FxHashSet<NodeId>,
    rebuilt: bool,
}

impl ChangeBuffer {
    fn clear(&mut self) {
        self.nodes.clear();
        self.ids.clear();
        self.rebuilt = false;
    }
}

#[derive(Debug)]
pub struct Model {
    id: ModelId,
    name: String,
    instances: Vec<Instance>,
    roots: Vec<BindId>,
    states: RefCell<NodeStates>,
    current: RefCell<ChangeBuffer>,
    pending: RefCell<ChangeBuffer>,
}

impl Model {
    pub(crate) fn new(id: ModelId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            instances: Vec::new(),
            roots: Vec::new(),
            states: RefCell::new(NodeStates::default()),
            current: RefCell::new(ChangeBuffer::default()),
            pending: RefCell::new(ChangeBuffer::default()),
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name() == name)
    }

    /// Document element of the first instance.
    pub fn default_root(&self) -> Option<Node> {
        self.instances.first().and_then(Instance::root)
    }

    pub(crate) fn add_instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    pub(crate) fn add_root_bind(&mut self, id: BindId) {
        self.roots.push(id);
    }

    pub fn node_state(&self, node: &Node) -> NodeState {
        self.states.borrow().get(node)
    }

    pub fn properties(&self, node: &Node) -> ItemProperties {
        self.states.borrow().properties(node)
    }

    pub(crate) fn node_type(&self, node: &Node, env: &Env) -> TypeRef {
        self.states.borrow().get(node).ty.unwrap_or_else(|| Rc::clone(env.forms.default_type()))
    }

    /// Register a mutated node. Must be called in the same turn as the
    /// mutation.
    pub(crate) fn add_change(&self, node: &Node, changes: &ChangeTracker) {
        let buffer = if changes.is_building() { &self.pending } else { &self.current };
        let mut buffer = buffer.borrow_mut();
        if buffer.ids.insert(node.id()) {
            buffer.nodes.push(node.clone());
        }
        changes.add(DepElement::Model(self.id));
    }

    pub(crate) fn mark_rebuilt(&self, changes: &ChangeTracker) {
        let buffer = if changes.is_building() { &self.pending } else { &self.current };
        buffer.borrow_mut().rebuilt = true;
        changes.add(DepElement::Model(self.id));
    }

    pub fn is_rebuilt(&self) -> bool {
        self.current.borrow().rebuilt
    }

    pub fn has_changed(&self, node: &Node) -> bool {
        self.current.borrow().ids.contains(&node.id())
    }

    pub(crate) fn changed_nodes(&self) -> Vec<Node> {
        self.current.borrow().nodes.clone()
    }

    pub(crate) fn swap_changes(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        *self.current.borrow_mut() = pending;
    }

    pub(crate) fn clear_changes(&self) {
        self.current.borrow_mut().clear();
        self.pending.borrow_mut().clear();
    }

    pub(crate) fn reset(&mut self, changes: &ChangeTracker) {
        for instance in &mut self.instances {
            instance.reset();
        }
        self.states.borrow_mut().clear();
        self.mark_rebuilt(changes);
    }

    /// Binds in depth-first declaration order.
    pub(crate) fn binds(&self, env: &Env) -> Vec<BindId> {
        let mut out = Vec::new();
        let mut stack: Vec<BindId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(bind) = env.binds.get(id) {
                stack.extend(bind.children().iter().rev().copied());
            }
        }
        out
    }

    /// Re-resolve every bind and reassign node binds and types.
    /// Evaluation failures leave the affected bind empty and are recorded
    /// in `diagnostics`; two binds on one node abort the rebuild.
    pub(crate) fn rebuild(&self, env: &Env, diagnostics: &mut Diagnostics) -> Result<(), EngineError> {
        let binds = self.binds(env);
        tracing::debug!(model = %self.id, binds = binds.len(), "rebuild");
        self.states.borrow_mut().clear_assignments();
        for id in &binds {
            env.binds.require(*id)?.reset(env.forms.tags());
        }
        let Some(root) = self.default_root() else {
            return Ok(());
        };
        for id in &self.roots {
            self.resolve_bind(*id, &root, env, diagnostics)?;
        }
        Ok(())
    }

    fn resolve_bind(
        &self,
        id: BindId,
        context: &Node,
        env: &Env,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        let bind = env.binds.require(id)?;
        let found = {
            let mut state = bind.state.borrow_mut();
            let state = &mut *state;
            let sink = state.deps.recorder(env.forms.tags());
            let result = env
                .evaluate(&bind.nodeset, context, None, 1, 1, Some(&sink))
                .and_then(|value| value.into_nodeset().map_err(|e| EngineError::evaluation(bind.nodeset(), e)));
            let found = diagnostics.recover(result, Vec::new(), Some(&bind.label()))?;
            state.nodes.extend(found.iter().cloned());
            found
        };
        for node in &found {
            self.assign(node, bind, env)?;
            for child in bind.children() {
                self.resolve_bind(*child, node, env, diagnostics)?;
            }
        }
        Ok(())
    }

    fn assign(&self, node: &Node, bind: &Bind, env: &Env) -> Result<(), EngineError> {
        let mut states = self.states.borrow_mut();
        let state = states.entry(node);
        match state.bind {
            Some(other) if other != bind.id() => {
                let first = env.binds.get(other).map_or_else(|| other.to_string(), Bind::label);
                return Err(EngineError::Binding { node: node.node_name(), first, second: bind.label() });
            }
            _ => state.bind = Some(bind.id()),
        }
        if let Some(ty) = &bind.ty {
            state.ty = Some(Rc::clone(ty));
        }
        Ok(())
    }

    /// Evaluate `calculate` binds and write values that differ. Returns
    /// whether any value changed. A failing calculation leaves its node
    /// untouched.
    pub(crate) fn recalculate(&self, env: &Env, diagnostics: &mut Diagnostics) -> Result<bool, EngineError> {
        let mut changed = false;
        for id in self.binds(env) {
            let bind = env.binds.require(id)?;
            let Some(calculate) = &bind.calculate else {
                continue;
            };
            let nodes = bind.nodes();
            let size = nodes.len();
            for (i, node) in nodes.iter().enumerate() {
                let result = env.evaluate(calculate, node, None, i + 1, size, None).map(|v| Some(v.string_value()));
                let Some(value) = diagnostics.recover(result, None, Some(&bind.label()))? else {
                    continue;
                };
                let value = self.node_type(node, env).normalize(&value);
                if node.value() != value {
                    tracing::debug!(model = %self.id, node = %node.node_name(), value = %value, "calculated");
                    node.set_value(&value);
                    self.add_change(node, &env.changes);
                    changed = true;
                }
            }
        }
        Ok(changed)
    }

    /// Recompute required/readonly/relevant/valid for every element and
    /// attribute, inheriting readonly and relevance from the parent.
    /// Failing property expressions count as false.
    pub(crate) fn revalidate(&self, env: &Env, diagnostics: &mut Diagnostics) -> Result<(), EngineError> {
        for instance in &self.instances {
            if let Some(root) = instance.root() {
                self.revalidate_tree(&root, false, true, env, diagnostics)?;
            }
        }
        Ok(())
    }

    fn revalidate_tree(
        &self,
        node: &Node,
        readonly: bool,
        relevant: bool,
        env: &Env,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), EngineError> {
        let props = self.revalidate_node(node, readonly, relevant, env, diagnostics)?;
        for attribute in node.attributes() {
            self.revalidate_node(&attribute, props.readonly, props.relevant, env, diagnostics)?;
        }
        for child in node.children() {
            if child.is_element() {
                self.revalidate_tree(&child, props.readonly, props.relevant, env, diagnostics)?;
            }
        }
        Ok(())
    }

    fn revalidate_node(
        &self,
        node: &Node,
        readonly: bool,
        relevant: bool,
        env: &Env,
        diagnostics: &mut Diagnostics,
    ) -> Result<ItemProperties, EngineError> {
        let state = self.states.borrow().get(node);
        let ty = state.ty.clone().unwrap_or_else(|| Rc::clone(env.forms.default_type()));
        let value = node.value();
        let next = match state.bind.and_then(|id| env.binds.get(id)) {
            Some(bind) => {
                let nodes = bind.nodes();
                let position = nodes.iter().position(|n| n == node).map_or(1, |i| i + 1);
                let label = bind.label();
                let mut test = |expr: Option<&Rc<Expression>>, default: bool| -> Result<bool, EngineError> {
                    match expr {
                        Some(expr) => {
                            let result =
                                env.evaluate(expr, node, None, position, nodes.len(), None).map(|v| v.boolean_value());
                            diagnostics.recover(result, false, Some(&label))
                        }
                        None => Ok(default),
                    }
                };
                let required = test(bind.required.as_ref(), false)?;
                let relevant = relevant && test(bind.relevant.as_ref(), true)?;
                let readonly = readonly || test(bind.readonly.as_ref(), false)?;
                let valid = !relevant
                    || (!required && value.is_empty())
                    || (!value.is_empty() && ty.validate(&value) && test(bind.constraint.as_ref(), true)?);
                ItemProperties { required, readonly, relevant, valid }
            }
            None => ItemProperties { required: false, readonly, relevant, valid: value.is_empty() || ty.validate(&value) },
        };
        if next != state.properties {
            self.states.borrow_mut().entry(node).properties = next;
            tracing::trace!(model = %self.id, node = %node.node_name(), ?next, "properties changed");
            self.add_change(node, &env.changes);
        }
        Ok(next)
    }

    /// Valid per the last revalidation, including every descendant element
    /// and attribute.
    pub(crate) fn is_valid_deep(&self, node: &Node) -> bool {
        let states = self.states.borrow();
        let mut stack = vec![node.clone()];
        while let Some(n) = stack.pop() {
            if !states.properties(&n).valid {
                return false;
            }
            stack.extend(n.attributes());
            stack.extend(n.children().into_iter().filter(Node::is_element));
        }
        true
    }
}
