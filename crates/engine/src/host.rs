//! Host-bound XPath functions and the element lookup tables behind them.
use std::cell::RefCell;

use bindery_xpath::model::NodeId;
use bindery_xpath::{
    DefaultArg, DepElement, ElementId, Error, ErrorCode, ExprContext, FunctionRegistry, HostEnvironment, Node, Value,
};
use rustc_hash::FxHashMap;

use crate::changes::ChangeTracker;
use crate::element::BoundElement;

/// Install `instance`, `index`, `nodeindex` and `is-valid`.
pub(crate) fn register(functions: &mut FunctionRegistry) {
    functions.register_fn("instance", 0, Some(1), instance);
    functions.register_fn("index", 1, Some(1), index);
    functions.register_fn("nodeindex", 1, Some(1), nodeindex);
    functions.register_defaulted("is-valid", 0, Some(1), DefaultArg::ContextNodeSet, is_valid);
}

fn host<'a>(ctx: &ExprContext<'a>, function: &str) -> Result<&'a dyn HostEnvironment, Error> {
    ctx.host().ok_or_else(|| Error::from_code(ErrorCode::XPDY0002, format!("{function}() needs a form host")))
}

fn string_arg(args: &[Value]) -> String {
    args.first().map(Value::string_value).unwrap_or_default()
}

fn instance(ctx: &ExprContext<'_>, args: &[Value]) -> Result<Value, Error> {
    let id = string_arg(args);
    let root = if id.is_empty() {
        ctx.node().root().document_element()
    } else {
        let root = host(ctx, "instance")?.instance_root(&id);
        if root.is_none() {
            return Err(Error::from_code(ErrorCode::FOER0000, format!("instance {id:?} not found")));
        }
        root
    };
    if let Some(root) = &root {
        ctx.add_dep_model_of(root);
    }
    Ok(Value::NodeSet(root.into_iter().collect()))
}

fn index(ctx: &ExprContext<'_>, args: &[Value]) -> Result<Value, Error> {
    let id = string_arg(args);
    let (element, index) = host(ctx, "index")?
        .repeat_index(&id)
        .ok_or_else(|| Error::from_code(ErrorCode::FOER0000, format!("repeat {id:?} not found")))?;
    ctx.add_dep_element(DepElement::Element(element));
    #[allow(clippy::cast_precision_loss)]
    let index = index as f64;
    Ok(Value::Number(index))
}

fn nodeindex(ctx: &ExprContext<'_>, args: &[Value]) -> Result<Value, Error> {
    let id = string_arg(args);
    let (element, node) = host(ctx, "nodeindex")?
        .bound_node(&id)
        .ok_or_else(|| Error::from_code(ErrorCode::FOER0000, format!("element {id:?} not found")))?;
    ctx.add_dep_element(DepElement::Element(element));
    if let Some(node) = &node {
        ctx.add_dep_node(node);
        ctx.add_dep_model_of(node);
    }
    Ok(Value::NodeSet(node.into_iter().collect()))
}

fn is_valid(ctx: &ExprContext<'_>, args: &[Value]) -> Result<Value, Error> {
    let nodes = match args.first() {
        Some(value) => value.as_nodeset()?,
        None => &[],
    };
    let host = host(ctx, "is-valid")?;
    Ok(Value::Boolean(nodes.iter().all(|n| host.is_valid(n))))
}

/// Named elements as seen by host functions. Only elements on the selected
/// path (the current item of every enclosing repeat) are recorded.
#[derive(Debug, Default)]
pub(crate) struct HostState {
    repeats: RefCell<FxHashMap<String, (ElementId, usize)>>,
    bound: RefCell<FxHashMap<String, (ElementId, Option<Node>)>>,
    node_repeats: RefCell<FxHashMap<NodeId, ElementId>>,
}

impl HostState {
    pub(crate) fn repeat_index(&self, name: &str) -> Option<(ElementId, usize)> {
        self.repeats.borrow().get(name).copied()
    }

    pub(crate) fn bound_node(&self, name: &str) -> Option<(ElementId, Option<Node>)> {
        self.bound.borrow().get(name).cloned()
    }

    /// Repeat currently displaying `node`.
    pub(crate) fn repeat_of(&self, node: &Node) -> Option<ElementId> {
        self.node_repeats.borrow().get(&node.id()).copied()
    }

    /// Make a declared element resolvable before its first build.
    pub(crate) fn declare(&self, id: ElementId, name: &str, repeat: bool) {
        if repeat {
            self.repeats.borrow_mut().entry(name.to_string()).or_insert((id, 1));
        }
        self.bound.borrow_mut().entry(name.to_string()).or_insert((id, None));
    }

    /// Update the index published for `name` when `id` holds that entry.
    pub(crate) fn set_repeat_index(&self, name: &str, id: ElementId, index: usize) {
        if let Some(entry) = self.repeats.borrow_mut().get_mut(name).filter(|(holder, _)| *holder == id) {
            entry.1 = index;
        }
    }

    /// Record a freshly built element. Entries that moved register an
    /// element change for both the old and the new holder.
    pub(crate) fn observe(&self, id: ElementId, element: &dyn BoundElement, changes: &ChangeTracker) {
        let Some(name) = element.name() else {
            return;
        };
        if let Some(repeat) = element.as_repeat() {
            let entry = (id, repeat.index());
            let previous = self.repeats.borrow_mut().insert(name.to_string(), entry);
            if let Some(previous) = previous.filter(|p| *p != entry) {
                changes.add(DepElement::Element(previous.0));
                changes.add(DepElement::Element(id));
            }
            let mut node_repeats = self.node_repeats.borrow_mut();
            node_repeats.retain(|_, holder| *holder != id);
            for node in repeat.nodes() {
                node_repeats.insert(node.id(), id);
            }
        }
        let node = element.bound_node().cloned();
        let previous = self.bound.borrow_mut().insert(name.to_string(), (id, node.clone()));
        if let Some((previous_id, previous_node)) = previous
            && (previous_id != id || previous_node != node)
        {
            changes.add(DepElement::Element(previous_id));
            changes.add(DepElement::Element(id));
        }
    }

    #[cfg(test)]
    pub(crate) fn repeat_node_count(&self) -> usize {
        self.node_repeats.borrow().len()
    }

    /// Drop entries held by a disposed element.
    pub(crate) fn forget(&self, id: ElementId) {
        self.repeats.borrow_mut().retain(|_, (holder, _)| *holder != id);
        self.bound.borrow_mut().retain(|_, (holder, _)| *holder != id);
        self.node_repeats.borrow_mut().retain(|_, holder| *holder != id);
    }
}
