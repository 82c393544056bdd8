//! Evaluation context threaded through every sub-expression.
use crate::deps::{DepElement, DependencyRecorder, ElementId};
use crate::functions::FunctionRegistry;
use crate::model::Node;
use crate::namespaces::NamespaceResolver;

/// Host services consulted by host-bound functions (`instance`, `index`,
/// `nodeindex`, `is-valid`). Implemented by the form engine.
pub trait HostEnvironment {
    /// Document element of the instance with the given id.
    fn instance_root(&self, id: &str) -> Option<Node>;
    /// Repeat element with the given id and its current 1-based index.
    fn repeat_index(&self, repeat_id: &str) -> Option<(ElementId, usize)>;
    /// Element with the given id and the node it is currently bound to.
    fn bound_node(&self, element_id: &str) -> Option<(ElementId, Option<Node>)>;
    /// Validity as computed by the last revalidation.
    fn is_valid(&self, node: &Node) -> bool;
}

/// Ephemeral per-evaluation context.
///
/// Child contexts created with [`ExprContext::clone_for`] share the
/// resolver, registry, host and dependency recorder of their parent.
#[derive(Clone, Copy)]
pub struct ExprContext<'a> {
    node: &'a Node,
    position: usize,
    size: usize,
    parent: Option<&'a ExprContext<'a>>,
    namespaces: &'a NamespaceResolver,
    current: &'a Node,
    functions: &'a FunctionRegistry,
    host: Option<&'a dyn HostEnvironment>,
    deps: Option<&'a dyn DependencyRecorder>,
}

impl<'a> ExprContext<'a> {
    pub fn new(node: &'a Node, namespaces: &'a NamespaceResolver, functions: &'a FunctionRegistry) -> Self {
        Self {
            node,
            position: 1,
            size: 1,
            parent: None,
            namespaces,
            current: node,
            functions,
            host: None,
            deps: None,
        }
    }

    #[must_use]
    pub fn with_position(mut self, position: usize, size: usize) -> Self {
        self.position = position;
        self.size = size;
        self
    }

    #[must_use]
    pub fn with_current(mut self, current: &'a Node) -> Self {
        self.current = current;
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: &'a dyn HostEnvironment) -> Self {
        self.host = Some(host);
        self
    }

    #[must_use]
    pub fn with_deps(mut self, deps: &'a dyn DependencyRecorder) -> Self {
        self.deps = Some(deps);
        self
    }

    /// Child context focused on `node` at 1-based `position` of `size`.
    pub fn clone_for<'b>(&'b self, node: &'b Node, position: usize, size: usize) -> ExprContext<'b> {
        ExprContext {
            node,
            position,
            size,
            parent: Some(self),
            namespaces: self.namespaces,
            current: self.current,
            functions: self.functions,
            host: self.host,
            deps: self.deps,
        }
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }
    pub fn position(&self) -> usize {
        self.position
    }
    pub fn size(&self) -> usize {
        self.size
    }
    pub fn parent(&self) -> Option<&'a ExprContext<'a>> {
        self.parent
    }
    pub fn current(&self) -> &'a Node {
        self.current
    }
    pub fn namespaces(&self) -> &'a NamespaceResolver {
        self.namespaces
    }
    pub fn functions(&self) -> &'a FunctionRegistry {
        self.functions
    }
    pub fn host(&self) -> Option<&'a dyn HostEnvironment> {
        self.host
    }
    pub fn is_recording(&self) -> bool {
        self.deps.is_some()
    }

    /// Number of enclosing contexts.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut cur = self.parent;
        while let Some(p) = cur {
            depth += 1;
            cur = p.parent;
        }
        depth
    }

    pub fn add_dep_node(&self, node: &Node) {
        if let Some(deps) = self.deps {
            deps.add_node(node);
        }
    }

    pub fn add_dep_element(&self, element: DepElement) {
        if let Some(deps) = self.deps {
            deps.add_element(element);
        }
    }

    /// Record the model owning `node`'s document, if any.
    pub fn add_dep_model_of(&self, node: &Node) {
        if let Some(model) = node.owner_model() {
            self.add_dep_element(DepElement::Model(model));
        }
    }
}
