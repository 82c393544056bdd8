use bindery_xpath::{Node, Value};

use super::{BoundElement, ElementDeps, ElementKind, Presentation, resolve, update_presentation};
use crate::binding::Binding;
use crate::env::Env;
use crate::error::EngineError;

/// Input/output style control.
///
/// A node-set binding binds the first node (tracked as a refresh
/// dependency); any other value is displayed as computed output.
#[derive(Debug, Clone)]
pub struct Control {
    name: Option<String>,
    binding: Binding,
    deps: ElementDeps,
    node: Option<Node>,
    output: Option<String>,
    presentation: Presentation,
    mutations: u64,
}

impl Control {
    pub(crate) fn new(name: Option<String>, binding: Binding, deps: ElementDeps) -> Self {
        Self { name, binding, deps, node: None, output: None, presentation: Presentation::default(), mutations: 0 }
    }

    /// Computed value of a non-node-set binding.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

impl BoundElement for Control {
    fn kind(&self) -> ElementKind {
        ElementKind::Control
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    fn binding(&self) -> Option<&Binding> {
        Some(&self.binding)
    }
    fn deps(&self) -> &ElementDeps {
        &self.deps
    }
    fn deps_mut(&mut self) -> &mut ElementDeps {
        &mut self.deps
    }

    fn build(&mut self, ctx: Option<&Node>, env: &Env) -> Result<(), EngineError> {
        match resolve(&self.binding, &mut self.deps, ctx, env)? {
            Value::NodeSet(nodes) => {
                self.node = nodes.into_iter().next();
                self.output = None;
                if let Some(node) = &self.node {
                    self.deps.refresh.push_node(node, env.forms.tags());
                }
            }
            other => {
                self.node = None;
                self.output = Some(other.string_value());
            }
        }
        Ok(())
    }

    fn clear_result(&mut self) {
        self.node = None;
        self.output = None;
    }

    fn refresh(&mut self, env: &Env) -> bool {
        let next = match (&self.node, &self.output) {
            (Some(node), _) => Presentation::of_node(node, env),
            (None, Some(output)) => Presentation::computed(output.clone()),
            (None, None) => Presentation::default(),
        };
        update_presentation(&mut self.presentation, &mut self.mutations, next)
    }

    fn clone_element(&self) -> Box<dyn BoundElement> {
        Box::new(Self::new(self.name.clone(), self.binding.clone(), self.deps.clone()))
    }

    fn bound_node(&self) -> Option<&Node> {
        self.node.as_ref()
    }

    fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    fn mutations(&self) -> u64 {
        self.mutations
    }
}
