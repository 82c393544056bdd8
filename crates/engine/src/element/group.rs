use bindery_xpath::Node;

use super::{BoundElement, ElementDeps, ElementKind, Presentation, resolve, update_presentation};
use crate::binding::Binding;
use crate::env::Env;
use crate::error::EngineError;

/// Container; scopes its children to its bound node.
#[derive(Debug, Clone)]
pub struct Group {
    name: Option<String>,
    binding: Option<Binding>,
    deps: ElementDeps,
    node: Option<Node>,
    presentation: Presentation,
    mutations: u64,
}

impl Group {
    pub(crate) fn new(name: Option<String>, binding: Option<Binding>, deps: ElementDeps) -> Self {
        Self { name, binding, deps, node: None, presentation: Presentation::default(), mutations: 0 }
    }
}

impl BoundElement for Group {
    fn kind(&self) -> ElementKind {
        ElementKind::Group
    }
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }
    fn deps(&self) -> &ElementDeps {
        &self.deps
    }
    fn deps_mut(&mut self) -> &mut ElementDeps {
        &mut self.deps
    }

    fn build(&mut self, ctx: Option<&Node>, env: &Env) -> Result<(), EngineError> {
        self.node = match &self.binding {
            None => ctx.cloned(),
            Some(binding) => {
                let nodes = resolve(binding, &mut self.deps, ctx, env)?
                    .into_nodeset()
                    .map_err(|e| EngineError::evaluation(binding.source(), e))?;
                nodes.into_iter().next()
            }
        };
        Ok(())
    }

    fn clear_result(&mut self) {
        self.node = None;
    }

    fn refresh(&mut self, env: &Env) -> bool {
        let next = match &self.node {
            Some(node) => {
                let props = env.properties(node);
                Presentation {
                    value: None,
                    relevant: props.relevant,
                    readonly: props.readonly,
                    required: props.required,
                    valid: props.valid,
                }
            }
            None => Presentation::default(),
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
