use bindery_xpath::Node;

use super::{BoundElement, ElementDeps, ElementKind, Presentation, resolve, update_presentation};
use crate::binding::Binding;
use crate::env::Env;
use crate::error::EngineError;

/// Repeats its template children once per bound node and keeps a 1-based
/// index of the selected item (0 while empty).
#[derive(Debug, Clone)]
pub struct Repeat {
    name: Option<String>,
    binding: Binding,
    deps: ElementDeps,
    nodes: Vec<Node>,
    index: usize,
    select_on_build: Option<Node>,
    presentation: Presentation,
    mutations: u64,
}

impl Repeat {
    pub(crate) fn new(name: Option<String>, binding: Binding, deps: ElementDeps) -> Self {
        Self {
            name,
            binding,
            deps,
            nodes: Vec::new(),
            index: 1,
            select_on_build: None,
            presentation: Presentation::default(),
            mutations: 0,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Select item `index`. Indexes without an item are ignored. Returns
    /// whether the index changed.
    pub fn set_index(&mut self, index: usize) -> bool {
        if index == self.index || index == 0 || index > self.nodes.len() {
            return false;
        }
        self.index = index;
        true
    }

    /// Select `node` once the next build has picked it up.
    pub(crate) fn select_on_build(&mut self, node: Node) {
        self.select_on_build = Some(node);
    }

    /// Forget a deleted node; deleting the last item selects the new last
    /// one.
    pub(crate) fn delete_node(&mut self, node: &Node) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n != node);
        if self.index == before { self.set_index(self.index.saturating_sub(1)) } else { false }
    }
}

impl BoundElement for Repeat {
    fn kind(&self) -> ElementKind {
        ElementKind::Repeat
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
        self.nodes = resolve(&self.binding, &mut self.deps, ctx, env)?
            .into_nodeset()
            .map_err(|e| EngineError::evaluation(self.binding.source(), e))?;
        if let Some(selected) = self.select_on_build.take()
            && let Some(position) = self.nodes.iter().position(|n| *n == selected)
        {
            self.index = position + 1;
        }
        if self.nodes.is_empty() {
            self.index = 0;
        } else if self.index == 0 {
            self.index = 1;
        } else if self.index > self.nodes.len() {
            self.index = self.nodes.len();
        }
        Ok(())
    }

    fn clear_result(&mut self) {
        self.nodes.clear();
        self.index = 0;
    }

    fn refresh(&mut self, _env: &Env) -> bool {
        let next = Presentation {
            value: Some(self.index.to_string()),
            relevant: !self.nodes.is_empty(),
            ..Presentation::default()
        };
        update_presentation(&mut self.presentation, &mut self.mutations, next)
    }

    fn clone_element(&self) -> Box<dyn BoundElement> {
        Box::new(Self::new(self.name.clone(), self.binding.clone(), self.deps.clone()))
    }

    /// The selected item's node.
    fn bound_node(&self) -> Option<&Node> {
        self.index.checked_sub(1).and_then(|i| self.nodes.get(i))
    }

    fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    fn mutations(&self) -> u64 {
        self.mutations
    }

    fn as_repeat(&self) -> Option<&Repeat> {
        Some(self)
    }

    fn as_repeat_mut(&mut self) -> Option<&mut Repeat> {
        Some(self)
    }
}
