//! Arena of bound elements and the depth-first build/refresh pass.
use bindery_xpath::{ElementId, Node};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::element::{BoundElement, BuildDecision, Repeat, decide};
use crate::env::Env;
use crate::error::EngineError;

#[derive(Debug)]
struct UiSlot {
    element: Box<dyn BoundElement>,
    parent: Option<ElementId>,
    /// Children; for a repeat, the template its items are cloned from.
    children: Vec<ElementId>,
    /// Per-item clones of a repeat's template.
    items: Vec<Vec<ElementId>>,
    template: bool,
}

#[derive(Debug, Default)]
pub struct UiTree {
    slots: Vec<Option<UiSlot>>,
    roots: Vec<ElementId>,
}

struct Pass<'a> {
    env: &'a Env,
    diagnostics: &'a mut Diagnostics,
    force_refresh: bool,
    trace: bool,
}

impl UiTree {
    /// Add an element. Elements added below a repeat become part of its
    /// template and are only ever built as clones.
    pub(crate) fn insert(
        &mut self,
        parent: Option<ElementId>,
        element: Box<dyn BoundElement>,
    ) -> Result<ElementId, EngineError> {
        let template = match parent {
            Some(p) => {
                let slot = self.slot(p).ok_or_else(|| EngineError::UnknownElement(p.to_string()))?;
                slot.template || slot.element.as_repeat().is_some()
            }
            None => false,
        };
        let id = self.push(UiSlot { element, parent, children: Vec::new(), items: Vec::new(), template });
        match parent.and_then(|p| self.slot_mut(p)) {
            Some(slot) => slot.children.push(id),
            None => self.roots.push(id),
        }
        Ok(id)
    }

    fn push(&mut self, slot: UiSlot) -> ElementId {
        let id = ElementId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX));
        self.slots.push(Some(slot));
        id
    }

    fn slot(&self, id: ElementId) -> Option<&UiSlot> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: ElementId) -> Option<&mut UiSlot> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn get(&self, id: ElementId) -> Option<&dyn BoundElement> {
        self.slot(id).map(|s| s.element.as_ref())
    }

    pub(crate) fn repeat_mut(&mut self, id: ElementId) -> Option<&mut Repeat> {
        self.slot_mut(id).and_then(|s| s.element.as_repeat_mut())
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.slot(id).and_then(|s| s.parent)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.slot(id).map_or(&[], |s| s.children.as_slice())
    }

    /// Item clones of a repeat, one list per item.
    pub fn items(&self, id: ElementId) -> &[Vec<ElementId>] {
        self.slot(id).map_or(&[], |s| s.items.as_slice())
    }

    pub fn is_template(&self, id: ElementId) -> bool {
        self.slot(id).is_some_and(|s| s.template)
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// Live element ids, templates included.
    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| ElementId(u32::try_from(i).unwrap_or(u32::MAX)))
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One depth-first build+refresh pass from the roots, rooted at the
    /// default instance.
    pub(crate) fn build(&mut self, env: &Env, diagnostics: &mut Diagnostics, force_refresh: bool, trace: bool) {
        let mut pass = Pass { env, diagnostics, force_refresh, trace };
        let root = env.default_root();
        for id in self.roots.clone() {
            self.build_element(id, root.as_ref(), true, &mut pass);
        }
    }

    fn build_element(&mut self, id: ElementId, ctx: Option<&Node>, selected: bool, pass: &mut Pass<'_>) {
        let env = pass.env;
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        let element = slot.element.as_mut();
        let mut decision = decide(element, ctx, env);
        if pass.force_refresh && decision == BuildDecision::Skip {
            decision = BuildDecision::Refresh;
        }
        if pass.trace {
            tracing::debug!(element = %id, name = element.name().unwrap_or(""), ?decision, "build decision");
        } else {
            tracing::trace!(element = %id, ?decision, "build decision");
        }
        if decision == BuildDecision::Build {
            element.deps_mut().begin_build(ctx, env.forms.tags());
            env.profiler.count_build();
            if let Err(error) = element.build(ctx, env) {
                element.clear_result();
                pass.diagnostics.push(Diagnostic::from_error(Some(id), element.name(), &error));
            }
        }
        if selected {
            env.host.observe(id, element, &env.changes);
        }
        let child_ctx = element.bound_node().cloned().or_else(|| ctx.cloned());
        let repeat = element.as_repeat().map(|r| (r.nodes().to_vec(), r.index()));

        match repeat {
            // An empty repeat has no items; stale clones were disposed.
            Some((nodes, index)) => {
                if decision == BuildDecision::Build {
                    self.sync_items(id, nodes.len(), env);
                }
                let items = self.items(id).to_vec();
                for (i, item) in items.iter().enumerate() {
                    let node = nodes.get(i);
                    for child in item {
                        self.build_element(*child, node, selected && index == i + 1, pass);
                    }
                }
            }
            None => {
                for child in self.children(id).to_vec() {
                    self.build_element(child, child_ctx.as_ref(), selected, pass);
                }
            }
        }

        if decision != BuildDecision::Skip
            && let Some(slot) = self.slot_mut(id)
        {
            slot.element.refresh(env);
            env.profiler.count_refresh();
        }
    }

    /// Grow or shrink a repeat's items to `count`.
    fn sync_items(&mut self, id: ElementId, count: usize, env: &Env) {
        let Some(slot) = self.slot(id) else {
            return;
        };
        let template = slot.children.clone();
        let existing = slot.items.len();
        if count > existing {
            for _ in existing..count {
                let item: Vec<ElementId> = template.iter().filter_map(|t| self.clone_subtree(*t, id, env)).collect();
                if let Some(slot) = self.slot_mut(id) {
                    slot.items.push(item);
                }
            }
        } else if count < existing {
            let removed = self.slot_mut(id).map(|s| s.items.split_off(count)).unwrap_or_default();
            for child in removed.into_iter().flatten() {
                self.dispose_subtree(child, env);
            }
        }
    }

    fn clone_subtree(&mut self, source: ElementId, parent: ElementId, env: &Env) -> Option<ElementId> {
        let slot = self.slot(source)?;
        let mut element = slot.element.clone_element();
        element.init(&env.forms);
        let is_repeat = element.as_repeat().is_some();
        let children = slot.children.clone();
        let id = self.push(UiSlot { element, parent: Some(parent), children: Vec::new(), items: Vec::new(), template: false });
        // Nested repeats share their template; other elements own copies.
        let children =
            if is_repeat { children } else { children.into_iter().filter_map(|c| self.clone_subtree(c, id, env)).collect() };
        self.slot_mut(id)?.children = children;
        Some(id)
    }

    fn dispose_subtree(&mut self, id: ElementId, env: &Env) {
        let Some(mut slot) = self.slots.get_mut(id.0 as usize).and_then(Option::take) else {
            return;
        };
        slot.element.dispose(env.forms.tags());
        env.host.forget(id);
        let is_repeat = slot.element.as_repeat().is_some();
        for child in slot.items.into_iter().flatten() {
            self.dispose_subtree(child, env);
        }
        if !is_repeat {
            for child in slot.children {
                self.dispose_subtree(child, env);
            }
        }
    }

    /// Dispose every element, templates included.
    pub(crate) fn dispose_all(&mut self, env: &Env) {
        for slot in self.slots.iter_mut().flatten() {
            slot.element.dispose(env.forms.tags());
        }
        self.slots.clear();
        self.roots.clear();
    }
}
