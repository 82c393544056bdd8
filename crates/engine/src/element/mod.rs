//! Dependency-tracked elements: headless groups, controls and repeats.
use core::fmt;

use bindery_xpath::{DepElement, DependencySet, DependencyTags, Node};

use crate::binding::{Binding, BindingSpec};
use crate::env::Env;
use crate::error::EngineError;
use crate::forms::FormContext;

mod control;
mod group;
mod repeat;

pub use control::Control;
pub use group::Group;
pub use repeat::Repeat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Group,
    Control,
    Repeat,
}

/// Declaration of an element added to the UI tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSpec {
    pub kind: ElementKind,
    pub name: Option<String>,
    pub binding: Option<BindingSpec>,
}

impl ElementSpec {
    /// Unbound group; children inherit the context node.
    pub fn group() -> Self {
        Self { kind: ElementKind::Group, name: None, binding: None }
    }

    pub fn bound_group(binding: BindingSpec) -> Self {
        Self { kind: ElementKind::Group, name: None, binding: Some(binding) }
    }

    /// Input/output style control: bound to a node, or showing the value of
    /// a non-node-set expression.
    pub fn control(binding: BindingSpec) -> Self {
        Self { kind: ElementKind::Control, name: None, binding: Some(binding) }
    }

    pub fn repeat(binding: BindingSpec) -> Self {
        Self { kind: ElementKind::Repeat, name: None, binding: Some(binding) }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub(crate) fn instantiate(&self, env: &Env) -> Result<Box<dyn BoundElement>, EngineError> {
        let binding = self.binding.as_ref().map(|spec| Binding::compile(spec, env)).transpose()?;
        let name = self.name.clone();
        let deps = ElementDeps::new(&env.forms);
        Ok(match (self.kind, binding) {
            (ElementKind::Group, binding) => Box::new(Group::new(name, binding, deps)),
            (ElementKind::Control, Some(binding)) => Box::new(Control::new(name, binding, deps)),
            (ElementKind::Repeat, Some(binding)) => Box::new(Repeat::new(name, binding, deps)),
            (kind, None) => {
                return Err(EngineError::UnknownElement(format!(
                    "{kind:?} {} has no binding",
                    self.name.as_deref().unwrap_or("<anonymous>")
                )));
            }
        })
    }
}

/// Build-time and refresh-time dependency sets of one element, plus the
/// context node of its last build.
///
/// Build dependencies (nodes and aggregate elements read while resolving
/// the binding) force a rebuild when they change; refresh dependencies (the
/// bound node itself) only force a refresh.
#[derive(Debug, Clone)]
pub struct ElementDeps {
    pub(crate) build: DependencySet,
    pub(crate) refresh: DependencySet,
    context: Option<Node>,
    built: bool,
}

impl ElementDeps {
    pub(crate) fn new(forms: &FormContext) -> Self {
        Self {
            build: DependencySet::new(forms.mint_set_id()),
            refresh: DependencySet::new(forms.mint_set_id()),
            context: None,
            built: false,
        }
    }

    pub fn build_nodes(&self) -> &[Node] {
        self.build.nodes()
    }

    pub fn refresh_nodes(&self) -> &[Node] {
        self.refresh.nodes()
    }

    pub fn elements(&self) -> &[DepElement] {
        self.build.elements()
    }

    pub fn context(&self) -> Option<&Node> {
        self.context.as_ref()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub(crate) fn begin_build(&mut self, ctx: Option<&Node>, tags: &DependencyTags) {
        self.clear(tags);
        self.context = ctx.cloned();
        self.built = true;
    }

    pub(crate) fn clear(&mut self, tags: &DependencyTags) {
        self.build.clear(tags);
        self.refresh.clear(tags);
    }
}

/// Headless rendering snapshot produced by a refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Presentation {
    pub value: Option<String>,
    pub relevant: bool,
    pub readonly: bool,
    pub required: bool,
    pub valid: bool,
}

impl Presentation {
    pub(crate) fn of_node(node: &Node, env: &Env) -> Self {
        let props = env.properties(node);
        let value = node
            .owner_model()
            .and_then(|id| env.models.get(id.0 as usize))
            .map_or_else(|| node.value(), |model| model.node_type(node, env).format(&node.value()));
        Self {
            value: Some(value),
            relevant: props.relevant,
            readonly: props.readonly,
            required: props.required,
            valid: props.valid,
        }
    }

    pub(crate) fn computed(value: String) -> Self {
        Self { value: Some(value), relevant: true, readonly: true, required: false, valid: true }
    }
}

/// Capability set every dependency-tracked element implements.
pub trait BoundElement: fmt::Debug {
    fn kind(&self) -> ElementKind;
    fn name(&self) -> Option<&str>;
    fn binding(&self) -> Option<&Binding>;
    fn deps(&self) -> &ElementDeps;
    fn deps_mut(&mut self) -> &mut ElementDeps;

    /// Mint fresh dependency set ids; called for every new instance,
    /// including repeat clones.
    fn init(&mut self, forms: &FormContext) {
        *self.deps_mut() = ElementDeps::new(forms);
    }

    /// Re-resolve the binding at `ctx`. Dependencies were cleared by the
    /// caller.
    fn build(&mut self, ctx: Option<&Node>, env: &Env) -> Result<(), EngineError>;

    /// Drop the binding result after a failed build.
    fn clear_result(&mut self);

    /// Recompute the presentation; returns whether it changed.
    fn refresh(&mut self, env: &Env) -> bool;

    /// Release every dependency tag this element holds.
    fn dispose(&mut self, tags: &DependencyTags) {
        self.deps_mut().clear(tags);
    }

    /// Unbuilt copy for a repeat item; `init` must run before use.
    fn clone_element(&self) -> Box<dyn BoundElement>;

    /// Node children are built against; unbound elements pass their context
    /// through.
    fn bound_node(&self) -> Option<&Node>;

    fn presentation(&self) -> &Presentation;

    /// Number of refreshes that changed the presentation.
    fn mutations(&self) -> u64;

    fn as_repeat(&self) -> Option<&Repeat> {
        None
    }

    fn as_repeat_mut(&mut self) -> Option<&mut Repeat> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BuildDecision {
    Skip,
    Refresh,
    Build,
}

/// Whether an element must rebuild, only refresh, or can be skipped in the
/// current pass.
pub(crate) fn decide(element: &dyn BoundElement, ctx: Option<&Node>, env: &Env) -> BuildDecision {
    let deps = element.deps();
    if !deps.built || deps.context.as_ref() != ctx {
        return BuildDecision::Build;
    }
    if element.binding().is_none() {
        return BuildDecision::Skip;
    }
    if deps.build.elements().is_empty() {
        return BuildDecision::Build;
    }
    let tags = env.forms.tags();
    let mut refresh = false;
    for dep in deps.build.elements() {
        if !env.changes.contains(*dep) {
            continue;
        }
        let DepElement::Model(id) = dep else {
            return BuildDecision::Build;
        };
        let Ok(model) = env.model(*id) else {
            return BuildDecision::Build;
        };
        if model.is_rebuilt() {
            return BuildDecision::Build;
        }
        let changed = model.changed_nodes();
        if changed.iter().any(|n| deps.build.contains_node(n, tags)) {
            return BuildDecision::Build;
        }
        if changed.iter().any(|n| deps.refresh.contains_node(n, tags)) {
            refresh = true;
        }
    }
    if refresh { BuildDecision::Refresh } else { BuildDecision::Skip }
}

/// Resolve `binding` recording into the element's build set.
pub(crate) fn resolve(
    binding: &Binding,
    deps: &mut ElementDeps,
    ctx: Option<&Node>,
    env: &Env,
) -> Result<bindery_xpath::Value, EngineError> {
    let sink = deps.build.recorder(env.forms.tags());
    binding.evaluate(ctx, env, Some(&sink))
}

/// Store `next` and count the mutation when it differs.
pub(crate) fn update_presentation(current: &mut Presentation, mutations: &mut u64, next: Presentation) -> bool {
    if *current == next {
        return false;
    }
    *current = next;
    *mutations += 1;
    true
}
