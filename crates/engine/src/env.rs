use bindery_xpath::{
    DependencyRecorder, ElementId, ExprContext, Expression, HostEnvironment, ModelId, Node, Value,
};
use rustc_hash::FxHashMap;

use crate::changes::ChangeTracker;
use crate::error::EngineError;
use crate::forms::FormContext;
use crate::host::HostState;
use crate::model::bind::BindArena;
use crate::model::{ItemProperties, Model};
use crate::profiling::Profiler;

/// Everything an evaluation may consult: registries, models, binds and the
/// host bookkeeping. Shared immutably during flush phases; mutable state
/// sits behind cells.
#[derive(Debug)]
pub struct Env {
    pub(crate) forms: FormContext,
    pub(crate) models: Vec<Model>,
    pub(crate) model_names: FxHashMap<String, ModelId>,
    pub(crate) binds: BindArena,
    pub(crate) host: HostState,
    pub(crate) changes: ChangeTracker,
    pub(crate) profiler: Profiler,
}

impl Env {
    pub(crate) fn new(forms: FormContext, profiler: Profiler) -> Self {
        Self {
            forms,
            models: Vec::new(),
            model_names: FxHashMap::default(),
            binds: BindArena::default(),
            host: HostState::default(),
            changes: ChangeTracker::default(),
            profiler,
        }
    }

    pub fn forms(&self) -> &FormContext {
        &self.forms
    }

    pub fn model(&self, id: ModelId) -> Result<&Model, EngineError> {
        self.models.get(id.0 as usize).ok_or_else(|| EngineError::UnknownModel(id.to_string()))
    }

    pub fn model_id(&self, name: &str) -> Result<ModelId, EngineError> {
        self.model_names.get(name).copied().ok_or_else(|| EngineError::UnknownModel(name.to_string()))
    }

    /// Default instance root of the first model.
    pub fn default_root(&self) -> Option<Node> {
        self.models.first().and_then(Model::default_root)
    }

    /// Evaluate `expr` at `node` with this environment as host.
    pub fn evaluate(
        &self,
        expr: &Expression,
        node: &Node,
        current: Option<&Node>,
        position: usize,
        size: usize,
        deps: Option<&dyn DependencyRecorder>,
    ) -> Result<Value, EngineError> {
        let mut ctx = ExprContext::new(node, self.forms.namespaces(), self.forms.functions())
            .with_position(position, size)
            .with_host(self);
        if let Some(current) = current {
            ctx = ctx.with_current(current);
        }
        if let Some(deps) = deps {
            ctx = ctx.with_deps(deps);
        }
        self.profiler
            .time(expr.source(), || expr.evaluate(&ctx))
            .map_err(|source| EngineError::evaluation(expr.source(), source))
    }

    /// Register a mutated instance node with its owning model.
    pub(crate) fn register_change(&self, node: &Node) {
        match node.owner_model().and_then(|id| self.models.get(id.0 as usize)) {
            Some(model) => model.add_change(node, &self.changes),
            None => tracing::debug!(node = %node.node_name(), "change outside any model ignored"),
        }
    }

    pub(crate) fn mark_rebuilt(&self, id: ModelId) -> Result<(), EngineError> {
        self.model(id)?.mark_rebuilt(&self.changes);
        Ok(())
    }

    pub fn properties(&self, node: &Node) -> ItemProperties {
        node.owner_model()
            .and_then(|id| self.models.get(id.0 as usize))
            .map(|model| model.properties(node))
            .unwrap_or_default()
    }

    pub(crate) fn clear_changes(&self) {
        self.changes.clear();
        for model in &self.models {
            model.clear_changes();
        }
    }
}

impl HostEnvironment for Env {
    fn instance_root(&self, id: &str) -> Option<Node> {
        self.models.iter().find_map(|model| model.instance(id)).and_then(crate::model::Instance::root)
    }

    fn repeat_index(&self, repeat_id: &str) -> Option<(ElementId, usize)> {
        self.host.repeat_index(repeat_id)
    }

    fn bound_node(&self, element_id: &str) -> Option<(ElementId, Option<Node>)> {
        self.host.bound_node(element_id)
    }

    fn is_valid(&self, node: &Node) -> bool {
        node.owner_model().and_then(|id| self.models.get(id.0 as usize)).is_none_or(|model| model.is_valid_deep(node))
    }
}
