//! The action engine: transaction scopes and the fixed-point flush.
use bindery_xpath::{DepElement, ElementId, ModelId, Node, Value};

use crate::actions::Action;
use crate::config::EngineConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::element::{BoundElement, ElementSpec, Presentation};
use crate::env::Env;
use crate::error::EngineError;
use crate::forms::FormContext;
use crate::model::bind::Bind;
use crate::model::{BindId, BindSpec, Instance, ItemProperties, Model};
use crate::profiling::Profiler;
use crate::ui::UiTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    InAction,
    Flushing,
}

/// Owns the form context, models, binds and UI tree, and drives every
/// change through rebuild → recalculate → revalidate → refresh.
///
/// Mutations happen inside action scopes; closing the outermost scope
/// flushes until no changes remain.
#[derive(Debug)]
pub struct ActionEngine {
    config: EngineConfig,
    pub(crate) env: Env,
    pub(crate) tree: UiTree,
    diagnostics: Diagnostics,
    depth: usize,
    flushing: bool,
    pub(crate) force_refresh: bool,
}

impl ActionEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self::with_forms(config, FormContext::new()?))
    }

    pub fn with_forms(config: EngineConfig, forms: FormContext) -> Self {
        let profiler = Profiler::new(config.profiling);
        Self {
            config,
            env: Env::new(forms, profiler),
            tree: UiTree::default(),
            diagnostics: Diagnostics::default(),
            depth: 0,
            flushing: false,
            force_refresh: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn forms(&self) -> &FormContext {
        &self.env.forms
    }

    pub fn forms_mut(&mut self) -> &mut FormContext {
        &mut self.env.forms
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn tree(&self) -> &UiTree {
        &self.tree
    }

    pub fn profiler(&self) -> &Profiler {
        &self.env.profiler
    }

    // ---- declaration ------------------------------------------------------

    pub fn add_model(&mut self, name: &str) -> ModelId {
        let id = ModelId(u32::try_from(self.env.models.len()).unwrap_or(u32::MAX));
        self.env.models.push(Model::new(id, name));
        self.env.model_names.insert(name.to_string(), id);
        tracing::debug!(model = %id, name, "model declared");
        id
    }

    pub fn add_instance(&mut self, model: ModelId, name: &str, xml: &str) -> Result<(), EngineError> {
        let instance = Instance::parse(name, xml, model)?;
        self.model_mut(model)?.add_instance(instance);
        Ok(())
    }

    pub fn add_instance_document(&mut self, model: ModelId, name: &str, document: Node) -> Result<(), EngineError> {
        let instance = Instance::from_document(name, document, model);
        self.model_mut(model)?.add_instance(instance);
        Ok(())
    }

    /// Declare a bind, nested below `parent` when given.
    pub fn add_bind(&mut self, model: ModelId, parent: Option<BindId>, spec: &BindSpec) -> Result<BindId, EngineError> {
        self.env.model(model)?;
        if let Some(parent) = parent {
            self.env.binds.require(parent)?;
        }
        let id = self.env.binds.next_id();
        let bind = Bind::compile(id, model, parent, spec, &self.env.forms)?;
        self.env.binds.push(bind);
        if parent.is_none() {
            self.model_mut(model)?.add_root_bind(id);
        }
        Ok(id)
    }

    pub fn add_element(&mut self, parent: Option<ElementId>, spec: &ElementSpec) -> Result<ElementId, EngineError> {
        let element = spec.instantiate(&self.env)?;
        let repeat = element.as_repeat().is_some();
        let id = self.tree.insert(parent, element)?;
        if let Some(name) = &spec.name {
            self.env.host.declare(id, name, repeat);
        }
        Ok(id)
    }

    fn model_mut(&mut self, id: ModelId) -> Result<&mut Model, EngineError> {
        self.env.models.get_mut(id.0 as usize).ok_or_else(|| EngineError::UnknownModel(id.to_string()))
    }

    /// Construct every model and build the UI.
    pub fn start(&mut self) -> Result<(), EngineError> {
        tracing::debug!(models = self.env.models.len(), elements = self.tree.len(), "starting");
        self.in_action(|engine| {
            for model in &engine.env.models {
                model.mark_rebuilt(&engine.env.changes);
            }
            engine.force_refresh = true;
            Ok(())
        })
    }

    // ---- transaction scopes -------------------------------------------------

    pub fn state(&self) -> EngineState {
        if self.flushing {
            EngineState::Flushing
        } else if self.depth > 0 {
            EngineState::InAction
        } else {
            EngineState::Idle
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn open_action(&mut self) {
        self.depth += 1;
    }

    /// Close a scope; closing the outermost one flushes.
    pub fn close_action(&mut self) -> Result<(), EngineError> {
        match self.depth {
            0 => {
                tracing::warn!("close_action without a matching open_action");
                Ok(())
            }
            1 => {
                let result = if self.flushing { Ok(()) } else { self.flush() };
                self.depth = 0;
                result
            }
            _ => {
                self.depth -= 1;
                Ok(())
            }
        }
    }

    /// Run `f` inside an action scope. The scope is closed even when `f`
    /// fails; the first error wins.
    pub fn in_action<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R, EngineError>) -> Result<R, EngineError> {
        self.open_action();
        let result = f(self);
        let closed = self.close_action();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Execute `action` in its own scope, in the context of `element`'s
    /// bound node (or the default instance root).
    pub fn run_action(&mut self, action: &Action, element: Option<ElementId>) -> Result<(), EngineError> {
        let ctx = match element {
            Some(id) => {
                let element = self.tree.get(id).ok_or_else(|| EngineError::UnknownElement(id.to_string()))?;
                element.bound_node().cloned().or_else(|| self.env.default_root())
            }
            None => self.env.default_root(),
        };
        self.in_action(|engine| engine.execute(action, ctx.as_ref()))
    }

    /// Drain pending changes to a fixed point.
    pub fn flush(&mut self) -> Result<(), EngineError> {
        self.flushing = true;
        let reported = self.diagnostics.len();
        let result = self.drain();
        self.flushing = false;
        self.diagnostics.report_since(reported);
        self.env.profiler.count_flush();
        if result.is_err() {
            self.env.clear_changes();
            self.force_refresh = false;
        }
        result
    }

    fn drain(&mut self) -> Result<(), EngineError> {
        let cap = self.config.max_flush_iterations;
        let mut iteration = 0;
        while !self.env.changes.is_empty() || self.force_refresh {
            if iteration == cap {
                let error = EngineError::FlushDiverged { iterations: cap };
                self.diagnostics.push(Diagnostic::from_error(None, None, &error));
                return Err(error);
            }
            iteration += 1;
            self.env.profiler.count_iteration();
            tracing::debug!(iteration, changes = self.env.changes.len(), "flush iteration");
            let requeue = self.update_models()?;
            self.build_pass();
            for id in requeue {
                self.env.changes.add(DepElement::Model(id));
            }
        }
        Ok(())
    }

    /// Rebuild (when flagged), recalculate and revalidate every changed
    /// model. Returns the models whose recalculation changed values.
    /// Evaluation failures become diagnostics; structural errors abort.
    fn update_models(&mut self) -> Result<Vec<ModelId>, EngineError> {
        let env = &self.env;
        let diagnostics = &mut self.diagnostics;
        let mut requeue = Vec::new();
        for change in env.changes.snapshot() {
            let DepElement::Model(id) = change else {
                continue;
            };
            let model = env.model(id)?;
            if model.is_rebuilt() {
                model.rebuild(env, diagnostics)?;
            }
            if model.recalculate(env, diagnostics)? {
                requeue.push(id);
            }
            model.revalidate(env, diagnostics)?;
        }
        Ok(requeue)
    }

    fn build_pass(&mut self) {
        self.env.changes.begin_build();
        self.tree.build(&self.env, &mut self.diagnostics, self.force_refresh, self.config.trace_builds);
        self.env.changes.end_build();
        for model in &self.env.models {
            model.swap_changes();
        }
        self.force_refresh = false;
    }

    /// Refresh every element in its own scope, rebuilding only where
    /// dependencies say so.
    pub fn refresh(&mut self) -> Result<(), EngineError> {
        self.in_action(|engine| {
            engine.force_refresh = true;
            Ok(())
        })
    }

    // ---- mutations ----------------------------------------------------------

    /// Write `value` into `node` and register the change.
    pub fn set_value(&mut self, node: &Node, value: &str) -> Result<(), EngineError> {
        self.in_action(|engine| {
            engine.write_value(node, value);
            Ok(())
        })
    }

    pub(crate) fn write_value(&self, node: &Node, value: &str) {
        if node.value() == value {
            return;
        }
        tracing::debug!(node = %node.node_name(), value, "setvalue");
        node.set_value(value);
        self.env.register_change(node);
    }

    /// Select item `index` of the named repeat.
    pub fn set_repeat_index(&mut self, repeat: &str, index: usize) -> Result<(), EngineError> {
        self.in_action(|engine| engine.select_repeat_item(repeat, index))
    }

    pub(crate) fn select_repeat_item(&mut self, repeat: &str, index: usize) -> Result<(), EngineError> {
        let (id, _) = self.env.host.repeat_index(repeat).ok_or_else(|| EngineError::UnknownElement(repeat.to_string()))?;
        let element = self.tree.repeat_mut(id).ok_or_else(|| EngineError::UnknownElement(repeat.to_string()))?;
        if !element.set_index(index) {
            return Ok(());
        }
        let model = element.bound_node().and_then(Node::owner_model);
        tracing::debug!(repeat, index, "setindex");
        self.publish_repeat_index(id);
        if let Some(model) = model {
            self.env.changes.add(DepElement::Model(model));
        }
        Ok(())
    }

    /// Make a repeat's new index visible to `index()` and invalidate its
    /// dependents.
    pub(crate) fn publish_repeat_index(&self, id: ElementId) {
        let Some(repeat) = self.tree.get(id).and_then(BoundElement::as_repeat) else {
            return;
        };
        if let Some(name) = repeat.name() {
            self.env.host.set_repeat_index(name, id, repeat.index());
        }
        self.env.changes.add(DepElement::Element(id));
    }

    // ---- inspection ---------------------------------------------------------

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn model(&self, id: ModelId) -> Result<&Model, EngineError> {
        self.env.model(id)
    }

    pub fn model_id(&self, name: &str) -> Result<ModelId, EngineError> {
        self.env.model_id(name)
    }

    pub fn element(&self, id: ElementId) -> Option<&dyn BoundElement> {
        self.tree.get(id)
    }

    /// The named element on the selected path (inside repeats, the clone in
    /// the current item). Repeat templates are never returned.
    pub fn element_named(&self, name: &str) -> Option<&dyn BoundElement> {
        let (id, _) = self.env.host.bound_node(name)?;
        if self.tree.is_template(id) {
            return None;
        }
        self.tree.get(id)
    }

    pub fn presentation(&self, name: &str) -> Option<&Presentation> {
        self.element_named(name).map(BoundElement::presentation)
    }

    /// Node-list of the bind declared with `id`.
    pub fn bind_nodes(&self, id: &str) -> Result<Vec<Node>, EngineError> {
        self.env.binds.by_name(id).map(Bind::nodes).ok_or_else(|| EngineError::BindingNotFound(id.to_string()))
    }

    pub fn properties(&self, node: &Node) -> ItemProperties {
        self.env.properties(node)
    }

    /// Default instance root of the first model.
    pub fn default_root(&self) -> Option<Node> {
        self.env.default_root()
    }

    /// Evaluate `xpath` at the default instance root, outside any build.
    pub fn evaluate(&self, xpath: &str) -> Result<Value, EngineError> {
        let expr = self.env.forms.compile(xpath)?;
        match self.env.default_root() {
            Some(root) => self.env.evaluate(&expr, &root, None, 1, 1, None),
            None => Ok(Value::empty()),
        }
    }

    /// Release every dependency tag held by elements and binds.
    pub fn teardown(&mut self) {
        self.tree.dispose_all(&self.env);
        for i in 0..self.env.binds.len() {
            if let Some(bind) = self.env.binds.get(BindId(u32::try_from(i).unwrap_or(u32::MAX))) {
                bind.reset(self.env.forms.tags());
            }
        }
        self.env.clear_changes();
        tracing::debug!(tags = self.env.forms.tags().len(), "torn down");
    }
}
