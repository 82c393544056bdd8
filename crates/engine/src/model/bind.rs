use core::fmt;
use std::cell::RefCell;
use std::rc::Rc;

use bindery_schema::TypeRef;
use bindery_xpath::{DependencySet, DependencyTags, Expression, ModelId, Node};
use rustc_hash::FxHashMap;

use crate::error::EngineError;
use crate::forms::FormContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindId(pub(crate) u32);

impl fmt::Display for BindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bind#{}", self.0)
    }
}

/// Declaration of a bind: a nodeset expression plus optional type and
/// model item property expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindSpec {
    pub id: Option<String>,
    pub nodeset: String,
    pub type_name: Option<String>,
    pub readonly: Option<String>,
    pub required: Option<String>,
    pub relevant: Option<String>,
    pub calculate: Option<String>,
    pub constraint: Option<String>,
}

impl BindSpec {
    pub fn new(nodeset: impl Into<String>) -> Self {
        Self { nodeset: nodeset.into(), ..Self::default() }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, qname: impl Into<String>) -> Self {
        self.type_name = Some(qname.into());
        self
    }

    #[must_use]
    pub fn with_readonly(mut self, xpath: impl Into<String>) -> Self {
        self.readonly = Some(xpath.into());
        self
    }

    #[must_use]
    pub fn with_required(mut self, xpath: impl Into<String>) -> Self {
        self.required = Some(xpath.into());
        self
    }

    #[must_use]
    pub fn with_relevant(mut self, xpath: impl Into<String>) -> Self {
        self.relevant = Some(xpath.into());
        self
    }

    #[must_use]
    pub fn with_calculate(mut self, xpath: impl Into<String>) -> Self {
        self.calculate = Some(xpath.into());
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, xpath: impl Into<String>) -> Self {
        self.constraint = Some(xpath.into());
        self
    }
}

#[derive(Debug)]
pub(crate) struct BindState {
    pub(crate) nodes: Vec<Node>,
    pub(crate) deps: DependencySet,
}

/// Compiled bind. Its resolved node-list and dependency set are recomputed
/// on rebuild and only consulted otherwise.
#[derive(Debug)]
pub struct Bind {
    id: BindId,
    name: Option<String>,
    model: ModelId,
    parent: Option<BindId>,
    children: Vec<BindId>,
    pub(crate) nodeset: Rc<Expression>,
    pub(crate) ty: Option<TypeRef>,
    pub(crate) readonly: Option<Rc<Expression>>,
    pub(crate) required: Option<Rc<Expression>>,
    pub(crate) relevant: Option<Rc<Expression>>,
    pub(crate) calculate: Option<Rc<Expression>>,
    pub(crate) constraint: Option<Rc<Expression>>,
    pub(crate) state: RefCell<BindState>,
}

impl Bind {
    pub(crate) fn compile(
        id: BindId,
        model: ModelId,
        parent: Option<BindId>,
        spec: &BindSpec,
        forms: &FormContext,
    ) -> Result<Self, EngineError> {
        let optional = |source: &Option<String>| source.as_deref().map(|s| forms.compile(s)).transpose();
        Ok(Self {
            id,
            name: spec.id.clone(),
            model,
            parent,
            children: Vec::new(),
            nodeset: forms.compile(&spec.nodeset)?,
            ty: spec.type_name.as_deref().map(|t| forms.resolve_type(t)).transpose()?,
            readonly: optional(&spec.readonly)?,
            required: optional(&spec.required)?,
            relevant: optional(&spec.relevant)?,
            calculate: optional(&spec.calculate)?,
            constraint: optional(&spec.constraint)?,
            state: RefCell::new(BindState { nodes: Vec::new(), deps: DependencySet::new(forms.mint_set_id()) }),
        })
    }

    pub fn id(&self) -> BindId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name when declared with one, the arena id otherwise.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn parent(&self) -> Option<BindId> {
        self.parent
    }

    pub fn children(&self) -> &[BindId] {
        &self.children
    }

    pub fn nodeset(&self) -> &str {
        self.nodeset.source()
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.state.borrow().nodes.clone()
    }

    pub(crate) fn reset(&self, tags: &DependencyTags) {
        let mut state = self.state.borrow_mut();
        state.nodes.clear();
        state.deps.clear(tags);
    }
}

/// All binds of a form, addressed by [`BindId`] or by declared id.
#[derive(Debug, Default)]
pub(crate) struct BindArena {
    binds: Vec<Bind>,
    names: FxHashMap<String, BindId>,
}

impl BindArena {
    pub(crate) fn next_id(&self) -> BindId {
        BindId(u32::try_from(self.binds.len()).unwrap_or(u32::MAX))
    }

    pub(crate) fn push(&mut self, bind: Bind) -> BindId {
        let id = bind.id;
        if let Some(parent) = bind.parent.and_then(|p| self.binds.get_mut(p.0 as usize)) {
            parent.children.push(id);
        }
        if let Some(name) = &bind.name {
            self.names.insert(name.clone(), id);
        }
        self.binds.push(bind);
        id
    }

    pub(crate) fn get(&self, id: BindId) -> Option<&Bind> {
        self.binds.get(id.0 as usize)
    }

    pub(crate) fn by_name(&self, name: &str) -> Option<&Bind> {
        self.names.get(name).and_then(|id| self.get(*id))
    }

    pub(crate) fn require(&self, id: BindId) -> Result<&Bind, EngineError> {
        self.get(id).ok_or_else(|| EngineError::BindingNotFound(id.to_string()))
    }

    pub(crate) fn len(&self) -> usize {
        self.binds.len()
    }
}
