//! Binding resolution: a reference to a declared bind, or an expression
//! evaluated fresh.
use std::rc::Rc;

use bindery_xpath::{DependencySink, Expression, ModelId, Node, Value};

use crate::env::Env;
use crate::error::EngineError;

/// How an element or action declares its binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSpec {
    /// Reuse the node-list of the bind with this id.
    Bind(String),
    /// Evaluate `xpath` at the context node, or at the default instance of
    /// `model` when one is named.
    Ref { xpath: String, model: Option<String> },
}

impl BindingSpec {
    pub fn bind(id: impl Into<String>) -> Self {
        Self::Bind(id.into())
    }

    pub fn xpath(xpath: impl Into<String>) -> Self {
        Self::Ref { xpath: xpath.into(), model: None }
    }

    #[must_use]
    pub fn in_model(self, name: impl Into<String>) -> Self {
        match self {
            Self::Ref { xpath, .. } => Self::Ref { xpath, model: Some(name.into()) },
            bind @ Self::Bind(_) => bind,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Binding {
    Bind(String),
    Expr { expr: Rc<Expression>, model: Option<ModelId> },
}

impl Binding {
    /// Compile a spec. Bind ids are resolved lazily so elements may refer
    /// to binds declared later.
    pub(crate) fn compile(spec: &BindingSpec, env: &Env) -> Result<Self, EngineError> {
        Ok(match spec {
            BindingSpec::Bind(id) => Self::Bind(id.clone()),
            BindingSpec::Ref { xpath, model } => Self::Expr {
                expr: env.forms.compile(xpath)?,
                model: model.as_deref().map(|name| env.model_id(name)).transpose()?,
            },
        })
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Bind(id) => id,
            Self::Expr { expr, .. } => expr.source(),
        }
    }

    /// Resolve against `ctx`, funneling dependencies into `deps`. A bind
    /// reference copies the bind's own dependency set instead of
    /// re-evaluating.
    pub fn evaluate(&self, ctx: Option<&Node>, env: &Env, deps: Option<&DependencySink<'_>>) -> Result<Value, EngineError> {
        match self {
            Self::Bind(id) => {
                let bind = env.binds.by_name(id).ok_or_else(|| EngineError::BindingNotFound(id.clone()))?;
                let state = bind.state.borrow();
                if let Some(sink) = deps {
                    sink.absorb(&state.deps);
                }
                Ok(Value::NodeSet(state.nodes.clone()))
            }
            Self::Expr { expr, model } => {
                let root = match model {
                    Some(id) => env.model(*id)?.default_root(),
                    None => ctx.cloned(),
                };
                let Some(root) = root else {
                    return Ok(Value::empty());
                };
                let deps = deps.map(|sink| sink as &dyn bindery_xpath::DependencyRecorder);
                env.evaluate(expr, &root, ctx, 1, 1, deps)
            }
        }
    }

    /// Node-set result; other values are a type error.
    pub fn evaluate_nodes(
        &self,
        ctx: Option<&Node>,
        env: &Env,
        deps: Option<&DependencySink<'_>>,
    ) -> Result<Vec<Node>, EngineError> {
        self.evaluate(ctx, env, deps)?.into_nodeset().map_err(|e| EngineError::evaluation(self.source(), e))
    }
}
