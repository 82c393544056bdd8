//! Declarative actions. Every action runs inside an action scope, so its
//! mutations are flushed together when the outermost scope closes.
use bindery_xpath::{DepElement, Expression, Node, NodeKind};

use crate::binding::{Binding, BindingSpec};
use crate::engine::ActionEngine;
use crate::env::Env;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertPosition {
    Before,
    #[default]
    After,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Evaluated with the target node as context.
    Expr(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Sequence(Vec<Action>),
    SetValue {
        binding: BindingSpec,
        value: ValueSource,
    },
    Insert {
        binding: BindingSpec,
        origin: Option<String>,
        at: Option<String>,
        position: InsertPosition,
        context: Option<String>,
    },
    Delete {
        binding: BindingSpec,
        at: Option<String>,
        context: Option<String>,
    },
    SetIndex {
        repeat: String,
        index: String,
    },
    Rebuild {
        model: String,
    },
    Recalculate {
        model: String,
    },
    Revalidate {
        model: String,
    },
    Refresh {
        model: String,
    },
    Reset {
        model: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionKind,
    /// Checked before every execution.
    pub if_expr: Option<String>,
    /// Re-evaluated before every iteration.
    pub while_expr: Option<String>,
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self { kind, if_expr: None, while_expr: None }
    }

    pub fn sequence(actions: Vec<Action>) -> Self {
        Self::new(ActionKind::Sequence(actions))
    }

    pub fn set_value(binding: BindingSpec, xpath: impl Into<String>) -> Self {
        Self::new(ActionKind::SetValue { binding, value: ValueSource::Expr(xpath.into()) })
    }

    pub fn set_literal(binding: BindingSpec, literal: impl Into<String>) -> Self {
        Self::new(ActionKind::SetValue { binding, value: ValueSource::Literal(literal.into()) })
    }

    pub fn insert(binding: BindingSpec) -> Self {
        Self::new(ActionKind::Insert { binding, origin: None, at: None, position: InsertPosition::After, context: None })
    }

    pub fn delete(binding: BindingSpec) -> Self {
        Self::new(ActionKind::Delete { binding, at: None, context: None })
    }

    pub fn set_index(repeat: impl Into<String>, index: impl Into<String>) -> Self {
        Self::new(ActionKind::SetIndex { repeat: repeat.into(), index: index.into() })
    }

    pub fn rebuild(model: impl Into<String>) -> Self {
        Self::new(ActionKind::Rebuild { model: model.into() })
    }

    pub fn recalculate(model: impl Into<String>) -> Self {
        Self::new(ActionKind::Recalculate { model: model.into() })
    }

    pub fn revalidate(model: impl Into<String>) -> Self {
        Self::new(ActionKind::Revalidate { model: model.into() })
    }

    pub fn refresh(model: impl Into<String>) -> Self {
        Self::new(ActionKind::Refresh { model: model.into() })
    }

    pub fn reset(model: impl Into<String>) -> Self {
        Self::new(ActionKind::Reset { model: model.into() })
    }

    #[must_use]
    pub fn with_if(mut self, xpath: impl Into<String>) -> Self {
        self.if_expr = Some(xpath.into());
        self
    }

    #[must_use]
    pub fn with_while(mut self, xpath: impl Into<String>) -> Self {
        self.while_expr = Some(xpath.into());
        self
    }

    /// `at` of an insert or delete.
    #[must_use]
    pub fn with_at(mut self, xpath: impl Into<String>) -> Self {
        if let ActionKind::Insert { at, .. } | ActionKind::Delete { at, .. } = &mut self.kind {
            *at = Some(xpath.into());
        }
        self
    }

    /// `context` of an insert or delete.
    #[must_use]
    pub fn with_context(mut self, xpath: impl Into<String>) -> Self {
        if let ActionKind::Insert { context, .. } | ActionKind::Delete { context, .. } = &mut self.kind {
            *context = Some(xpath.into());
        }
        self
    }

    #[must_use]
    pub fn with_origin(mut self, xpath: impl Into<String>) -> Self {
        if let ActionKind::Insert { origin, .. } = &mut self.kind {
            *origin = Some(xpath.into());
        }
        self
    }

    #[must_use]
    pub fn with_position(mut self, value: InsertPosition) -> Self {
        if let ActionKind::Insert { position, .. } = &mut self.kind {
            *position = value;
        }
        self
    }
}

fn eval_nodes(env: &Env, source: &str, ctx: &Node) -> Result<Vec<Node>, EngineError> {
    let expr = env.forms.compile(source)?;
    env.evaluate(&expr, ctx, None, 1, 1, None)?.into_nodeset().map_err(|e| EngineError::evaluation(source, e))
}

fn eval_number(env: &Env, source: &str, ctx: &Node, size: usize) -> Result<f64, EngineError> {
    let expr = env.forms.compile(source)?;
    Ok(env.evaluate(&expr, ctx, None, 1, size, None)?.number_value())
}

fn test(env: &Env, expr: &Expression, ctx: &Node) -> Result<bool, EngineError> {
    Ok(env.evaluate(expr, ctx, None, 1, 1, None)?.boolean_value())
}

/// 1-based item position encoded as a number; fractional and out-of-range
/// values select nothing.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn item_position(n: f64, len: usize) -> Option<usize> {
    (n.fract() == 0.0 && n >= 1.0 && n <= len as f64).then_some(n as usize)
}

impl ActionEngine {
    pub(crate) fn execute(&mut self, action: &Action, ctx: Option<&Node>) -> Result<(), EngineError> {
        let Some(ctx) = ctx else {
            tracing::debug!("action without context node skipped");
            return Ok(());
        };
        match &action.while_expr {
            Some(source) => {
                let condition = self.env.forms.compile(source)?;
                while test(&self.env, &condition, ctx)? {
                    self.execute_once(action, ctx)?;
                }
                Ok(())
            }
            None => self.execute_once(action, ctx),
        }
    }

    fn execute_once(&mut self, action: &Action, ctx: &Node) -> Result<(), EngineError> {
        if let Some(source) = &action.if_expr {
            let condition = self.env.forms.compile(source)?;
            if !test(&self.env, &condition, ctx)? {
                return Ok(());
            }
        }
        match &action.kind {
            ActionKind::Sequence(actions) => {
                for inner in actions {
                    self.execute(inner, Some(ctx))?;
                }
                Ok(())
            }
            ActionKind::SetValue { binding, value } => self.run_setvalue(binding, value, ctx),
            ActionKind::Insert { binding, origin, at, position, context } => {
                self.run_insert(binding, origin.as_deref(), at.as_deref(), *position, context.as_deref(), ctx)
            }
            ActionKind::Delete { binding, at, context } => {
                self.run_delete(binding, at.as_deref(), context.as_deref(), ctx)
            }
            ActionKind::SetIndex { repeat, index } => {
                let index = eval_number(&self.env, index, ctx, 1)?;
                match item_position(index, usize::MAX >> 1) {
                    Some(index) => self.select_repeat_item(repeat, index),
                    None => Ok(()),
                }
            }
            ActionKind::Rebuild { model } => {
                let id = self.env.model_id(model)?;
                self.env.mark_rebuilt(id)
            }
            ActionKind::Recalculate { model } | ActionKind::Revalidate { model } => {
                let id = self.env.model_id(model)?;
                self.env.changes.add(DepElement::Model(id));
                Ok(())
            }
            ActionKind::Refresh { model } => {
                self.env.model_id(model)?;
                self.force_refresh = true;
                Ok(())
            }
            ActionKind::Reset { model } => {
                let id = self.env.model_id(model)?;
                let env = &mut self.env;
                let target = env.models.get_mut(id.0 as usize).ok_or_else(|| EngineError::UnknownModel(model.clone()))?;
                target.reset(&env.changes);
                tracing::debug!(model = %id, "reset");
                Ok(())
            }
        }
    }

    fn run_setvalue(&mut self, binding: &BindingSpec, value: &ValueSource, ctx: &Node) -> Result<(), EngineError> {
        let binding = Binding::compile(binding, &self.env)?;
        let Some(node) = binding.evaluate_nodes(Some(ctx), &self.env, None)?.into_iter().next() else {
            return Ok(());
        };
        let value = match value {
            ValueSource::Expr(source) => {
                let expr = self.env.forms.compile(source)?;
                self.env.evaluate(&expr, &node, None, 1, 1, None)?.string_value()
            }
            ValueSource::Literal(literal) => literal.clone(),
        };
        self.write_value(&node, &value);
        Ok(())
    }

    fn action_context(&self, context: Option<&str>, ctx: &Node) -> Result<Option<Node>, EngineError> {
        match context {
            Some(source) => Ok(eval_nodes(&self.env, source, ctx)?.into_iter().next()),
            None => Ok(Some(ctx.clone())),
        }
    }

    fn run_insert(
        &mut self,
        binding: &BindingSpec,
        origin: Option<&str>,
        at: Option<&str>,
        position: InsertPosition,
        context: Option<&str>,
        ctx: &Node,
    ) -> Result<(), EngineError> {
        let Some(ctx) = self.action_context(context, ctx)? else {
            return Ok(());
        };
        let binding = Binding::compile(binding, &self.env)?;
        let nodes = binding.evaluate_nodes(Some(&ctx), &self.env, None)?;
        let mut origins = match origin {
            Some(source) => eval_nodes(&self.env, source, &ctx)?,
            None => Vec::new(),
        };
        if origins.is_empty() {
            match nodes.last() {
                Some(last) => origins.push(last.clone()),
                None => return Ok(()),
            }
        }

        let mut inserted = Vec::new();
        for origin in &origins {
            let clone = origin.deep_clone();
            if origin.kind() == NodeKind::Attribute {
                let owner = nodes.first().and_then(Node::parent).unwrap_or_else(|| ctx.clone());
                if let (true, Some(name)) = (owner.is_element(), clone.name()) {
                    inserted.push(owner.set_attribute(name.clone(), &clone.value()));
                }
                continue;
            }
            let Some(first) = nodes.first() else {
                ctx.append_child(&clone);
                inserted.push(clone);
                continue;
            };
            if first.kind() == NodeKind::Document || first.parent().is_some_and(|p| p.kind() == NodeKind::Document) {
                let document = first.root();
                if let Some(old) = document.document_element() {
                    document.remove_child(&old);
                }
                document.append_child(&clone);
                inserted.push(clone);
                continue;
            }
            let len = nodes.len();
            let target = match at {
                Some(source) => eval_number(&self.env, source, &ctx, len)? - 1.0,
                #[allow(clippy::cast_precision_loss)]
                None => (len - 1) as f64,
            };
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
            let index = if target.is_nan() {
                len
            } else {
                target.round().clamp(0.0, (len - 1) as f64) as usize + usize::from(position == InsertPosition::After)
            };
            if let Some(anchor) = nodes.get(index) {
                if let Some(parent) = anchor.parent() {
                    parent.insert_before(&clone, anchor);
                }
            } else if let Some(last) = nodes.last()
                && let Some(parent) = last.parent()
            {
                match last.following_siblings().into_iter().next() {
                    Some(next) => parent.insert_before(&clone, &next),
                    None => parent.append_child(&clone),
                }
            }
            if let Some(repeat) = self.env.host.repeat_of(first)
                && let Some(element) = self.tree.repeat_mut(repeat)
            {
                element.select_on_build(clone.clone());
            }
            inserted.push(clone);
        }

        for node in &inserted {
            tracing::debug!(node = %node.node_name(), parent = %node.parent().map(|p| p.node_name()).unwrap_or_default(), "insert");
        }
        if let Some(model) = inserted.iter().find_map(Node::owner_model) {
            self.env.mark_rebuilt(model)?;
        }
        Ok(())
    }

    fn run_delete(
        &mut self,
        binding: &BindingSpec,
        at: Option<&str>,
        context: Option<&str>,
        ctx: &Node,
    ) -> Result<(), EngineError> {
        let Some(ctx) = self.action_context(context, ctx)? else {
            return Ok(());
        };
        let binding = Binding::compile(binding, &self.env)?;
        let mut nodes = binding.evaluate_nodes(Some(&ctx), &self.env, None)?;
        if let Some(source) = at {
            let index = eval_number(&self.env, source, &ctx, nodes.len())?;
            let Some(index) = item_position(index, nodes.len()) else {
                return Ok(());
            };
            nodes = vec![nodes.swap_remove(index - 1)];
        }
        let Some(model) = nodes.first().and_then(Node::owner_model) else {
            return Ok(());
        };
        for node in &nodes {
            let Some(parent) = node.parent() else {
                continue;
            };
            tracing::debug!(node = %node.node_name(), parent = %parent.node_name(), "delete");
            if node.kind() == NodeKind::Attribute {
                parent.remove_attribute(node);
            } else {
                parent.remove_child(node);
            }
            if let Some(repeat) = self.env.host.repeat_of(node)
                && let Some(element) = self.tree.repeat_mut(repeat)
                && element.delete_node(node)
            {
                self.publish_repeat_index(repeat);
            }
        }
        self.env.mark_rebuilt(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_positions_must_be_whole_and_in_range() {
        assert_eq!(item_position(2.0, 3), Some(2));
        assert_eq!(item_position(1.5, 3), None);
        assert_eq!(item_position(0.0, 3), None);
        assert_eq!(item_position(4.0, 3), None);
        assert_eq!(item_position(f64::NAN, 3), None);
    }

    #[test]
    fn builders_fill_matching_variants_only() {
        let action = Action::delete(BindingSpec::xpath("item")).with_at("1").with_origin("ignored");
        assert_eq!(
            action.kind,
            ActionKind::Delete { binding: BindingSpec::xpath("item"), at: Some("1".into()), context: None }
        );
    }
}
