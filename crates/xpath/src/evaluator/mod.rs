//! Tree-walking evaluator over compiled expressions.
use rustc_hash::FxHashSet;

use crate::compiler::{Expression, Location, Op, Step};
use crate::context::ExprContext;
use crate::error::Error;
use crate::model::{Node, NodeId};
use crate::parser::ast::BinaryOp;
use crate::value::{NodeSet, Value, round6};

mod axes;
mod comparison;

use comparison::compare;

impl Expression {
    /// Evaluate against `ctx`. Dependencies are recorded into the
    /// context's recorder as a side effect.
    pub fn evaluate(&self, ctx: &ExprContext<'_>) -> Result<Value, Error> {
        eval(self.root(), ctx)
    }
}

/// Node-set builder keeping first occurrences only.
#[derive(Default)]
struct Dedup {
    seen: FxHashSet<NodeId>,
    nodes: NodeSet,
}

impl Dedup {
    fn push(&mut self, node: Node) {
        if self.seen.insert(node.id()) {
            self.nodes.push(node);
        }
    }

    fn extend(&mut self, nodes: impl IntoIterator<Item = Node>) {
        for n in nodes {
            self.push(n);
        }
    }
}

pub(crate) fn eval(op: &Op, ctx: &ExprContext<'_>) -> Result<Value, Error> {
    match op {
        Op::Literal(s) => Ok(Value::String(s.clone())),
        Op::Number(n) => Ok(Value::Number(*n)),
        Op::Location(loc) => Ok(Value::NodeSet(eval_location(loc, ctx.node(), ctx)?)),
        Op::Filter { primary, predicates } => {
            let mut nodes = eval(primary, ctx)?.into_nodeset()?;
            for pred in predicates {
                nodes = apply_predicate(pred, nodes, ctx)?;
            }
            Ok(Value::NodeSet(nodes))
        }
        Op::Path { filter, path } => {
            let heads = eval(filter, ctx)?.into_nodeset()?;
            let mut out = Dedup::default();
            let size = heads.len();
            for (i, head) in heads.iter().enumerate() {
                let inner = ctx.clone_for(head, i + 1, size);
                out.extend(eval_location(path, head, &inner)?);
            }
            Ok(Value::NodeSet(out.nodes))
        }
        Op::Union(a, b) => {
            let left = eval(a, ctx)?.into_nodeset()?;
            let right = eval(b, ctx)?.into_nodeset()?;
            let mut out = Dedup::default();
            out.extend(left);
            out.extend(right);
            Ok(Value::NodeSet(out.nodes))
        }
        Op::Binary { op: BinaryOp::Or, left, right } => {
            if eval(left, ctx)?.boolean_value() {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(eval(right, ctx)?.boolean_value()))
        }
        Op::Binary { op: BinaryOp::And, left, right } => {
            if !eval(left, ctx)?.boolean_value() {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(eval(right, ctx)?.boolean_value()))
        }
        Op::Binary { op, left, right } => {
            let l = eval(left, ctx)?;
            let r = eval(right, ctx)?;
            match op {
                BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                    Ok(Value::Boolean(compare(*op, &l, &r)))
                }
                _ => Ok(Value::Number(arithmetic(*op, l.number_value(), r.number_value()))),
            }
        }
        Op::Negate(inner) => Ok(Value::Number(-eval(inner, ctx)?.number_value())),
        Op::Call { name, args } => {
            let values = args.iter().map(|a| eval(a, ctx)).collect::<Result<Vec<_>, _>>()?;
            ctx.functions().call(name, ctx, values)
        }
    }
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> f64 {
    let raw = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => f64::NAN,
    };
    round6(raw)
}

/// Walk `loc` from `context` (or from its root when absolute).
fn eval_location(loc: &Location, context: &Node, ctx: &ExprContext<'_>) -> Result<NodeSet, Error> {
    let start = if loc.absolute { context.root() } else { context.clone() };
    ctx.add_dep_model_of(&start);

    let mut current = vec![start];
    for step in &loc.steps {
        let mut next = Dedup::default();
        for node in &current {
            next.extend(eval_step(step, node, ctx)?);
        }
        current = next.nodes;
    }

    if !loc.is_root {
        for node in &current {
            ctx.add_dep_node(node);
        }
    }
    Ok(current)
}

fn eval_step(step: &Step, node: &Node, ctx: &ExprContext<'_>) -> Result<NodeSet, Error> {
    axes::check_prefix(&step.test, ctx.namespaces())?;
    let mut list = Vec::new();
    for candidate in axes::collect(step.axis, node)? {
        if axes::matches(&step.test, step.axis, &candidate, ctx.namespaces())? {
            list.push(candidate);
        }
    }
    for pred in &step.predicates {
        list = apply_predicate(pred, list, ctx)?;
    }
    Ok(list)
}

/// Number-typed predicate values select by position, all others by their
/// boolean value.
fn apply_predicate(pred: &Op, nodes: NodeSet, ctx: &ExprContext<'_>) -> Result<NodeSet, Error> {
    let size = nodes.len();
    let mut kept = Vec::with_capacity(size);
    for (i, node) in nodes.into_iter().enumerate() {
        let inner = ctx.clone_for(&node, i + 1, size);
        let keep = match eval(pred, &inner)? {
            Value::Number(n) => (i + 1) as f64 == n,
            other => other.boolean_value(),
        };
        if keep {
            kept.push(node);
        }
    }
    Ok(kept)
}
