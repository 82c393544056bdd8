use super::{DefaultArg, FunctionRegistry, arg_nodeset, arg_number};
use crate::model::Node;
use crate::value::{Value, round_half_up, string_to_number};

fn node_number(node: &Node) -> f64 {
    string_to_number(&node.string_value())
}

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_defaulted("number", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        Ok(Value::Number(arg_number(args, 0)))
    });
    reg.register_fn("sum", 1, Some(1), |_, args| {
        Ok(Value::Number(arg_nodeset(args, 0, "sum")?.iter().map(node_number).sum()))
    });
    reg.register_fn("floor", 1, Some(1), |_, args| Ok(Value::Number(arg_number(args, 0).floor())));
    reg.register_fn("ceiling", 1, Some(1), |_, args| Ok(Value::Number(arg_number(args, 0).ceil())));
    reg.register_fn("round", 1, Some(1), |_, args| Ok(Value::Number(round_half_up(arg_number(args, 0)))));
    reg.register_fn("power", 2, Some(2), |_, args| {
        Ok(Value::Number(arg_number(args, 0).powf(arg_number(args, 1))))
    });
    // The optional seed argument is accepted and ignored.
    reg.register_fn("random", 0, Some(1), |_, _| Ok(Value::Number(fastrand::f64())));

    reg.register_fn("avg", 1, Some(1), |_, args| {
        let nodes = arg_nodeset(args, 0, "avg")?;
        let sum: f64 = nodes.iter().map(node_number).sum();
        Ok(Value::Number(sum / nodes.len() as f64))
    });
    reg.register_fn("min", 1, Some(1), |_, args| {
        Ok(Value::Number(extremum(arg_nodeset(args, 0, "min")?, |v, best| v < best)))
    });
    reg.register_fn("max", 1, Some(1), |_, args| {
        Ok(Value::Number(extremum(arg_nodeset(args, 0, "max")?, |v, best| v > best)))
    });
    reg.register_fn("count-non-empty", 1, Some(1), |_, args| {
        let nodes = arg_nodeset(args, 0, "count-non-empty")?;
        Ok(Value::Number(nodes.iter().filter(|n| !n.string_value().is_empty()).count() as f64))
    });
}

/// NaN for an empty set or as soon as any member is not a number.
fn extremum(nodes: &[Node], better: impl Fn(f64, f64) -> bool) -> f64 {
    let mut best = f64::NAN;
    for (i, node) in nodes.iter().enumerate() {
        let v = node_number(node);
        if v.is_nan() {
            return f64::NAN;
        }
        if i == 0 || better(v, best) {
            best = v;
        }
    }
    best
}
