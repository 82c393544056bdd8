use super::{DefaultArg, FunctionRegistry, arg_nodeset, arg_string};
use crate::consts::XML_NS;
use crate::model::Node;
use crate::value::Value;

pub(super) fn register(reg: &mut FunctionRegistry) {
    reg.register_fn("last", 0, Some(0), |ctx, _| Ok(Value::Number(ctx.size() as f64)));
    reg.register_fn("position", 0, Some(0), |ctx, _| Ok(Value::Number(ctx.position() as f64)));
    reg.register_fn("count", 1, Some(1), |_, args| {
        Ok(Value::Number(arg_nodeset(args, 0, "count")?.len() as f64))
    });

    reg.register_defaulted("id", 1, Some(1), DefaultArg::ContextNode, |ctx, args| {
        let tokens: Vec<String> = match &args[0] {
            Value::NodeSet(nodes) => nodes
                .iter()
                .flat_map(|n| n.string_value().split_whitespace().map(str::to_string).collect::<Vec<_>>())
                .collect(),
            other => other.string_value().split_whitespace().map(str::to_string).collect(),
        };
        let mut out: Vec<Node> = Vec::new();
        for token in tokens {
            if let Some(el) = ctx.node().element_by_id(&token)
                && !out.contains(&el)
            {
                out.push(el);
            }
        }
        Ok(Value::NodeSet(out))
    });

    reg.register_defaulted("local-name", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        let nodes = arg_nodeset(args, 0, "local-name")?;
        Ok(Value::String(nodes.first().map(|n| n.local_name().to_string()).unwrap_or_default()))
    });
    reg.register_defaulted("namespace-uri", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        let nodes = arg_nodeset(args, 0, "namespace-uri")?;
        Ok(Value::String(
            nodes.first().and_then(|n| n.namespace_uri().map(str::to_string)).unwrap_or_default(),
        ))
    });
    reg.register_defaulted("name", 1, Some(1), DefaultArg::ContextNodeSet, |_, args| {
        let nodes = arg_nodeset(args, 0, "name")?;
        Ok(Value::String(nodes.first().map(Node::node_name).unwrap_or_default()))
    });

    reg.register_fn("lang", 1, Some(1), |ctx, args| {
        let language = arg_string(args, 0).to_lowercase();
        let mut cur = Some(ctx.node().clone());
        while let Some(node) = cur {
            if let Some(attr) = node.attribute_ns(Some(XML_NS), "lang") {
                let declared = attr.value().to_lowercase();
                let matches = declared == language
                    || declared.strip_prefix(language.as_str()).is_some_and(|rest| rest.starts_with('-'));
                return Ok(Value::Boolean(matches));
            }
            cur = node.parent();
        }
        Ok(Value::Boolean(false))
    });

    reg.register_fn("current", 0, Some(0), |ctx, _| {
        ctx.add_dep_node(ctx.node());
        ctx.add_dep_model_of(ctx.node());
        Ok(Value::NodeSet(vec![ctx.current().clone()]))
    });
}
