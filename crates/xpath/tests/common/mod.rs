#![allow(dead_code)]

use bindery_xpath::{ExprContext, Expression, FunctionRegistry, NamespaceResolver, Node, Value, parse_document};

pub const ORDER: &str = r#"<order xmlns:p="urn:parts" id="o1">
  <item code="a" qty="2">10</item>
  <item code="b" qty="1">20.5</item>
  <item code="c" qty="3">30</item>
  <p:part>bolt</p:part>
  <note xml:lang="en-GB">fragile</note>
</order>"#;

pub fn order() -> Node {
    parse_document(ORDER).expect("fixture parses")
}

pub fn resolver() -> NamespaceResolver {
    let mut ns = NamespaceResolver::with_defaults();
    ns.register("p", "urn:parts");
    ns
}

pub fn eval_at(node: &Node, xpath: &str) -> Result<Value, bindery_xpath::Error> {
    let ns = resolver();
    let functions = FunctionRegistry::with_defaults();
    let expr = Expression::compile(xpath, &ns, &functions)?;
    let ctx = ExprContext::new(node, &ns, &functions);
    expr.evaluate(&ctx)
}

pub fn eval(xpath: &str) -> Value {
    eval_at(&order(), xpath).unwrap_or_else(|e| panic!("{xpath}: {e}"))
}

pub fn local_names(value: &Value) -> Vec<String> {
    match value {
        Value::NodeSet(nodes) => nodes.iter().map(|n| n.local_name().to_string()).collect(),
        other => panic!("expected node-set, got {other:?}"),
    }
}
