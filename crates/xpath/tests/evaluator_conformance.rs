mod common;

use bindery_xpath::{ErrorCode, ExprContext, Expression, FunctionRegistry, NamespaceResolver, Value};
use common::{eval, eval_at, local_names, order};
use rstest::rstest;

#[rstest]
#[case("count(//item)", 3.0)]
#[case("1 + 1", 2.0)]
#[case("0.1 + 0.2", 0.3)]
#[case("sum(//item/@qty)", 6.0)]
#[case("sum(//item)", 60.5)]
#[case("10 mod 3", 1.0)]
#[case("round(2.5)", 3.0)]
#[case("round(-2.5)", -2.0)]
#[case("avg(//item/@qty)", 2.0)]
#[case("min(//item)", 10.0)]
#[case("max(//item)", 30.0)]
#[case("count-non-empty(//item)", 3.0)]
#[case("count(//item | //item[1])", 3.0)]
#[case("count(/order/item/ancestor::*)", 1.0)]
#[case("count(//item[1]/ancestor::node())", 2.0)]
#[case("count(//item/following::*)", 4.0)]
#[case("- - 4", 4.0)]
#[case("string-length('héllo')", 5.0)]
#[case("compare('a', 'b')", -1.0)]
fn numeric_results(#[case] xpath: &str, #[case] expected: f64) {
    assert_eq!(eval(xpath).number_value(), expected, "{xpath}");
}

#[rstest]
#[case("substring(\"eXist-db\", 1, 5)", "eXist")]
#[case("string(//item[2]/@code)", "b")]
#[case("string(//item[@qty > 1][last()]/@code)", "c")]
#[case("string(/order/item[position() = 2]/@code)", "b")]
#[case("string(//item[3]/preceding-sibling::item[1]/@code)", "b")]
#[case("string((//item)[last()]/@code)", "c")]
#[case("string(//p:part/preceding::item[1]/@code)", "c")]
#[case("name(/*/*[4])", "p:part")]
#[case("namespace-uri(//p:part)", "urn:parts")]
#[case("local-name(//p:*)", "part")]
#[case("local-name(id('o1'))", "order")]
#[case("concat('a', 'b', 'c')", "abc")]
#[case("translate('bar', 'abc', 'AB')", "BAr")]
#[case("normalize-space('  a   b ')", "a b")]
#[case("string(1 div 0)", "Infinity")]
#[case("string(min(//nothing))", "NaN")]
#[case("if(count(//item) > 2, 'many', 'few')", "many")]
#[case("substring-before('2024-05-01', '-')", "2024")]
#[case("substring-after('2024-05-01', '-')", "05-01")]
#[case("upper-case('abc')", "ABC")]
#[case("property('version')", "1.1")]
#[case("digest('abc', 'SHA-1', 'hex')", "a9993e364706816aba3e25717850c26c9cd0d89d")]
fn string_results(#[case] xpath: &str, #[case] expected: &str) {
    assert_eq!(eval(xpath).string_value(), expected, "{xpath}");
}

#[rstest]
#[case("//item = 20.5", true)]
#[case("//item = '30'", true)]
#[case("//item != 10", true)]
#[case("//item > 25", true)]
#[case("//item > 30", false)]
#[case("//item = //item/@qty", false)]
#[case("//nothing = //nothing", false)]
#[case("//item and true()", true)]
#[case("count(//note[lang('en')]) = 1", true)]
#[case("count(//note[lang('fr')]) = 0", true)]
#[case("boolean-from-string('TRUE')", true)]
#[case("is-card-number('4111111111111111')", true)]
#[case("not(//item[4])", true)]
fn boolean_results(#[case] xpath: &str, #[case] expected: bool) {
    assert_eq!(eval(xpath).boolean_value(), expected, "{xpath}");
}

#[rstest]
fn reverse_axis_keeps_proximity_order() {
    let v = eval("//item[3]/preceding-sibling::item");
    let codes: Vec<String> = v
        .as_nodeset()
        .unwrap()
        .iter()
        .map(|n| n.attribute("code").unwrap().value())
        .collect();
    assert_eq!(codes, ["b", "a"]);
}

#[rstest]
fn string_predicate_is_boolean_not_positional() {
    // "2" is a non-empty string, so every item passes.
    assert_eq!(local_names(&eval("//item['2']")).len(), 3);
    assert_eq!(local_names(&eval("//item[2]")).len(), 1);
}

#[rstest]
fn absolute_root_selects_document() {
    let v = eval("/");
    let nodes = v.as_nodeset().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].kind(), bindery_xpath::NodeKind::Document);
}

#[rstest]
fn context_node_functions_default_to_context() {
    let doc = order();
    let item = doc.document_element().unwrap().children()[1].clone();
    assert_eq!(eval_at(&item, "string()").unwrap().string_value(), "20.5");
    assert_eq!(eval_at(&item, "local-name()").unwrap().string_value(), "item");
    assert_eq!(eval_at(&item, "string-length()").unwrap().number_value(), 4.0);
    assert_eq!(eval_at(&item, "number()").unwrap().number_value(), 20.5);
}

#[rstest]
#[case("namespace::*", ErrorCode::XPST0010)]
#[case("q:item", ErrorCode::XPST0081)]
#[case("count()", ErrorCode::XPST0017)]
#[case("concat('a')", ErrorCode::XPST0017)]
#[case("frobnicate()", ErrorCode::XPST0017)]
#[case("a[", ErrorCode::XPST0003)]
#[case("count('x')", ErrorCode::XPTY0004)]
#[case("digest('a', 'MD5')", ErrorCode::FOER0000)]
fn error_codes(#[case] xpath: &str, #[case] code: ErrorCode) {
    let err = eval_at(&order(), xpath).unwrap_err();
    assert_eq!(err.code, code, "{xpath}: {err}");
}

#[rstest]
fn unresolved_prefix_is_resolved_late() {
    let doc = order();
    let functions = FunctionRegistry::with_defaults();
    let expr = Expression::compile("count(//q:part)", &NamespaceResolver::new(), &functions).unwrap();

    let mut live = NamespaceResolver::new();
    live.register("q", "urn:parts");
    let ctx = ExprContext::new(&doc, &live, &functions);
    assert_eq!(expr.evaluate(&ctx).unwrap(), Value::Number(1.0));
}

#[rstest]
fn host_extension_functions() {
    let doc = order();
    let ns = common::resolver();
    let mut functions = FunctionRegistry::with_defaults();
    functions.register_ns("urn:ext", "double", 1, Some(1), |_, args| {
        Ok(Value::Number(args[0].number_value() * 2.0))
    });
    let mut ns_ext = ns.clone();
    ns_ext.register("ext", "urn:ext");
    let expr = Expression::compile("ext:double(sum(//item/@qty))", &ns_ext, &functions).unwrap();
    let ctx = ExprContext::new(&doc, &ns_ext, &functions);
    assert_eq!(expr.evaluate_number(&ctx).unwrap(), 12.0);
}
