mod common;

use bindery_xpath::{
    DepElement, DepSetIds, DependencySet, DependencyTags, ExprContext, Expression, FunctionRegistry, ModelId, Node,
};
use common::{order, resolver};
use rstest::{fixture, rstest};

struct Recorded {
    set: DependencySet,
    tags: DependencyTags,
}

#[fixture]
fn instance() -> Node {
    let doc = order();
    doc.set_owner_model(Some(ModelId(7)));
    doc
}

fn record(doc: &Node, xpath: &str) -> Recorded {
    let ns = resolver();
    let functions = FunctionRegistry::with_defaults();
    let ids = DepSetIds::default();
    let tags = DependencyTags::new();
    let mut set = DependencySet::new(ids.mint());
    let expr = Expression::compile(xpath, &ns, &functions).unwrap();
    {
        let sink = set.recorder(&tags);
        let ctx = ExprContext::new(doc, &ns, &functions).with_deps(&sink);
        expr.evaluate(&ctx).unwrap();
    }
    Recorded { set, tags }
}

#[rstest]
fn top_level_location_records_only_the_model(instance: Node) {
    let rec = record(&instance, "/order/item");
    assert!(rec.set.nodes().is_empty());
    assert_eq!(rec.set.elements(), [DepElement::Model(ModelId(7))]);
}

#[rstest]
fn nested_locations_record_their_nodes(instance: Node) {
    let rec = record(&instance, "sum(/order/item/@qty)");
    assert_eq!(rec.set.nodes().len(), 3);
    for node in rec.set.nodes() {
        assert!(rec.set.contains_node(node, &rec.tags));
    }
}

#[rstest]
fn predicate_paths_are_dependencies(instance: Node) {
    let rec = record(&instance, "/order/item[@qty > 2]");
    // The three qty attributes read by the predicate, not the items.
    assert_eq!(rec.set.nodes().len(), 3);
    assert!(rec.set.nodes().iter().all(|n| n.local_name() == "qty"));
}

#[rstest]
fn recording_the_same_node_twice_keeps_one_entry(instance: Node) {
    let rec = record(&instance, "count(//item) + count(//item)");
    assert_eq!(rec.set.nodes().len(), 3);
    assert_eq!(rec.tags.len(), 3);
}

#[rstest]
fn clearing_untags_only_the_cleared_set(instance: Node) {
    let ns = resolver();
    let functions = FunctionRegistry::with_defaults();
    let ids = DepSetIds::default();
    let tags = DependencyTags::new();
    let mut first = DependencySet::new(ids.mint());
    let mut second = DependencySet::new(ids.mint());
    let expr = Expression::compile("count(//item)", &ns, &functions).unwrap();
    for set in [&mut first, &mut second] {
        let sink = set.recorder(&tags);
        let ctx = ExprContext::new(&instance, &ns, &functions).with_deps(&sink);
        expr.evaluate(&ctx).unwrap();
    }
    assert_eq!(tags.len(), 6);

    first.clear(&tags);
    assert_eq!(tags.len(), 3);
    let item = second.nodes()[0].clone();
    assert!(!first.contains_node(&item, &tags));
    assert!(second.contains_node(&item, &tags));
}

#[rstest]
fn current_records_the_context_node(instance: Node) {
    let item = instance.document_element().unwrap().children()[0].clone();
    let rec = record(&item, "current()");
    assert_eq!(rec.set.nodes(), [item]);
    assert_eq!(rec.set.elements(), [DepElement::Model(ModelId(7))]);
}
