use std::rc::Rc;

use bindery_xpath::{ErrorCode, ExpressionCache, FunctionRegistry, NamespaceResolver};
use rstest::rstest;

#[rstest]
fn same_key_yields_same_expression() {
    let cache = ExpressionCache::new();
    let ns = NamespaceResolver::with_defaults();
    let functions = FunctionRegistry::with_defaults();
    let a = cache.get_or_compile("count(//item)", &ns, &functions).unwrap();
    let b = cache.get_or_compile("count(//item)", &ns, &functions).unwrap();
    assert!(Rc::ptr_eq(&a, &b));
    let stats = cache.stats();
    assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
}

#[rstest]
fn prefix_table_is_part_of_the_key() {
    let cache = ExpressionCache::new();
    let functions = FunctionRegistry::with_defaults();
    let mut first = NamespaceResolver::new();
    first.register("p", "urn:one");
    let mut second = NamespaceResolver::new();
    second.register("p", "urn:two");
    let a = cache.get_or_compile("p:item", &first, &functions).unwrap();
    let b = cache.get_or_compile("p:item", &second, &functions).unwrap();
    assert!(!Rc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 2);
}

#[rstest]
#[case("count(")]
#[case("1 +")]
#[case("unknown-fn()")]
fn failures_are_not_cached(#[case] source: &str) {
    let cache = ExpressionCache::new();
    let ns = NamespaceResolver::new();
    let functions = FunctionRegistry::with_defaults();
    for _ in 0..2 {
        let err = cache.get_or_compile(source, &ns, &functions).unwrap_err();
        assert!(err.is_static());
        assert!(matches!(err.code, ErrorCode::XPST0003 | ErrorCode::XPST0017));
    }
    assert!(cache.is_empty());
    assert_eq!(cache.stats().misses, 2);
}
