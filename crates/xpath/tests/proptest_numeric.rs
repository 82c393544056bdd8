use bindery_xpath::value::{round6, string_to_number};
use bindery_xpath::{ExprContext, Expression, FunctionRegistry, NamespaceResolver, Value, parse_document};
use proptest::prelude::*;
use rstest::rstest;

fn eval_number(source: &str, xpath: &str) -> f64 {
    let doc = parse_document(source).unwrap();
    let ns = NamespaceResolver::with_defaults();
    let functions = FunctionRegistry::with_defaults();
    let expr = Expression::compile(xpath, &ns, &functions).unwrap();
    expr.evaluate(&ExprContext::new(&doc, &ns, &functions)).unwrap().number_value()
}

fn items(values: &[i32]) -> String {
    let mut s = String::from("<r>");
    for v in values {
        s.push_str(&format!("<i>{v}</i>"));
    }
    s.push_str("</r>");
    s
}

proptest! {
    #[test]
    fn integers_parse_back(n in any::<i32>()) {
        prop_assert_eq!(string_to_number(&n.to_string()), f64::from(n));
    }

    #[test]
    fn round6_is_idempotent(x in -1.0e6f64..1.0e6) {
        let once = round6(x);
        prop_assert_eq!(round6(once), once);
    }

    #[test]
    fn count_and_sum_match_the_document(values in prop::collection::vec(-1000i32..1000, 0..20)) {
        let doc = items(&values);
        prop_assert_eq!(eval_number(&doc, "count(/r/i)"), values.len() as f64);
        let expected: i32 = values.iter().sum();
        prop_assert_eq!(eval_number(&doc, "sum(/r/i)"), f64::from(expected));
    }

    #[test]
    fn positional_predicate_selects_one(values in prop::collection::vec(-1000i32..1000, 1..20), pick in 0usize..20) {
        let k = pick % values.len();
        let doc = items(&values);
        let xpath = format!("number(/r/i[{}])", k + 1);
        prop_assert_eq!(eval_number(&doc, &xpath), f64::from(values[k]));
    }

    #[test]
    fn floor_and_ceiling_bracket(a in -10_000i32..10_000, b in 1i32..100) {
        let doc = items(&[]);
        let q = f64::from(a) / f64::from(b);
        let floor = eval_number(&doc, &format!("floor({a} div {b})"));
        let ceiling = eval_number(&doc, &format!("ceiling({a} div {b})"));
        prop_assert!(floor <= ceiling);
        prop_assert!(floor - 1.0 < q && q < ceiling + 1.0);
    }
}

#[rstest]
#[case("", f64::NAN)]
#[case(" 12 ", 12.0)]
#[case("-.5", -0.5)]
#[case("1e3", f64::NAN)]
#[case("+1", f64::NAN)]
fn string_to_number_edges(#[case] input: &str, #[case] expected: f64) {
    let got = string_to_number(input);
    if expected.is_nan() {
        assert!(got.is_nan(), "{input:?} gave {got}");
    } else {
        assert_eq!(got, expected);
    }
}

#[rstest]
fn arithmetic_is_rounded() {
    assert_eq!(eval_number("<r/>", "0.1 + 0.2"), 0.3);
    assert!(matches!(Value::from(round6(1.0 / 3.0)), Value::Number(n) if n == 0.333_333));
}
