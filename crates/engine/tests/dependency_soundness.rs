//! Incremental updates must leave the UI exactly as a fresh engine built
//! over the mutated document would.
use bindery_engine::{Action, ActionEngine, BindSpec, BindingSpec, ElementSpec, EngineConfig};
use proptest::prelude::*;

const NAMES: [&str; 6] = ["items", "value", "total", "big", "first", "double"];

fn engine_over(xml: &str) -> ActionEngine {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    engine.add_instance(model, "data", xml).unwrap();
    engine.add_bind(model, None, &BindSpec::new("double").with_calculate("sum(../v) * 2")).unwrap();
    engine.add_bind(model, None, &BindSpec::new("v").with_relevant(". != 0")).unwrap();

    let items = engine.add_element(None, &ElementSpec::repeat(BindingSpec::xpath("v")).named("items")).unwrap();
    engine.add_element(Some(items), &ElementSpec::control(BindingSpec::xpath(".")).named("value")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("sum(v)")).named("total")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("count(v[. > 25])")).named("big")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("v[1]")).named("first")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("double")).named("double")).unwrap();
    engine.start().unwrap();
    engine
}

fn snapshot(engine: &ActionEngine) -> Vec<Option<bindery_engine::Presentation>> {
    NAMES.iter().map(|name| engine.presentation(name).cloned()).collect()
}

#[derive(Debug, Clone)]
enum Op {
    Set(usize, u32),
    Select(usize),
    Append,
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..5, 0u32..50).prop_map(|(i, v)| Op::Set(i, v)),
        1 => (1usize..5).prop_map(Op::Select),
        1 => Just(Op::Append),
        1 => (1usize..5).prop_map(Op::Delete),
    ]
}

fn apply(engine: &mut ActionEngine, op: &Op) {
    let action = match op {
        Op::Set(i, v) => Action::set_literal(BindingSpec::xpath(format!("v[{i}]")), v.to_string()),
        Op::Select(i) => Action::set_index("items", i.to_string()),
        Op::Append => Action::insert(BindingSpec::xpath("v")),
        Op::Delete(i) => Action::delete(BindingSpec::xpath("v")).with_at(i.to_string()),
    };
    engine.run_action(&action, None).unwrap();
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn incremental_flushes_match_a_fresh_build(
        initial in prop::collection::vec(0u32..50, 1..5),
        ops in prop::collection::vec(op(), 1..12),
    ) {
        let mut xml = String::from("<r>");
        for v in &initial {
            xml.push_str(&format!("<v>{v}</v>"));
        }
        xml.push_str("<double/></r>");

        let mut engine = engine_over(&xml);
        for op in &ops {
            apply(&mut engine, op);
            prop_assert!(engine.take_diagnostics().is_empty());

            let root = engine.default_root().unwrap();
            let mut fresh = engine_over(&root.to_xml());
            let index = engine.element_named("items").and_then(|e| e.as_repeat()).map_or(0, |r| r.index());
            fresh.set_repeat_index("items", index).unwrap();

            prop_assert_eq!(snapshot(&engine), snapshot(&fresh), "after {:?} on {}", op, root.to_xml());
        }
    }
}
