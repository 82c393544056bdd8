mod common;

use bindery_engine::{ActionEngine, BindSpec, BindingSpec, ElementSpec, EngineConfig, EngineError, EngineState};
use common::{node, order_engine, order_engine_with, shown, string};
use rstest::rstest;

#[rstest]
fn start_computes_and_displays_the_calculations() {
    let engine = order_engine();
    assert_eq!(string(&engine, "string(item[1]/line)"), "6");
    assert_eq!(string(&engine, "string(item[2]/line)"), "10");
    assert_eq!(shown(&engine, "total").as_deref(), Some("16"));
    assert_eq!(shown(&engine, "count").as_deref(), Some("2"));
    assert_eq!(engine.state(), EngineState::Idle);
}

#[rstest]
fn set_value_runs_the_calculate_chain() {
    let mut engine = order_engine();
    let qty = node(&engine, "item[1]/qty");
    engine.set_value(&qty, "5").unwrap();
    assert_eq!(string(&engine, "string(item[1]/line)"), "15");
    assert_eq!(shown(&engine, "total").as_deref(), Some("25"));
    assert_eq!(shown(&engine, "qty").as_deref(), Some("5"));
}

#[rstest]
fn writing_the_same_value_is_not_a_change() {
    let mut engine = order_engine_with(EngineConfig::default().with_profiling(true));
    let iterations = engine.profiler().flush_iterations();
    let qty = node(&engine, "item[1]/qty");
    engine.set_value(&qty, "2").unwrap();
    assert_eq!(engine.profiler().flush_iterations(), iterations);
}

#[rstest]
fn nested_scopes_flush_once_when_the_outermost_closes() {
    let mut engine = order_engine();
    let flushes = engine.profiler().flushes();
    let qty = node(&engine, "item[2]/qty");

    engine.open_action();
    engine.open_action();
    engine.set_value(&qty, "3").unwrap();
    engine.close_action().unwrap();
    assert_eq!(engine.depth(), 1);
    assert_eq!(engine.state(), EngineState::InAction);
    assert_eq!(engine.profiler().flushes(), flushes);
    assert_eq!(shown(&engine, "total").as_deref(), Some("16"));

    engine.close_action().unwrap();
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.profiler().flushes(), flushes + 1);
    assert_eq!(shown(&engine, "total").as_deref(), Some("36"));
}

#[rstest]
fn closing_without_a_scope_is_harmless() {
    let mut engine = order_engine();
    engine.close_action().unwrap();
    assert_eq!(engine.depth(), 0);
}

#[rstest]
fn in_action_closes_the_scope_on_error() {
    let mut engine = order_engine();
    let result: Result<(), _> = engine.in_action(|_| Err(EngineError::UnknownModel("nope".into())));
    assert!(matches!(result, Err(EngineError::UnknownModel(_))));
    assert_eq!(engine.depth(), 0);
}

#[rstest]
fn refresh_without_changes_is_idempotent() {
    let mut engine = order_engine();
    let names = ["total", "count", "qty", "line", "items"];
    let before: Vec<u64> = names.iter().map(|n| engine.element_named(n).unwrap().mutations()).collect();
    let tags = engine.forms().tags().len();

    engine.refresh().unwrap();

    let after: Vec<u64> = names.iter().map(|n| engine.element_named(n).unwrap().mutations()).collect();
    assert_eq!(before, after);
    assert_eq!(engine.forms().tags().len(), tags);
}

fn chain(links: usize, reversed: bool) -> ActionEngine {
    let mut xml = String::from("<c><v0>1</v0>");
    for k in 1..=links {
        xml.push_str(&format!("<v{k}/>"));
    }
    xml.push_str("</c>");

    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("chain");
    engine.add_instance(model, "data", &xml).unwrap();
    let mut order: Vec<usize> = (1..=links).collect();
    if reversed {
        order.reverse();
    }
    for k in order {
        let spec = BindSpec::new(format!("v{k}")).with_calculate(format!("../v{} + 1", k - 1));
        engine.add_bind(model, None, &spec).unwrap();
    }
    engine.start().unwrap();
    engine
}

#[rstest]
#[case::declaration_order(false)]
#[case::reverse_order(true)]
fn calculate_chains_converge_within_one_pass_per_link(#[case] reversed: bool) {
    let links = 6;
    let engine = chain(links, reversed);
    assert_eq!(string(&engine, &format!("string(v{links})")), "7");
    let bound = u64::try_from(links).unwrap() + 1;
    assert!(engine.profiler().flush_iterations() <= bound, "{} iterations", engine.profiler().flush_iterations());
}

#[rstest]
fn runaway_calculations_hit_the_iteration_cap() {
    let mut engine = ActionEngine::new(EngineConfig::default().with_max_flush_iterations(8)).unwrap();
    let model = engine.add_model("m");
    engine.add_instance(model, "data", "<c><n>0</n></c>").unwrap();
    engine.add_bind(model, None, &BindSpec::new("n").with_calculate(". + 1")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("n")).named("n")).unwrap();

    let err = engine.start().unwrap_err();
    assert!(matches!(err, EngineError::FlushDiverged { iterations: 8 }));
    assert_eq!(engine.state(), EngineState::Idle);
    let diagnostics = engine.take_diagnostics();
    assert!(diagnostics.iter().any(|d| d.message.contains("8 iterations")));
}

#[rstest]
fn teardown_releases_every_dependency_tag() {
    let mut engine = order_engine();
    assert!(!engine.forms().tags().is_empty());
    engine.teardown();
    assert_eq!(engine.forms().tags().len(), 0);
}

#[rstest]
fn profiling_times_expressions() {
    let engine = order_engine_with(EngineConfig::default().with_profiling(true));
    let report = engine.profiler().report();
    assert!(report.expressions.iter().any(|e| e.source == "../qty * ../price" && e.calls >= 2));
    assert!(report.flushes >= 1);
    assert!(report.builds >= 5);
}

#[rstest]
fn only_the_outermost_of_three_scopes_flushes() {
    let mut engine = order_engine();
    let flushes = engine.profiler().flushes();
    engine.open_action();
    engine.open_action();
    engine.open_action();
    engine.close_action().unwrap();
    engine.close_action().unwrap();
    assert_eq!(engine.state(), EngineState::InAction);
    assert_eq!(engine.profiler().flushes(), flushes);
    engine.close_action().unwrap();
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.profiler().flushes(), flushes + 1);
}
