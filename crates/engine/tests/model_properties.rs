mod common;

use bindery_engine::{Action, ActionEngine, BindSpec, BindingSpec, ElementSpec, EngineConfig, EngineError};
use bindery_xpath::ErrorCode;
use common::{node, shown, string};
use rstest::{fixture, rstest};

const PERSON: &str = "<person>
  <name/>
  <age>17</age>
  <email>x@example.org</email>
  <married>false</married>
  <spouse/>
  <address><street>Main</street></address>
</person>";

#[fixture]
fn person() -> ActionEngine {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("person");
    engine.add_instance(model, "data", PERSON).unwrap();
    engine.add_bind(model, None, &BindSpec::new("name").with_required("true()")).unwrap();
    engine
        .add_bind(model, None, &BindSpec::new("age").with_type("xsd:integer").with_constraint(". >= 18"))
        .unwrap();
    engine.add_bind(model, None, &BindSpec::new("email").with_readonly("true()")).unwrap();
    engine.add_bind(model, None, &BindSpec::new("spouse").with_relevant("../married = 'true'")).unwrap();
    engine.add_bind(model, None, &BindSpec::new("address").with_readonly("true()")).unwrap();
    for name in ["name", "age", "email", "spouse", "married"] {
        engine.add_element(None, &ElementSpec::control(BindingSpec::xpath(name)).named(name)).unwrap();
    }
    let address =
        engine.add_element(None, &ElementSpec::bound_group(BindingSpec::xpath("address")).named("address")).unwrap();
    engine.add_element(Some(address), &ElementSpec::control(BindingSpec::xpath("street")).named("street")).unwrap();
    engine.start().unwrap();
    engine
}

#[rstest]
fn required_and_empty_is_invalid(mut person: ActionEngine) {
    let shown_name = person.presentation("name").unwrap().clone();
    assert!(shown_name.required);
    assert!(!shown_name.valid);

    let name = node(&person, "name");
    person.set_value(&name, "Ada").unwrap();
    assert!(person.presentation("name").unwrap().valid);
}

#[rstest]
#[case::constraint_fails("17", false)]
#[case::constraint_holds("18", true)]
#[case::not_an_integer("eighteen", false)]
fn type_and_constraint_decide_validity(mut person: ActionEngine, #[case] age: &str, #[case] valid: bool) {
    let node = node(&person, "age");
    person.set_value(&node, age).unwrap();
    assert_eq!(person.presentation("age").unwrap().valid, valid);
    assert_eq!(person.properties(&node).valid, valid);
    assert_eq!(person.evaluate("is-valid(age)").unwrap().boolean_value(), valid);
}

#[rstest]
fn irrelevant_nodes_are_valid_and_follow_their_condition(mut person: ActionEngine) {
    let spouse = person.presentation("spouse").unwrap().clone();
    assert!(!spouse.relevant);
    assert!(spouse.valid);

    let married = node(&person, "married");
    person.set_value(&married, "true").unwrap();
    assert!(person.presentation("spouse").unwrap().relevant);
}

#[rstest]
fn readonly_is_inherited_by_descendants(person: ActionEngine) {
    assert!(person.presentation("email").unwrap().readonly);
    assert!(person.presentation("street").unwrap().readonly);
    assert!(!person.presentation("married").unwrap().readonly);
}

#[rstest]
fn reset_restores_the_pristine_instance(mut person: ActionEngine) {
    let age = node(&person, "age");
    person.set_value(&age, "30").unwrap();
    assert_eq!(shown(&person, "age").as_deref(), Some("30"));

    person.run_action(&Action::reset("person"), None).unwrap();
    assert_eq!(string(&person, "string(age)"), "17");
    assert_eq!(shown(&person, "age").as_deref(), Some("17"));
    assert!(!person.presentation("age").unwrap().valid);
}

#[rstest]
fn bind_nodes_are_exposed_by_id() {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    engine.add_instance(model, "data", "<r><a>1</a><a>2</a></r>").unwrap();
    let parent = engine.add_bind(model, None, &BindSpec::new(".").with_id("root")).unwrap();
    engine.add_bind(model, Some(parent), &BindSpec::new("a").with_id("as").with_type("xsd:integer")).unwrap();
    engine.start().unwrap();
    assert_eq!(engine.bind_nodes("as").unwrap().len(), 2);
    assert_eq!(engine.bind_nodes("root").unwrap().len(), 1);
    assert!(matches!(engine.bind_nodes("nope"), Err(EngineError::BindingNotFound(_))));
}

#[rstest]
fn two_binds_on_one_node_fail_the_rebuild() {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    engine.add_instance(model, "data", "<r><a/></r>").unwrap();
    engine.add_bind(model, None, &BindSpec::new("a").with_id("first")).unwrap();
    engine.add_bind(model, None, &BindSpec::new("*[1]").with_id("second")).unwrap();
    let err = engine.start().unwrap_err();
    assert!(matches!(err, EngineError::Binding { .. }), "{err}");
}

#[rstest]
#[case::unknown_type(BindSpec::new("a").with_type("xsd:nope"))]
#[case::unknown_prefix(BindSpec::new("a").with_type("zz:int"))]
fn bad_types_are_rejected_at_declaration(#[case] spec: BindSpec) {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    assert!(matches!(engine.add_bind(model, None, &spec), Err(EngineError::SchemaLookup(_))));
}

#[rstest]
fn compile_errors_are_reported_at_declaration() {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    let err = engine.add_bind(model, None, &BindSpec::new("a[").with_id("broken")).unwrap_err();
    assert!(matches!(err, EngineError::Compile { ref expr, .. } if expr == "a["));
}

#[rstest]
fn build_failures_become_diagnostics() {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    engine.add_instance(model, "data", "<r><a>1</a></r>").unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::bind("nope")).named("ghost")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("instance('zzz')")).named("lost")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("a")).named("a")).unwrap();
    engine.start().unwrap();

    let diagnostics = engine.take_diagnostics();
    let ghost = diagnostics.iter().find(|d| d.name.as_deref() == Some("ghost")).unwrap();
    assert!(ghost.message.contains("nope"));
    let lost = diagnostics.iter().find(|d| d.name.as_deref() == Some("lost")).unwrap();
    assert_eq!(lost.code, Some(ErrorCode::FOER0000));
    assert_eq!(shown(&engine, "a").as_deref(), Some("1"));
    assert!(engine.take_diagnostics().is_empty());
}

#[rstest]
fn model_evaluation_failures_become_diagnostics() {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    engine.add_instance(model, "data", "<d><a>1</a><b>2</b><c>keep</c></d>").unwrap();
    engine.add_bind(model, None, &BindSpec::new("a").with_id("checked").with_constraint("count(namespace::*) = 0")).unwrap();
    engine.add_bind(model, None, &BindSpec::new("c").with_id("lookup").with_calculate("instance('zzz')")).unwrap();
    engine.add_bind(model, None, &BindSpec::new("namespace::*").with_id("odd")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("b")).named("b")).unwrap();
    engine.start().unwrap();

    assert_eq!(shown(&engine, "b").as_deref(), Some("2"));
    let diagnostics = engine.take_diagnostics();
    let code_of = |name: &str| diagnostics.iter().find(|d| d.name.as_deref() == Some(name)).and_then(|d| d.code);
    assert_eq!(code_of("checked"), Some(ErrorCode::XPST0010));
    assert_eq!(code_of("lookup"), Some(ErrorCode::FOER0000));
    assert_eq!(code_of("odd"), Some(ErrorCode::XPST0010));

    assert!(!engine.properties(&node(&engine, "a")).valid);
    assert_eq!(string(&engine, "string(c)"), "keep");
    assert!(engine.bind_nodes("odd").unwrap().is_empty());

    let b = node(&engine, "b");
    engine.set_value(&b, "5").unwrap();
    assert_eq!(shown(&engine, "b").as_deref(), Some("5"));
}

#[rstest]
fn instance_function_reaches_other_instances() {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("m");
    engine.add_instance(model, "data", "<r><rate/></r>").unwrap();
    engine.add_instance(model, "rates", "<rates><eur>2</eur></rates>").unwrap();
    engine.add_bind(model, None, &BindSpec::new("rate").with_calculate("instance('rates')/eur * 10")).unwrap();
    engine.start().unwrap();
    assert_eq!(string(&engine, "string(rate)"), "20");

    let eur = engine.evaluate("instance('rates')/eur").unwrap().into_nodeset().unwrap().remove(0);
    engine.set_value(&eur, "3").unwrap();
    assert_eq!(string(&engine, "string(rate)"), "30");
}
