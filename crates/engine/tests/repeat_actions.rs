mod common;

use bindery_engine::{Action, ActionEngine, BindingSpec, ElementId, InsertPosition, Node};
use common::{list_engine, number, repeat_index, shown, string};
use rstest::{fixture, rstest};

#[fixture]
fn engine() -> ActionEngine {
    list_engine()
}

fn items(engine: &ActionEngine) -> Vec<String> {
    engine
        .evaluate("item")
        .unwrap()
        .into_nodeset()
        .unwrap()
        .iter()
        .map(Node::value)
        .collect()
}

#[rstest]
fn repeat_starts_on_the_first_item(engine: ActionEngine) {
    assert_eq!(repeat_index(&engine, "items"), 1);
    assert_eq!(number(&engine, "index('items')"), 1.0);
    assert_eq!(shown(&engine, "value").as_deref(), Some("a"));
    assert_eq!(shown(&engine, "current").as_deref(), Some("a"));
    assert_eq!(engine.tree().items(first_repeat(&engine)).len(), 3);
}

fn first_repeat(engine: &ActionEngine) -> ElementId {
    engine.tree().roots()[0]
}

#[rstest]
#[case::last(3, "c")]
#[case::middle(2, "b")]
fn set_index_moves_the_selection(mut engine: ActionEngine, #[case] index: usize, #[case] value: &str) {
    engine.set_repeat_index("items", index).unwrap();
    assert_eq!(repeat_index(&engine, "items"), index);
    assert_eq!(shown(&engine, "value").as_deref(), Some(value));
    assert_eq!(shown(&engine, "current").as_deref(), Some(value));
}

#[rstest]
#[case::zero(0)]
#[case::past_the_end(7)]
fn indexes_without_an_item_are_ignored(mut engine: ActionEngine, #[case] index: usize) {
    engine.set_repeat_index("items", index).unwrap();
    assert_eq!(repeat_index(&engine, "items"), 1);
}

#[rstest]
#[case::expression("count(item)", 3)]
#[case::fraction("1.5", 1)]
#[case::nan("'x'", 1)]
fn setindex_action_evaluates_its_index(
    mut engine: ActionEngine,
    #[case] index: &str,
    #[case] expected: usize,
) {
    engine.run_action(&Action::set_index("items", index), None).unwrap();
    assert_eq!(repeat_index(&engine, "items"), expected);
}

#[rstest]
fn insert_after_a_position_selects_the_copy(mut engine: ActionEngine) {
    engine.run_action(&Action::insert(BindingSpec::xpath("item")).with_at("1"), None).unwrap();
    assert_eq!(items(&engine), ["a", "c", "b", "c"]);
    assert_eq!(repeat_index(&engine, "items"), 2);
    assert_eq!(shown(&engine, "value").as_deref(), Some("c"));
    assert_eq!(shown(&engine, "current").as_deref(), Some("c"));
}

#[rstest]
fn insert_without_at_appends_after_the_last_node(mut engine: ActionEngine) {
    engine
        .run_action(&Action::insert(BindingSpec::xpath("item")).with_origin("item[1]"), None)
        .unwrap();
    assert_eq!(items(&engine), ["a", "b", "c", "a"]);
    assert_eq!(repeat_index(&engine, "items"), 4);
}

#[rstest]
fn insert_before_uses_the_origin(mut engine: ActionEngine) {
    let action = Action::insert(BindingSpec::xpath("item"))
        .with_origin("item[2]")
        .with_at("1")
        .with_position(InsertPosition::Before);
    engine.run_action(&action, None).unwrap();
    assert_eq!(items(&engine), ["b", "a", "b", "c"]);
    assert_eq!(repeat_index(&engine, "items"), 1);
    assert_eq!(shown(&engine, "value").as_deref(), Some("b"));
}

#[rstest]
fn insert_into_an_empty_nodeset_appends_to_the_context(mut engine: ActionEngine) {
    engine
        .run_action(&Action::insert(BindingSpec::xpath("missing")).with_origin("item[1]"), None)
        .unwrap();
    assert_eq!(items(&engine), ["a", "b", "c", "a"]);
}

#[rstest]
fn insert_without_nodes_or_origin_does_nothing(mut engine: ActionEngine) {
    engine.run_action(&Action::insert(BindingSpec::xpath("missing")), None).unwrap();
    assert_eq!(items(&engine).len(), 3);
}

#[rstest]
fn deleting_the_selected_last_item_selects_the_new_last(mut engine: ActionEngine) {
    engine.set_repeat_index("items", 3).unwrap();
    engine.run_action(&Action::delete(BindingSpec::xpath("item")).with_at("3"), None).unwrap();
    assert_eq!(items(&engine), ["a", "b"]);
    assert_eq!(repeat_index(&engine, "items"), 2);
    assert_eq!(shown(&engine, "value").as_deref(), Some("b"));
    assert_eq!(shown(&engine, "current").as_deref(), Some("b"));
}

#[rstest]
#[case::past_the_end("9")]
#[case::zero("0")]
#[case::fraction("1.5")]
fn delete_ignores_positions_without_a_node(mut engine: ActionEngine, #[case] at: &str) {
    engine.run_action(&Action::delete(BindingSpec::xpath("item")).with_at(at), None).unwrap();
    assert_eq!(items(&engine).len(), 3);
}

#[rstest]
fn deleting_every_item_empties_the_repeat(mut engine: ActionEngine) {
    engine.run_action(&Action::delete(BindingSpec::xpath("item")), None).unwrap();
    assert!(items(&engine).is_empty());
    assert_eq!(repeat_index(&engine, "items"), 0);
    assert!(!engine.presentation("items").unwrap().relevant);
    assert_eq!(shown(&engine, "value"), None);
}

#[rstest]
fn while_repeats_until_the_condition_fails(mut engine: ActionEngine) {
    let action = Action::delete(BindingSpec::xpath("item")).with_at("1").with_while("count(item) > 1");
    engine.run_action(&action, None).unwrap();
    assert_eq!(items(&engine), ["c"]);
    assert_eq!(shown(&engine, "value").as_deref(), Some("c"));
}

#[rstest]
#[case::false_guard("false()", "a")]
#[case::true_guard("true()", "z")]
fn if_guards_the_action(mut engine: ActionEngine, #[case] guard: &str, #[case] expected: &str) {
    let action = Action::set_literal(BindingSpec::xpath("item[1]"), "z").with_if(guard);
    engine.run_action(&action, None).unwrap();
    assert_eq!(string(&engine, "string(item[1])"), expected);
}

#[rstest]
fn sequences_flush_once(mut engine: ActionEngine) {
    let flushes = engine.profiler().flushes();
    let action = Action::sequence(vec![
        Action::set_literal(BindingSpec::xpath("item[2]"), "z"),
        Action::set_value(BindingSpec::xpath("item[3]"), "concat(., '!')"),
        Action::set_index("items", "2"),
    ]);
    engine.run_action(&action, None).unwrap();
    assert_eq!(engine.profiler().flushes(), flushes + 1);
    assert_eq!(items(&engine), ["a", "z", "c!"]);
    assert_eq!(shown(&engine, "value").as_deref(), Some("z"));
}

#[rstest]
fn actions_run_in_the_context_of_their_element(mut engine: ActionEngine) {
    engine.set_repeat_index("items", 2).unwrap();
    let element = engine.tree().items(first_repeat(&engine))[1][0];
    engine.run_action(&Action::set_literal(BindingSpec::xpath("."), "B"), Some(element)).unwrap();
    assert_eq!(items(&engine), ["a", "B", "c"]);
    assert_eq!(shown(&engine, "value").as_deref(), Some("B"));
}
