#![allow(dead_code)]

use bindery_engine::{ActionEngine, BindSpec, BindingSpec, ElementSpec, EngineConfig, Node};

pub const ORDER: &str = r"<order>
  <item><name>bolt</name><qty>2</qty><price>3</price><line/></item>
  <item><name>nut</name><qty>1</qty><price>10</price><line/></item>
  <total/>
</order>";

pub const LIST: &str = "<list><item>a</item><item>b</item><item>c</item></list>";

/// Order form: per-item line totals and a grand total, a repeat over the
/// items and a computed item count.
pub fn order_engine() -> ActionEngine {
    order_engine_with(EngineConfig::default())
}

pub fn order_engine_with(config: EngineConfig) -> ActionEngine {
    let mut engine = ActionEngine::new(config).unwrap();
    let model = engine.add_model("order");
    engine.add_instance(model, "data", ORDER).unwrap();
    engine.add_bind(model, None, &BindSpec::new("item/line").with_calculate("../qty * ../price")).unwrap();
    engine.add_bind(model, None, &BindSpec::new("total").with_calculate("sum(../item/line)").with_id("total")).unwrap();

    let items = engine.add_element(None, &ElementSpec::repeat(BindingSpec::xpath("item")).named("items")).unwrap();
    engine.add_element(Some(items), &ElementSpec::control(BindingSpec::xpath("qty")).named("qty")).unwrap();
    engine.add_element(Some(items), &ElementSpec::control(BindingSpec::xpath("line")).named("line")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::bind("total")).named("total")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("count(item)")).named("count")).unwrap();
    engine.start().unwrap();
    engine
}

/// A repeat named `items` over three text items, with a `value` control per
/// item and a `current` control following `index('items')`.
pub fn list_engine() -> ActionEngine {
    let mut engine = ActionEngine::new(EngineConfig::default()).unwrap();
    let model = engine.add_model("list");
    engine.add_instance(model, "data", LIST).unwrap();
    let items = engine.add_element(None, &ElementSpec::repeat(BindingSpec::xpath("item")).named("items")).unwrap();
    engine.add_element(Some(items), &ElementSpec::control(BindingSpec::xpath(".")).named("value")).unwrap();
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("item[index('items')]")).named("current")).unwrap();
    engine.start().unwrap();
    engine
}

/// First node selected by `xpath` at the default instance root.
pub fn node(engine: &ActionEngine, xpath: &str) -> Node {
    engine
        .evaluate(xpath)
        .unwrap()
        .into_nodeset()
        .unwrap()
        .into_iter()
        .next()
        .unwrap_or_else(|| panic!("{xpath} selects nothing"))
}

pub fn string(engine: &ActionEngine, xpath: &str) -> String {
    engine.evaluate(xpath).unwrap().string_value()
}

pub fn number(engine: &ActionEngine, xpath: &str) -> f64 {
    engine.evaluate(xpath).unwrap().number_value()
}

/// Displayed value of the named element on the selected path.
pub fn shown(engine: &ActionEngine, name: &str) -> Option<String> {
    engine.presentation(name).and_then(|p| p.value.clone())
}

pub fn repeat_index(engine: &ActionEngine, name: &str) -> usize {
    engine.element_named(name).and_then(|e| e.as_repeat()).map_or(0, |r| r.index())
}
