use std::hint::black_box;

use bindery_engine::{Action, ActionEngine, BindSpec, BindingSpec, ElementSpec, EngineConfig};
use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};

fn order_xml(items: usize) -> String {
    let mut xml = String::from("<order>");
    for i in 0..items {
        xml.push_str(&format!("<item><qty>{}</qty><price>{}</price><line/></item>", i % 7 + 1, i * 3 + 1));
    }
    xml.push_str("<total/></order>");
    xml
}

fn order_form(items: usize) -> ActionEngine {
    let mut engine = ActionEngine::new(EngineConfig::default()).expect("engine");
    let model = engine.add_model("order");
    engine.add_instance(model, "data", &order_xml(items)).expect("instance");
    engine.add_bind(model, None, &BindSpec::new("item/line").with_calculate("../qty * ../price")).expect("bind");
    engine.add_bind(model, None, &BindSpec::new("total").with_calculate("sum(../item/line)")).expect("bind");
    let repeat = engine.add_element(None, &ElementSpec::repeat(BindingSpec::xpath("item")).named("items")).expect("repeat");
    engine.add_element(Some(repeat), &ElementSpec::control(BindingSpec::xpath("qty"))).expect("control");
    engine.add_element(Some(repeat), &ElementSpec::control(BindingSpec::xpath("line"))).expect("control");
    engine.add_element(None, &ElementSpec::control(BindingSpec::xpath("total")).named("total")).expect("control");
    engine
}

fn benchmark_start(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/start");
    for items in [10usize, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, &items| {
            b.iter_batched(
                || order_form(items),
                |mut engine| {
                    engine.start().expect("start");
                    black_box(engine)
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn benchmark_set_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/setvalue");
    for items in [10usize, 100] {
        let mut engine = order_form(items);
        engine.start().expect("start");
        let mut n = 0u32;
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, _| {
            b.iter(|| {
                n = n % 9 + 1;
                let action = Action::set_literal(BindingSpec::xpath("item[1]/qty"), n.to_string());
                engine.run_action(black_box(&action), None).expect("setvalue");
            });
        });
    }
    group.finish();
}

fn benchmark_refresh(c: &mut Criterion) {
    let mut engine = order_form(100);
    engine.start().expect("start");
    c.bench_function("engine/refresh", |b| b.iter(|| engine.refresh().expect("refresh")));
}

criterion_group!(benches, benchmark_start, benchmark_set_value, benchmark_refresh);
criterion_main!(benches);
