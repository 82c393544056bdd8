use std::hint::black_box;

use bindery_xpath::{
    DepSetIds, DependencySet, DependencyTags, ExprContext, Expression, ExpressionCache, FunctionRegistry,
    NamespaceResolver, Node, parse_document,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

fn sample_queries() -> Vec<&'static str> {
    vec![
        "1 + 2 * 3",
        "string-length('Lorem ipsum dolor sit amet, consectetur adipiscing elit.')",
        "/root/section/item[@type='a'][position() < 5]/@id",
        "sum(/root/section/item/@price) div count(//item)",
        "if(count(/root/section/item[@featured='true']) > 0, 'featured', 'none')",
    ]
}

fn build_sample_document() -> Node {
    let mut xml = String::from("<root xml:lang=\"en\">");
    for (s, name) in ["alpha", "beta", "gamma"].iter().enumerate() {
        xml.push_str(&format!("<section name=\"{name}\">"));
        for i in 0..50 {
            let kind = if i % 2 == 0 { "a" } else { "b" };
            let featured = if i == 7 { " featured=\"true\"" } else { "" };
            xml.push_str(&format!(
                "<item id=\"item-{s}-{i}\" type=\"{kind}\" price=\"{}\"{featured}>Item {i}</item>",
                i * 3
            ));
        }
        xml.push_str("</section>");
    }
    xml.push_str("</root>");
    parse_document(&xml).expect("sample document")
}

fn benchmark_compiler(c: &mut Criterion) {
    let queries = sample_queries();
    let ns = NamespaceResolver::with_defaults();
    let functions = FunctionRegistry::with_defaults();
    c.bench_function("compiler/compile", |b| {
        b.iter(|| {
            for q in &queries {
                let compiled = Expression::compile(black_box(q), &ns, &functions).expect("compile failure");
                black_box(compiled);
            }
        })
    });
    let cache = ExpressionCache::new();
    c.bench_function("compiler/cached", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(cache.get_or_compile(black_box(q), &ns, &functions).expect("compile failure"));
            }
        })
    });
}

fn benchmark_evaluator(c: &mut Criterion) {
    let document = build_sample_document();
    let ns = NamespaceResolver::with_defaults();
    let functions = FunctionRegistry::with_defaults();
    let compiled: Vec<(&str, Expression)> = sample_queries()
        .into_iter()
        .map(|q| (q, Expression::compile(q, &ns, &functions).expect("compile failure")))
        .collect();

    let mut group = c.benchmark_group("evaluator/evaluate");
    for (name, expr) in &compiled {
        group.bench_with_input(BenchmarkId::from_parameter(name), expr, |b, expr| {
            let ctx = ExprContext::new(&document, &ns, &functions);
            b.iter(|| black_box(expr.evaluate(black_box(&ctx)).expect("eval failure")));
        });
    }
    group.finish();

    let mut group = c.benchmark_group("evaluator/recording");
    for (name, expr) in &compiled {
        group.bench_with_input(BenchmarkId::from_parameter(name), expr, |b, expr| {
            let ids = DepSetIds::default();
            let tags = DependencyTags::new();
            b.iter(|| {
                let mut set = DependencySet::new(ids.mint());
                {
                    let sink = set.recorder(&tags);
                    let ctx = ExprContext::new(&document, &ns, &functions).with_deps(&sink);
                    black_box(expr.evaluate(&ctx).expect("eval failure"));
                }
                set.clear(&tags);
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_compiler, benchmark_evaluator);
criterion_main!(benches);
