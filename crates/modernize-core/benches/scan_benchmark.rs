use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use modernize_core::{process_source, FrameworkSet, FrameworkTag, RuleCatalog, VersionTag};

/// One class with a lazy initializer, a search loop and an instanceof cast
fn member(i: usize) -> String {
    format!(
        r#"
    private Registry registry{i};

    Registry registry{i}() {{
        if (registry{i} == null) {{
            registry{i} = new Registry();
        }}
        return registry{i};
    }}

    Item find{i}(String sku) {{
        for (Item item : items) {{
            if (item.sku().equals(sku)) {{
                return item;
            }}
        }}
        throw new IllegalArgumentException(sku);
    }}

    String describe{i}(Object o) {{
        if (o instanceof Item) {{
            Item it = (Item) o;
            return it.sku();
        }}
        return "unknown";
    }}
"#
    )
}

fn generate_unit(members: usize) -> String {
    let mut text = String::from(
        "import java.util.List;\n\nclass Generated {\n    private final List<Item> items = new java.util.ArrayList<>();\n",
    );
    for i in 0..members {
        text.push_str(&member(i));
    }
    text.push_str("}\n");
    text
}

fn bench_unit_sizes(c: &mut Criterion) {
    let catalog = RuleCatalog::builtin();
    let selection = catalog.select(VersionTag::LATEST, &FrameworkSet::new());

    let mut group = c.benchmark_group("process_source");
    for members in [1, 10, 50] {
        let source = generate_unit(members);
        group.bench_with_input(BenchmarkId::from_parameter(members), &source, |b, source| {
            b.iter(|| {
                let outcome = process_source(&selection, "Generated.java", black_box(source.clone()))
                    .unwrap();
                black_box(outcome.transformations.len())
            })
        });
    }
    group.finish();
}

fn bench_version_gating(c: &mut Criterion) {
    let catalog = RuleCatalog::builtin();
    let frameworks: FrameworkSet = [FrameworkTag::Spring, FrameworkTag::Reactor].into_iter().collect();
    let source = generate_unit(10);

    let mut group = c.benchmark_group("version_gating");
    for version in [VersionTag::Java8, VersionTag::Java17, VersionTag::Java25] {
        let selection = catalog.select(version, &frameworks);
        group.bench_with_input(BenchmarkId::from_parameter(version), &source, |b, source| {
            b.iter(|| {
                let outcome = process_source(&selection, "Generated.java", black_box(source.clone()))
                    .unwrap();
                black_box(outcome.lines_saved())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_unit_sizes, bench_version_gating);
criterion_main!(benches);
