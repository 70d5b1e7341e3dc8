//! Generator benchmarks

use criterion::{criterion_group, criterion_main, Criterion};
use generar::capabilities::CapabilitySet;
use generar::session::Generator;

fn benchmark_generate_shallow(c: &mut Criterion) {
    let mut generator = Generator::new(42).expect("grammar should build");

    c.bench_function("generate_program_depth_3", |b| {
        b.iter(|| generator.generate_program(3));
    });
}

fn benchmark_generate_deep(c: &mut Criterion) {
    let mut generator = Generator::new(42).expect("grammar should build");

    c.bench_function("generate_program_depth_14", |b| {
        b.iter(|| generator.generate_program(14));
    });
}

fn benchmark_build_grammar(c: &mut Criterion) {
    c.bench_function("build_grammar_spidermonkey", |b| {
        b.iter(|| {
            Generator::builder()
                .capabilities(CapabilitySet::spidermonkey_shell())
                .build()
                .expect("grammar should build")
        });
    });
}

criterion_group!(
    benches,
    benchmark_generate_shallow,
    benchmark_generate_deep,
    benchmark_build_grammar
);
criterion_main!(benches);
