use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use exforge_core::model::ValueKind;
use exforge_core::parser::parse_answer_sheet_str;

fn bench_parse_raw(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_raw");
    let choice = ValueKind::choice(["Mercury", "Venus", "Earth", "Mars"]);

    group.bench_function("integer", |b| {
        b.iter(|| ValueKind::Integer.parse(black_box(" 42 ")))
    });

    group.bench_function("boolean", |b| {
        b.iter(|| ValueKind::Boolean.parse(black_box("Yes")))
    });

    group.bench_function("choice", |b| b.iter(|| choice.parse(black_box("mars"))));

    group.bench_function("malformed", |b| {
        b.iter(|| ValueKind::Float.parse(black_box("one point four")))
    });

    group.finish();
}

fn bench_answer_sheet(c: &mut Criterion) {
    let mut sheet = String::new();
    for i in 0..50 {
        sheet.push_str(&format!(
            "[[attempts]]\nexercise = \"exercise-{i}\"\n[attempts.answers]\na = \"{i}\"\nb = {i}\n\n"
        ));
    }

    c.bench_function("parse_answer_sheet_50", |b| {
        b.iter(|| parse_answer_sheet_str(black_box(&sheet), Path::new("bench.toml")))
    });
}

criterion_group!(benches, bench_parse_raw, bench_answer_sheet);
criterion_main!(benches);
