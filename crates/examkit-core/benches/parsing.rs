use std::fmt::Write;
use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examkit_core::parser::{parse_exam_str, validate_exam};

fn exam_toml(questions_per_section: usize) -> String {
    let mut doc = String::from(
        r#"[exam]
id = "bench"
title = "Bench Exam"
level = "N4"
time_limit_secs = 3600
"#,
    );
    for (name, ty) in [("Vocabulary", "vocabulary"), ("Grammar", "grammar")] {
        let _ = write!(doc, "\n[[sections]]\nname = \"{name}\"\ntype = \"{ty}\"\n");
        for q in 0..questions_per_section {
            let _ = write!(
                doc,
                "\n[[sections.questions]]\nid = \"{ty}-{q}\"\nprompt = \"Question {q}\"\n\
                 options = [\"a\", \"b\", \"c\", \"d\"]\ncorrect = {}\n",
                q % 4
            );
        }
    }
    doc
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_exam");

    let small = exam_toml(5);
    group.bench_function("10 questions", |b| {
        b.iter(|| parse_exam_str(black_box(&small), Path::new("bench.toml")))
    });

    let large = exam_toml(200);
    group.bench_function("400 questions", |b| {
        b.iter(|| parse_exam_str(black_box(&large), Path::new("bench.toml")))
    });

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let exam = parse_exam_str(&exam_toml(200), Path::new("bench.toml")).unwrap();
    c.bench_function("validate_exam", |b| b.iter(|| validate_exam(black_box(&exam))));
}

criterion_group!(benches, bench_parse, bench_validate);
criterion_main!(benches);
