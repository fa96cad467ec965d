use criterion::{criterion_group, criterion_main, Criterion};
use rematch::{DfaMatchOptions, MatchOptions, MatchSettings, Regex};
use std::hint::black_box;

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("compile and match", |b| {
        b.iter(|| {
            let re = Regex::new(r"\d+").unwrap();
            let _result = re.find(black_box("Price: $123"));
        })
    });

    let dates = Regex::new(r"(\d{1,2})/(\d{1,2})/(\d{4})").unwrap();
    c.bench_function("complex match", |b| {
        b.iter(|| {
            let _result = dates.find(black_box("Born on 12/25/1990 and graduated on 5/15/2012"));
        })
    });

    let text = "lorem ipsum dolor sit amet ".repeat(200);
    let words = Regex::new(r"\b\w+\b").unwrap();
    c.bench_function("find all words", |b| {
        b.iter(|| words.find_iter(black_box(&text)).count())
    });

    let mut session = words.session(&MatchSettings::default());
    c.bench_function("session match", |b| {
        b.iter(|| {
            let _result = session.match_at(black_box(text.as_bytes()), 0, &MatchOptions::default(), None);
        })
    });

    let alternation = Regex::new(r"sit|amet|dolor sit").unwrap();
    c.bench_function("dfa all matches", |b| {
        b.iter(|| {
            let _result =
                alternation.dfa_match(black_box(text.as_bytes()), 0, &DfaMatchOptions::default(), None);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
