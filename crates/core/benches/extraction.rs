use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use quire_core::{Document, ExtractConfig, Readability, extract_content, preprocess_html};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{name}")).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let small = fixture("untitled.html");
    let medium = fixture("article.html");
    let filler = "<div><p>Filler paragraph text.</p></div>".repeat(500);
    let large = medium.replace("<main id=\"main\">", &format!("<main id=\"main\">{filler}"));

    let mut group = c.benchmark_group("parse");

    group.bench_with_input(BenchmarkId::new("small", "1KB"), &small, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("medium", "6KB"), &medium, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("large", "25KB"), &large, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.finish();
}

fn bench_full_extraction(c: &mut Criterion) {
    let html = fixture("article.html");
    let reader = Readability::new();

    c.bench_function("full_extraction", |b| b.iter(|| reader.parse(black_box(&html))));
}

fn bench_preprocess(c: &mut Criterion) {
    let html = fixture("article.html");
    let config = Default::default();

    c.bench_function("preprocess", |b| b.iter(|| preprocess_html(black_box(&html), &config)));
}

fn bench_scoring(c: &mut Criterion) {
    let html = fixture("article.html");
    let doc = Document::parse(&preprocess_html(&html, &Default::default())).unwrap();
    let config = ExtractConfig::default();

    c.bench_function("scoring_and_selection", |b| {
        b.iter(|| extract_content(black_box(&doc), black_box(&config)))
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_full_extraction,
    bench_preprocess,
    bench_scoring
);
criterion_main!(benches);
