//! Benchmarks for rule matching and chain resolution.
//!
//! Run with: `cargo bench -p redir-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use redir_core::{match_pattern, render, MatchMode, Rule, RuleSet};

// ============================================================================
// Helper Functions
// ============================================================================

/// Build a rule list with `filler` non-matching rules ahead of a few real ones.
fn build_rules(filler: usize) -> Vec<Rule> {
    let mut rules: Vec<Rule> = (0..filler)
        .map(|i| Rule::new(format!("https://site{i}.example/(.*)"), format!("https://mirror{i}.example/$1")))
        .collect();
    rules.push(Rule::new("https://youtu.be/:id", "https://www.youtube.com/watch?v={{pathname.groups.id}}"));
    rules.push(Rule::new("https://www.google.com/url?q=:url&*", "{{search.groups.url}}"));
    rules.push(
        Rule::new("^https://duckduckgo.com/\\?.*&q=(.*?)(&.*)?$", "https://www.google.com/search?q=$1")
            .with_mode(MatchMode::Regex),
    );
    rules
}

// ============================================================================
// Matching Benchmarks
// ============================================================================

fn bench_pattern_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_matching");

    group.bench_function("url_pattern_compile_and_match", |b| {
        b.iter(|| {
            black_box(match_pattern(
                "https://youtu.be/:id",
                MatchMode::UrlPattern,
                black_box("https://youtu.be/dQw4w9WgXcQ"),
            ))
        });
    });

    group.bench_function("regex_compile_and_match", |b| {
        b.iter(|| {
            black_box(match_pattern(
                "^https://duckduckgo.com/\\?.*&q=(.*?)(&.*)?$",
                MatchMode::Regex,
                black_box("https://duckduckgo.com/?t=h_&q=js&ia=web"),
            ))
        });
    });

    let caps = match_pattern(
        "https://www.google.com/url?q=:url&*",
        MatchMode::UrlPattern,
        "https://www.google.com/url?q=https%253A%252F%252Fexample.com%252F&sa=D",
    );
    if let Some(caps) = caps {
        group.bench_function("render_with_pipe", |b| {
            b.iter(|| black_box(render("{{ search.groups.url | decodeURIComponent }}", &caps)));
        });
    }

    group.finish();
}

// ============================================================================
// Chain Resolution Benchmarks
// ============================================================================

fn bench_chain_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_resolution");

    for filler in [0usize, 10, 100].iter() {
        let set = RuleSet::compile(&build_rules(*filler));

        group.bench_with_input(BenchmarkId::new("matched", filler), filler, |b, _| {
            b.iter(|| black_box(set.resolve(black_box("https://youtu.be/dQw4w9WgXcQ"))));
        });

        group.bench_with_input(BenchmarkId::new("two_hops", filler), filler, |b, _| {
            b.iter(|| {
                black_box(set.resolve(black_box(
                    "https://www.google.com/url?q=https://youtu.be/dQw4w9WgXcQ&sa=D",
                )))
            });
        });

        group.bench_with_input(BenchmarkId::new("not_matched", filler), filler, |b, _| {
            b.iter(|| black_box(set.resolve(black_box("https://unrelated.example/path?x=1"))));
        });
    }

    let growth = RuleSet::compile(&[Rule::new("https://x.com/r/(.*)/", "https://x.com/r/$1/top/")]);
    group.bench_function("infinite_budget_exhausted", |b| {
        b.iter(|| black_box(growth.resolve(black_box("https://x.com/r/Foo/"))));
    });

    group.finish();
}

fn bench_rule_set_compile(c: &mut Criterion) {
    let rules = build_rules(100);
    c.bench_function("rule_set_compile_103", |b| {
        b.iter(|| black_box(RuleSet::compile(black_box(&rules))));
    });
}

criterion_group!(benches, bench_pattern_matching, bench_chain_resolution, bench_rule_set_compile);
criterion_main!(benches);
