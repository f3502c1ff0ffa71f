use criterion::{black_box, criterion_group, criterion_main, Criterion};
use swine_core::preprocess::Preprocessor;
use swine_core::{Config, Semantics};
use swine_smt::terms::SmtTerm;

/// `sum_i exp(2, x_i) * exp(x_i, 3) + 3^40 = 2^64`
fn wide_formula(width: usize) -> SmtTerm {
    let summands = (0..width)
        .map(|i| {
            let x = SmtTerm::var(format!("x{i}"));
            SmtTerm::exp(SmtTerm::int(2), x.clone()).mul(SmtTerm::exp(x, SmtTerm::int(3)))
        })
        .chain(std::iter::once(SmtTerm::exp(SmtTerm::int(3), SmtTerm::int(40))))
        .collect();
    SmtTerm::sum(summands).eq(SmtTerm::exp(SmtTerm::int(2), SmtTerm::int(64)))
}

/// `exp(exp(exp(2, x), 2), 3)` nested `depth` times.
fn tower(depth: usize) -> SmtTerm {
    (0..depth).fold(SmtTerm::var("x"), |acc, i| {
        SmtTerm::exp(acc, SmtTerm::int(2 + (i % 3) as i64))
    })
}

fn bench_wide_partial(c: &mut Criterion) {
    let pp = Preprocessor::new(&Config::default());
    let formula = wide_formula(64);
    c.bench_function("preprocess_wide_partial", |b| {
        b.iter(|| pp.preprocess(black_box(&formula)))
    });
}

fn bench_wide_total(c: &mut Criterion) {
    let pp = Preprocessor::new(&Config::default().with_semantics(Semantics::Total));
    let formula = wide_formula(64);
    c.bench_function("preprocess_wide_total", |b| {
        b.iter(|| pp.preprocess(black_box(&formula)))
    });
}

fn bench_tower(c: &mut Criterion) {
    let pp = Preprocessor::new(&Config::default().with_semantics(Semantics::Total));
    let formula = tower(4).eq(SmtTerm::int(0));
    c.bench_function("preprocess_tower", |b| {
        b.iter(|| pp.preprocess(black_box(&formula)))
    });
}

criterion_group!(benches, bench_wide_partial, bench_wide_total, bench_tower);
criterion_main!(benches);
