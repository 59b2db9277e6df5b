use cat_rs::{
    simulate_responses, EstimationMethod, Estimator, GaussLegendre, ItemParameters, Model,
    PriorDistribution, QuestionSet,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn grm_bank(n_items: usize, n_answered: usize) -> QuestionSet {
    let items = (0..n_items)
        .map(|j| {
            let shift = -1.5 + 3.0 * j as f64 / n_items as f64;
            ItemParameters::new(
                format!("q{}", j + 1),
                0.7 + 0.02 * (j % 40) as f64,
                vec![shift - 1.0, shift, shift + 1.0],
            )
        })
        .collect();
    let qs = QuestionSet::new(Model::Grm, items).unwrap();
    let simulated = simulate_responses(&qs, 0.5, 17).unwrap();
    let answers: Vec<Option<usize>> = simulated
        .into_iter()
        .enumerate()
        .map(|(j, a)| (j < n_answered).then_some(a))
        .collect();
    qs.with_answers(&answers).unwrap()
}

fn bench_estimation(c: &mut Criterion) {
    let qs = grm_bank(100, 20);
    let prior = PriorDistribution::default();
    let quad = GaussLegendre::default();

    let mut group = c.benchmark_group("estimate_theta");
    for method in [
        EstimationMethod::Eap,
        EstimationMethod::Map,
    ] {
        let est = Estimator::new(&qs, &prior, &quad, method);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{method:?}")),
            &est,
            |b, est| b.iter(|| est.estimate_theta(black_box(None)).unwrap()),
        );
    }
    group.finish();
}

fn bench_selection(c: &mut Criterion) {
    let prior = PriorDistribution::default();
    let quad = GaussLegendre::default();

    let mut group = c.benchmark_group("select");
    group.sample_size(10);
    for criterion in [
        cat_rs::Criterion::Mfi,
        cat_rs::Criterion::Mpwi,
        cat_rs::Criterion::Epv,
    ] {
        for &n_items in &[50usize, 200] {
            let qs = grm_bank(n_items, 10);
            let est = Estimator::new(&qs, &prior, &quad, EstimationMethod::Eap);
            let selector = criterion.selector(0);
            group.bench_with_input(
                BenchmarkId::new(selector.name(), n_items),
                &est,
                |b, est| b.iter(|| selector.select(est).unwrap()),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_estimation, bench_selection);
criterion_main!(benches);
