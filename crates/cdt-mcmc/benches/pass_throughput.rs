use criterion::{criterion_group, criterion_main, Criterion};

use cdt_mcmc::{build_universe, run, RunConfig};

fn bench_pass(c: &mut Criterion) {
    let mut config = RunConfig::default();
    config.universe.simplices = 240;
    config.universe.timeslices = 4;
    config.passes = 1;
    config.output.run_directory = None;
    config.checkpoint.interval = 0;
    let manifold = build_universe(&config).unwrap();

    c.bench_function("metropolis_pass", |b| {
        b.iter(|| {
            let _ = run(&config, manifold.clone()).unwrap();
        })
    });
}

criterion_group!(benches, bench_pass);
criterion_main!(benches);
