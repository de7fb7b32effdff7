use calibra::binning::{MedianVarianceBinning, UniformBinning};
use calibra::data::{Predictions, Targets};
use calibra::ece::ECE;
use calibra::estimator::CalibrationErrorEstimator;
use calibra::hypothesis::{AsymptoticSKCETest, CalibrationTest, ConsistencyTest};
use calibra::kernels::{scale, tensor, ExponentialKernel, WhiteKernel};
use calibra::skce::SKCE;
use calibra::utils::{fast_sum, sq_euclidean};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Dirichlet, Distribution};
use std::time::Duration;

fn create_data(n: usize, nclasses: usize, seed: u64) -> (Predictions, Targets) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dirichlet = Dirichlet::new(&vec![1.0; nclasses]).unwrap();
    let rows: Vec<Vec<f64>> = (0..n).map(|_| dirichlet.sample(&mut rng)).collect();
    let labels: Vec<usize> = (0..n).map(|_| rng.gen_range(1..=nclasses)).collect();
    (Predictions::from_rows(&rows).unwrap(), Targets::from(labels))
}

pub fn estimator_benchmarks(c: &mut Criterion) {
    let v: Vec<f64> = vec![10.; 300000];
    c.bench_function("fast sum", |b| b.iter(|| fast_sum(black_box(&v))));
    c.bench_function("sq euclidean", |b| {
        b.iter(|| sq_euclidean(black_box(&v[..1000]), black_box(&v[1000..2000])))
    });

    let (predictions, targets) = create_data(1_000, 10, 0);
    let ece = ECE::new(UniformBinning::new(10).unwrap());
    c.bench_function("ECE uniform binning", |b| {
        b.iter(|| ece.estimate(black_box(&predictions), black_box(&targets)).unwrap())
    });
    let ece = ECE::new(MedianVarianceBinning::default());
    c.bench_function("ECE median variance binning", |b| {
        b.iter(|| ece.estimate(black_box(&predictions), black_box(&targets)).unwrap())
    });

    let kernel = tensor(scale(ExponentialKernel, 3.0).unwrap(), WhiteKernel);
    let biased = SKCE::biased(kernel.clone());
    let unbiased = SKCE::unbiased(kernel.clone()).set_parallel(false);
    let block = SKCE::block(kernel, 2).unwrap();
    c.bench_function("biased SKCE", |b| {
        b.iter(|| biased.estimate(black_box(&predictions), black_box(&targets)).unwrap())
    });
    c.bench_function("unbiased SKCE sequential", |b| {
        b.iter(|| unbiased.estimate(black_box(&predictions), black_box(&targets)).unwrap())
    });
    c.bench_function("block unbiased SKCE", |b| {
        b.iter(|| block.estimate(black_box(&predictions), black_box(&targets)).unwrap())
    });
}

pub fn test_benchmarks(c: &mut Criterion) {
    let (predictions, targets) = create_data(500, 2, 1);
    let kernel = tensor(scale(ExponentialKernel, 3.0).unwrap(), WhiteKernel);

    let mut group = c.benchmark_group("calibration_tests");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(30));

    let test = ConsistencyTest::new(SKCE::biased(kernel.clone()), &predictions, &targets)
        .unwrap()
        .set_bootstrap_iters(100);
    group.bench_function("consistency test", |b| {
        b.iter(|| test.run(&mut StdRng::seed_from_u64(0)).unwrap())
    });

    let test = AsymptoticSKCETest::new(kernel, &predictions, &targets)
        .unwrap()
        .set_bootstrap_iters(100);
    group.bench_function("asymptotic SKCE test", |b| {
        b.iter(|| test.run(&mut StdRng::seed_from_u64(0)).unwrap())
    });
    group.finish();
}

criterion_group!(benches, estimator_benchmarks, test_benchmarks);
criterion_main!(benches);
