use beam_math::linalg::solve_dense;
use beam_math::ode::{rk4_advance, OdeSystem};
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::{Array1, Array2};
use std::hint::black_box;

struct HarmonicOscillator {
    omega: f64,
}

impl OdeSystem<2> for HarmonicOscillator {
    fn derivative(&self, _t: f64, y: &[f64; 2]) -> [f64; 2] {
        [y[1], -self.omega * self.omega * y[0]]
    }
}

fn bench_rk4_oscillator(c: &mut Criterion) {
    let sys = HarmonicOscillator { omega: 1.0 };
    c.bench_function("rk4_oscillator_10k_steps", |b| {
        b.iter(|| {
            let mut y = [1.0, 0.0];
            rk4_advance(&sys, 0.0, 10.0, &mut y, 10_000);
            black_box(y[0]);
        })
    });
}

fn bench_dense_solve_4x4(c: &mut Criterion) {
    let a = Array2::from_shape_fn((4, 4), |(i, j)| if i == j { 5.0 } else { 0.3 * (i + j) as f64 });
    let b = Array1::from_vec(vec![1.0, -1.0, 0.5, 2.0]);
    c.bench_function("dense_solve_4x4", |bench| {
        bench.iter(|| black_box(solve_dense(&a, &b).unwrap()))
    });
}

criterion_group!(benches, bench_rk4_oscillator, bench_dense_solve_4x4);
criterion_main!(benches);
