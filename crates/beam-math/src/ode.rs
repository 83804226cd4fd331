//! Fixed-step Runge–Kutta integration for small ODE systems.
//!
//! State vectors are plain `[f64; N]` arrays so that the envelope equations
//! (N = 4) and single-particle transfer (N = 2) share one stepper without
//! allocation.

/// First-order system `dy/dt = f(t, y)`.
pub trait OdeSystem<const N: usize> {
    fn derivative(&self, t: f64, y: &[f64; N]) -> [f64; N];
}

fn axpy<const N: usize>(y: &[f64; N], h: f64, k: &[f64; N]) -> [f64; N] {
    std::array::from_fn(|i| y[i] + h * k[i])
}

/// Perform one classical RK4 step in place.
pub fn rk4_step<S: OdeSystem<N>, const N: usize>(system: &S, t: f64, y: &mut [f64; N], dt: f64) {
    if !dt.is_finite() || dt == 0.0 {
        return;
    }

    let k1 = system.derivative(t, y);
    let k2 = system.derivative(t + 0.5 * dt, &axpy(y, 0.5 * dt, &k1));
    let k3 = system.derivative(t + 0.5 * dt, &axpy(y, 0.5 * dt, &k2));
    let k4 = system.derivative(t + dt, &axpy(y, dt, &k3));

    for i in 0..N {
        y[i] += dt * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]) / 6.0;
    }
}

/// Advance `y` from `t0` to `t1` in `steps` equal RK4 steps.
pub fn rk4_advance<S: OdeSystem<N>, const N: usize>(
    system: &S,
    t0: f64,
    t1: f64,
    y: &mut [f64; N],
    steps: usize,
) {
    if steps == 0 {
        return;
    }
    let dt = (t1 - t0) / steps as f64;
    for i in 0..steps {
        rk4_step(system, t0 + i as f64 * dt, y, dt);
    }
}
