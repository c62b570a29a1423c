use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// Scale used to initialise both NMF factors so that `W·H` starts near the
/// mean of `x`.
pub fn nmf_scale(mean: f64, n_components: usize) -> f64 {
    if n_components == 0 || mean <= 0.0 {
        return 0.0;
    }
    (mean / n_components as f64).sqrt()
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Standard normal sample via Box-Muller.
pub fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // gen() is in [0, 1); shift to (0, 1] so ln() stays finite
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// `scale * |N(0, 1)|` entries; non-negative by construction.
pub fn half_normal<R: Rng>(rows: usize, cols: usize, scale: f64, rng: &mut R) -> Array2<f64> {
    Array2::from_shape_simple_fn((rows, cols), || scale * standard_normal(rng).abs())
}

pub fn constant(rows: usize, cols: usize, value: f64) -> Array2<f64> {
    Array2::from_elem((rows, cols), value)
}
