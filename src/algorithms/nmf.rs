//! Non-negative matrix factorization `X ≈ W·H` fitted with multiplicative
//! updates on the Frobenius loss, with optional elastic-net regularisation on
//! both factors.

use super::initializer;
use super::LatentFactorModel;
use crate::error::{RecommenderError, Result};
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const EPSILON: f64 = f64::EPSILON;
const CONVERGENCE_CHECK_INTERVAL: usize = 10;

/// Solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nmf {
    pub n_components: usize,
    pub max_iter: usize,
    /// Mix between L1 (`1.0`) and L2 (`0.0`) penalties.
    pub l1_ratio: f64,
    /// Overall regularisation strength; `0.0` disables it.
    pub alpha: f64,
    pub tol: f64,
    pub seed: u64,
}

impl Default for Nmf {
    fn default() -> Self {
        Self {
            n_components: 150,
            max_iter: 5_000,
            l1_ratio: 0.5,
            alpha: 0.0,
            tol: 1e-4,
            seed: 0,
        }
    }
}

impl From<&crate::config::TrainingConfig> for Nmf {
    fn from(config: &crate::config::TrainingConfig) -> Self {
        Self {
            n_components: config.n_components,
            max_iter: config.max_iter,
            l1_ratio: config.l1_ratio,
            alpha: config.alpha,
            tol: config.tol,
            seed: config.seed,
        }
    }
}

/// A fitted factorization: the learned components `H` plus the solver state
/// needed to project new rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NmfModel {
    pub config: Nmf,
    /// `n_components × n_features`.
    pub components: Array2<f64>,
    pub n_iter: usize,
    /// `||X - W·H||_F` on the training matrix.
    pub reconstruction_err: f64,
}

struct Penalty {
    l1: f64,
    l2: f64,
}

impl Nmf {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            ..Self::default()
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_regularization(mut self, alpha: f64, l1_ratio: f64) -> Self {
        self.alpha = alpha;
        self.l1_ratio = l1_ratio;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(RecommenderError::Training(
                "n_components must be at least 1".to_string(),
            ));
        }
        if self.max_iter == 0 {
            return Err(RecommenderError::Training("max_iter must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.l1_ratio) {
            return Err(RecommenderError::Training(format!(
                "l1_ratio must be within [0, 1], got {}",
                self.l1_ratio
            )));
        }
        if self.alpha < 0.0 || !self.alpha.is_finite() {
            return Err(RecommenderError::Training(format!(
                "alpha must be non-negative, got {}",
                self.alpha
            )));
        }
        Ok(())
    }

    // Penalties scale with the opposite dimension so alpha means the same
    // thing regardless of matrix shape.
    fn penalty(&self, scale: usize) -> Penalty {
        let strength = self.alpha * scale as f64;
        Penalty {
            l1: strength * self.l1_ratio,
            l2: strength * (1.0 - self.l1_ratio),
        }
    }

    /// Fits the model on `x` and returns it together with `W`.
    pub fn fit(&self, x: ArrayView2<'_, f64>) -> Result<(NmfModel, Array2<f64>)> {
        self.validate()?;
        check_non_negative(x)?;

        let (n_samples, n_features) = x.dim();
        let scale = initializer::nmf_scale(x.mean().unwrap_or(0.0), self.n_components);
        let mut rng = initializer::seeded_rng(self.seed);
        let mut h = initializer::half_normal(self.n_components, n_features, scale, &mut rng);
        let mut w = initializer::half_normal(n_samples, self.n_components, scale, &mut rng);

        let penalty_w = self.penalty(n_features);
        let penalty_h = self.penalty(n_samples);

        let error_at_init = frobenius_error(x, &w, &h);
        let mut previous_error = error_at_init;
        let mut n_iter = 0;

        for iter in 1..=self.max_iter {
            update_w(x, &mut w, &h, &penalty_w);
            update_h(x, &w, &mut h, &penalty_h);
            n_iter = iter;

            if iter % CONVERGENCE_CHECK_INTERVAL == 0 {
                let error = frobenius_error(x, &w, &h);
                debug!("nmf iteration {}: error {:.6}", iter, error);
                if converged(previous_error, error, error_at_init, self.tol) {
                    break;
                }
                previous_error = error;
            }
        }

        let reconstruction_err = frobenius_error(x, &w, &h);
        if n_iter == self.max_iter {
            info!(
                "NMF reached max_iter={} without converging (error {:.4})",
                self.max_iter, reconstruction_err
            );
        } else {
            info!(
                "NMF converged after {} iterations (error {:.4})",
                n_iter, reconstruction_err
            );
        }

        let model = NmfModel {
            config: self.clone(),
            components: h,
            n_iter,
            reconstruction_err,
        };
        Ok((model, w))
    }
}

impl NmfModel {
    pub fn n_features(&self) -> usize {
        self.components.ncols()
    }

    /// Solves for `W` with the components held fixed.
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let (n_samples, n_features) = x.dim();
        if n_features != self.n_features() {
            return Err(RecommenderError::InvalidInput(format!(
                "expected {} columns, got {}",
                self.n_features(),
                n_features
            )));
        }
        check_non_negative(x)?;

        let k = self.config.n_components;
        let scale = initializer::nmf_scale(x.mean().unwrap_or(0.0), k);
        let mut w = initializer::constant(n_samples, k, scale);
        let penalty = self.config.penalty(n_features);
        let h = &self.components;

        let error_at_init = frobenius_error(x, &w, h);
        let mut previous_error = error_at_init;

        for iter in 1..=self.config.max_iter {
            update_w(x, &mut w, h, &penalty);

            if iter % CONVERGENCE_CHECK_INTERVAL == 0 {
                let error = frobenius_error(x, &w, h);
                if converged(previous_error, error, error_at_init, self.config.tol) {
                    break;
                }
                previous_error = error;
            }
        }

        Ok(w)
    }
}

impl LatentFactorModel for NmfModel {
    fn n_components(&self) -> usize {
        self.config.n_components
    }

    fn components(&self) -> ArrayView2<'_, f64> {
        self.components.view()
    }

    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        NmfModel::transform(self, x)
    }
}

fn check_non_negative(x: ArrayView2<'_, f64>) -> Result<()> {
    if x.is_empty() {
        return Err(RecommenderError::InvalidInput("matrix is empty".to_string()));
    }
    if x.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(RecommenderError::InvalidInput(
            "NMF input must be finite and non-negative".to_string(),
        ));
    }
    Ok(())
}

fn converged(previous: f64, current: f64, initial: f64, tol: f64) -> bool {
    if initial <= 0.0 {
        return true;
    }
    (previous - current) / initial < tol
}

// W <- W * (X·Hᵀ) / (W·H·Hᵀ + l1 + l2·W)
fn update_w(x: ArrayView2<'_, f64>, w: &mut Array2<f64>, h: &Array2<f64>, penalty: &Penalty) {
    let numerator = x.dot(&h.t());
    let hht = h.dot(&h.t());
    let mut denominator = w.dot(&hht);
    apply_penalty(&mut denominator, w, penalty);
    multiplicative_step(w, &numerator, &denominator);
}

// H <- H * (Wᵀ·X) / (Wᵀ·W·H + l1 + l2·H)
fn update_h(x: ArrayView2<'_, f64>, w: &Array2<f64>, h: &mut Array2<f64>, penalty: &Penalty) {
    let numerator = w.t().dot(&x);
    let wtw = w.t().dot(w);
    let mut denominator = wtw.dot(&*h);
    apply_penalty(&mut denominator, h, penalty);
    multiplicative_step(h, &numerator, &denominator);
}

fn apply_penalty(denominator: &mut Array2<f64>, factor: &Array2<f64>, penalty: &Penalty) {
    if penalty.l1 == 0.0 && penalty.l2 == 0.0 {
        return;
    }
    Zip::from(denominator)
        .and(factor)
        .for_each(|d, &f| *d += penalty.l1 + penalty.l2 * f);
}

fn multiplicative_step(factor: &mut Array2<f64>, numerator: &Array2<f64>, denominator: &Array2<f64>) {
    Zip::from(factor)
        .and(numerator)
        .and(denominator)
        .for_each(|f, &n, &d| *f *= n / d.max(EPSILON));
}

pub fn frobenius_error(x: ArrayView2<'_, f64>, w: &Array2<f64>, h: &Array2<f64>) -> f64 {
    let reconstruction = w.dot(h);
    Zip::from(x)
        .and(&reconstruction)
        .fold(0.0, |acc, &a, &b| acc + (a - b).powi(2))
        .sqrt()
}
