pub mod initializer;
pub mod nmf;

use crate::error::Result;
use ndarray::{Array2, ArrayView2};

pub use nmf::{Nmf, NmfModel};

/// A fitted latent-factor model able to embed rows shaped like its training
/// matrix.
pub trait LatentFactorModel: Send + Sync {
    fn n_components(&self) -> usize;

    /// `n_components × n_features`.
    fn components(&self) -> ArrayView2<'_, f64>;

    /// Projects `x` (`n × n_features`) into latent space (`n × n_components`).
    fn transform(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>>;

    /// Predicted ratings for `x`: `transform(x) · components`.
    fn reconstruct(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        Ok(self.transform(x)?.dot(&self.components()))
    }
}
