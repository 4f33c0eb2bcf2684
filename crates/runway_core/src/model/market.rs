//! Market assumptions and annual return sampling
//!
//! Returns are i.i.d. normal draws around the real (after fee and inflation)
//! mean. The same [`ReturnSampler`] backs scalar draws for the per-year
//! dynamic case and full matrices for batch success-rate estimation.

use rand::{Rng, distr::Distribution};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::error::MarketError;

fn default_mean_return() -> f64 {
    0.1048
}

fn default_volatility() -> f64 {
    0.1272
}

fn default_inflation() -> f64 {
    0.03
}

fn default_fee() -> f64 {
    0.012
}

/// Immutable market assumptions, all expressed as annual decimal rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketModel {
    /// Nominal mean annual return
    #[serde(default = "default_mean_return")]
    pub mean_return: f64,
    /// Annual standard deviation of returns
    #[serde(default = "default_volatility")]
    pub volatility: f64,
    #[serde(default = "default_inflation")]
    pub inflation: f64,
    /// Flat annual fee deducted from the mean
    #[serde(default = "default_fee")]
    pub fee: f64,
}

impl Default for MarketModel {
    fn default() -> Self {
        Self {
            mean_return: default_mean_return(),
            volatility: default_volatility(),
            inflation: default_inflation(),
            fee: default_fee(),
        }
    }
}

impl MarketModel {
    #[must_use]
    pub fn new(mean_return: f64, volatility: f64, inflation: f64, fee: f64) -> Self {
        Self {
            mean_return,
            volatility,
            inflation,
            fee,
        }
    }

    /// Mean return after subtracting fee and inflation
    #[must_use]
    pub fn real_mean(&self) -> f64 {
        self.mean_return - self.fee - self.inflation
    }
}

/// Normal(real mean, volatility) sampler for annual returns
#[derive(Debug, Clone)]
pub struct ReturnSampler {
    distribution: Normal<f64>,
    mean: f64,
    volatility: f64,
}

impl ReturnSampler {
    pub fn new(market: &MarketModel) -> Result<Self, MarketError> {
        let mean = market.real_mean();
        let volatility = market.volatility;

        if !mean.is_finite() {
            return Err(MarketError::InvalidDistributionParameters {
                mean,
                volatility,
                reason: "mean must be finite",
            });
        }

        // Normal::new only rejects a non-finite std_dev
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(MarketError::InvalidDistributionParameters {
                mean,
                volatility,
                reason: "volatility must be non-negative and finite",
            });
        }

        let distribution =
            Normal::new(mean, volatility).map_err(|_| MarketError::InvalidDistributionParameters {
                mean,
                volatility,
                reason: "volatility must be non-negative and finite",
            })?;

        Ok(Self {
            distribution,
            mean,
            volatility,
        })
    }

    #[must_use]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[must_use]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Draw a single annual return
    #[inline]
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.distribution.sample(rng)
    }

    /// Draw a `years x paths` matrix of independent annual returns
    pub fn sample_matrix<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        years: usize,
        paths: usize,
    ) -> ReturnMatrix {
        let values = (0..years * paths).map(|_| self.sample(rng)).collect();
        ReturnMatrix {
            years,
            paths,
            values,
        }
    }
}

/// Pre-generated returns, row-major by year
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    years: usize,
    paths: usize,
    values: Vec<f64>,
}

impl ReturnMatrix {
    #[must_use]
    pub fn years(&self) -> usize {
        self.years
    }

    #[must_use]
    pub fn paths(&self) -> usize {
        self.paths
    }

    /// Return for `year` on `path`; panics when out of range
    #[inline]
    #[must_use]
    pub fn get(&self, year: usize, path: usize) -> f64 {
        assert!(year < self.years && path < self.paths);
        self.values[year * self.paths + path]
    }

    /// View a single path's returns as a [`ReturnSource`]
    #[must_use]
    pub fn column(&self, path: usize) -> MatrixColumn<'_> {
        MatrixColumn { matrix: self, path }
    }
}

/// Supplies the annual return for a given (zero-based) year of a path
pub trait ReturnSource {
    fn next_return(&mut self, year: usize) -> f64;
}

/// Draws each year's return lazily from a sampler
pub struct SampledReturns<'a, R: Rng + ?Sized> {
    sampler: &'a ReturnSampler,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> SampledReturns<'a, R> {
    pub fn new(sampler: &'a ReturnSampler, rng: &'a mut R) -> Self {
        Self { sampler, rng }
    }
}

impl<R: Rng + ?Sized> ReturnSource for SampledReturns<'_, R> {
    fn next_return(&mut self, _year: usize) -> f64 {
        self.sampler.sample(&mut *self.rng)
    }
}

/// One path of a [`ReturnMatrix`]
#[derive(Debug, Clone, Copy)]
pub struct MatrixColumn<'a> {
    matrix: &'a ReturnMatrix,
    path: usize,
}

impl ReturnSource for MatrixColumn<'_> {
    fn next_return(&mut self, year: usize) -> f64 {
        self.matrix.get(year, self.path)
    }
}

/// Fixed sequence of returns, mostly useful for deterministic tests
///
/// Panics when asked for a year past the end of the slice.
impl ReturnSource for &[f64] {
    fn next_return(&mut self, year: usize) -> f64 {
        (**self)[year]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn test_real_mean_subtracts_fee_and_inflation() {
        let market = MarketModel::new(0.1048, 0.1272, 0.03, 0.012);
        assert!((market.real_mean() - 0.0628).abs() < 1e-12);
    }

    #[test]
    fn test_negative_volatility_rejected() {
        let market = MarketModel::new(0.08, -0.1, 0.0, 0.0);
        assert!(ReturnSampler::new(&market).is_err());
    }

    #[test]
    fn test_non_finite_volatility_rejected() {
        for volatility in [f64::NAN, f64::INFINITY, -0.0001] {
            let market = MarketModel::new(0.08, volatility, 0.0, 0.0);
            assert!(matches!(
                ReturnSampler::new(&market),
                Err(MarketError::InvalidDistributionParameters { .. })
            ));
        }
    }

    #[test]
    #[should_panic]
    fn test_short_slice_panics_past_end() {
        let returns = [0.05, 0.05];
        let mut source: &[f64] = &returns;
        source.next_return(2);
    }

    #[test]
    fn test_zero_volatility_is_constant() {
        let market = MarketModel::new(0.05, 0.0, 0.0, 0.0);
        let sampler = ReturnSampler::new(&market).unwrap();
        let mut rng = SmallRng::seed_from_u64(1);
        let matrix = sampler.sample_matrix(&mut rng, 3, 4);
        for year in 0..3 {
            for path in 0..4 {
                assert_eq!(matrix.get(year, path), 0.05);
            }
        }
    }

    #[test]
    fn test_matrix_sample_moments() {
        let market = MarketModel::new(0.1048, 0.1272, 0.03, 0.012);
        let sampler = ReturnSampler::new(&market).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);
        let matrix = sampler.sample_matrix(&mut rng, 100, 500);

        let n = (matrix.years() * matrix.paths()) as f64;
        let mean = matrix.values.iter().sum::<f64>() / n;
        let var = matrix.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        assert!((mean - sampler.mean()).abs() < 0.005, "mean {mean}");
        assert!((var.sqrt() - 0.1272).abs() < 0.005, "std {}", var.sqrt());
    }

    #[test]
    fn test_matrix_column_reads_one_path() {
        let market = MarketModel::new(0.07, 0.1, 0.0, 0.0);
        let sampler = ReturnSampler::new(&market).unwrap();
        let mut rng = SmallRng::seed_from_u64(9);
        let matrix = sampler.sample_matrix(&mut rng, 5, 3);

        let mut column = matrix.column(2);
        for year in 0..5 {
            assert_eq!(column.next_return(year), matrix.get(year, 2));
        }
    }
}
