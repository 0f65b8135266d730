//! Per-leaf rates and branch intensities.
//!
//! Every stochastic process draws one value per species leaf. The intensity
//! on a branch is the arithmetic mean of the values of the leaves below it.

use rand::Rng;
use rand_distr::{Distribution, Exp};

use super::clade::Clade;
use crate::config::RateDistribution;
use crate::errors::Result;

#[derive(Clone, Debug, PartialEq)]
pub struct RateVector {
    rates: Vec<f64>,
}

impl RateVector {
    pub fn new(rates: Vec<f64>) -> Self {
        Self { rates }
    }

    /// Draw one rate for each of `n_leaves` species leaves.
    pub fn sample<R: Rng + ?Sized>(
        distribution: &RateDistribution,
        n_leaves: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self::new(distribution.sample_n(n_leaves, rng)?))
    }

    /// Draw one population size per leaf and store its inverse, the rate of
    /// coalescence. A population size of zero merges instantly.
    pub fn sample_coalescent<R: Rng + ?Sized>(
        distribution: &RateDistribution,
        n_leaves: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let rates = distribution
            .sample_n(n_leaves, rng)?
            .into_iter()
            .map(|size| if size > 0. { size.recip() } else { f64::INFINITY })
            .collect();
        Ok(Self::new(rates))
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rate of species leaf `leaf`. Species leaves hold the lowest ids, so
    /// `leaf` must be below [`RateVector::len`].
    pub fn rate(&self, leaf: usize) -> f64 {
        self.rates[leaf]
    }

    /// Mean rate over the leaves of `clade`.
    pub fn mean(&self, clade: &Clade) -> f64 {
        if clade.is_empty() {
            return 0.;
        }
        clade.leaves().map(|leaf| self.rate(leaf)).sum::<f64>() / clade.len() as f64
    }

    /// Mean rate over the union of `clades`.
    pub fn mean_over(&self, clades: &[Clade]) -> f64 {
        let union: Clade = clades.iter().flat_map(|clade| clade.leaves()).collect();
        self.mean(&union)
    }
}

/// Exponential waiting time. A non-positive rate never fires and an
/// infinite rate fires immediately.
pub fn exponential<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> f64 {
    if rate.is_nan() || rate <= 0. {
        return f64::INFINITY;
    }
    if rate.is_infinite() {
        return 0.;
    }
    match Exp::new(rate) {
        Ok(distribution) => distribution.sample(rng),
        Err(_) => f64::INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn mean() {
        let rates = RateVector::new(vec![1., 2., 6.]);
        assert_eq!(rates.mean(&Clade::leaf(2)), 6.);
        assert_eq!(rates.mean(&[0, 1, 2].into_iter().collect()), 3.);
        assert_eq!(rates.mean_over(&[Clade::leaf(0), Clade::leaf(1)]), 1.5);
        assert_eq!(rates.mean(&std::iter::empty().collect()), 0.);
    }

    #[test]
    #[should_panic]
    fn unknown_leaf_has_no_rate() {
        let rates = RateVector::new(vec![1., 2., 6.]);
        rates.mean(&Clade::leaf(7));
    }

    #[test]
    fn coalescent_inverts_population_size() {
        let mut rng = StdRng::seed_from_u64(1);
        let sizes = RateDistribution::Constant { value: 4. };
        let rates = RateVector::sample_coalescent(&sizes, 3, &mut rng).unwrap();
        assert_eq!(rates, RateVector::new(vec![0.25; 3]));

        let instant = RateDistribution::Constant { value: 0. };
        let rates = RateVector::sample_coalescent(&instant, 2, &mut rng).unwrap();
        assert!(rates.rate(0).is_infinite());
    }

    #[test]
    fn exponential_limits() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(exponential(0., &mut rng).is_infinite());
        assert!(exponential(-1., &mut rng).is_infinite());
        assert!(exponential(f64::NAN, &mut rng).is_infinite());
        assert_eq!(exponential(f64::INFINITY, &mut rng), 0.);

        let n = 10_000;
        let mean = (0..n).map(|_| exponential(4., &mut rng)).sum::<f64>() / n as f64;
        assert!((mean - 0.25).abs() < 0.02);
    }
}
