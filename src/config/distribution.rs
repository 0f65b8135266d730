//! Distributions of per-leaf event rates.

use rand::Rng;
use rand_distr::{Distribution, Gamma};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{HidtlError, Result};

/// Distribution from which one rate is drawn per species leaf.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RateDistribution {
    /// Gamma distribution with shape `k` and scale `θ`.
    Gamma { shape: f64, scale: f64 },

    /// Every leaf receives the same value.
    Constant { value: f64 },
}

impl Default for RateDistribution {
    fn default() -> Self {
        RateDistribution::Gamma {
            shape: 1.,
            scale: 1.,
        }
    }
}

impl RateDistribution {
    pub fn validate(&self, name: &str) -> Result<()> {
        match *self {
            RateDistribution::Gamma { shape, scale } => {
                if !(shape.is_finite() && shape > 0.) {
                    return Err(HidtlError::ConfigurationError(format!(
                        "{name}: gamma shape must be a positive number, got {shape}"
                    )));
                }
                if !(scale.is_finite() && scale > 0.) {
                    return Err(HidtlError::ConfigurationError(format!(
                        "{name}: gamma scale must be a positive number, got {scale}"
                    )));
                }
            }
            RateDistribution::Constant { value } => {
                if !(value.is_finite() && value >= 0.) {
                    return Err(HidtlError::ConfigurationError(format!(
                        "{name}: constant must be a non-negative number, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Draw `n` values.
    pub fn sample_n<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Result<Vec<f64>> {
        match *self {
            RateDistribution::Gamma { shape, scale } => {
                let gamma = Gamma::new(shape, scale).map_err(|err| {
                    HidtlError::ConfigurationError(format!("Invalid gamma distribution: {err}"))
                })?;
                Ok((0..n).map(|_| gamma.sample(rng)).collect())
            }
            RateDistribution::Constant { value } => Ok(vec![value; n]),
        }
    }
}

impl fmt::Display for RateDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateDistribution::Gamma { shape, scale } => write!(f, "shape={shape},scale={scale}"),
            RateDistribution::Constant { value } => write!(f, "const={value}"),
        }
    }
}

/// Parses `shape=<k>,scale=<θ>` or `const=<value>`.
impl FromStr for RateDistribution {
    type Err = HidtlError;

    fn from_str(s: &str) -> Result<Self> {
        let mut shape = None;
        let mut scale = None;
        let mut constant = None;
        for piece in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = piece.split_once('=').ok_or_else(|| {
                HidtlError::ConfigurationError(format!("Expected `key=value`, got `{piece}`"))
            })?;
            let value: f64 = value.trim().parse().map_err(|_| {
                HidtlError::ConfigurationError(format!("Invalid number in `{piece}`"))
            })?;
            match key.trim() {
                "shape" => shape = Some(value),
                "scale" => scale = Some(value),
                "const" => constant = Some(value),
                other => {
                    return Err(HidtlError::ConfigurationError(format!(
                        "Unknown distribution parameter `{other}`"
                    )));
                }
            }
        }
        match (shape, scale, constant) {
            (Some(shape), Some(scale), None) => Ok(RateDistribution::Gamma { shape, scale }),
            (None, None, Some(value)) => Ok(RateDistribution::Constant { value }),
            _ => Err(HidtlError::ConfigurationError(format!(
                "Expected `shape=..,scale=..` or `const=..`, got `{s}`"
            ))),
        }
    }
}
