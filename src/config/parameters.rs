use serde::{Deserialize, Serialize};
use std::fs;

use super::distribution::RateDistribution;
use crate::errors::{HidtlError, Result};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Distribution of the per-leaf effective population size. The coalescent rate of a leaf is
    /// the inverse of its drawn value.
    #[serde(default)]
    pub coalescent: RateDistribution,

    /// Distribution of the per-leaf duplication rate.
    #[serde(default)]
    pub duplication: RateDistribution,

    /// Distribution of the per-leaf transfer rate.
    #[serde(default)]
    pub transfer: RateDistribution,

    /// Distribution of the per-leaf loss rate.
    #[serde(default)]
    pub loss: RateDistribution,

    /// Allow incomplete lineage sorting in sub-simulations. When disabled every sub-simulation
    /// must coalesce into a single lineage before the event that spawned it.
    #[serde(default = "default_true")]
    pub hemiplasy: bool,

    /// When disabled, the species subtree of a duplication is restricted to the species present
    /// in the duplicated gene lineage.
    #[serde(default = "default_true")]
    pub recombination: bool,

    #[serde(default)]
    pub seed: u64,

    /// Maximum nesting of sub-simulations.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Number of attempts of bounded coalescence before giving up.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_depth() -> usize {
    64
}

fn default_max_retries() -> usize {
    10_000
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            coalescent: RateDistribution::default(),
            duplication: RateDistribution::default(),
            transfer: RateDistribution::default(),
            loss: RateDistribution::default(),
            hemiplasy: true,
            recombination: true,
            seed: 0,
            max_depth: default_max_depth(),
            max_retries: default_max_retries(),
        }
    }
}

#[derive(Debug)]
pub enum ParametersError {
    IoError(std::io::Error),
    YamlError(serde_yaml::Error),
}

impl std::error::Error for ParametersError {}

impl std::fmt::Display for ParametersError {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParametersError::IoError(error) => write!(formatter, "IO error: {}", error),
            ParametersError::YamlError(error) => write!(formatter, "YAML error: {}", error),
        }
    }
}

impl std::fmt::Display for Parameters {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| std::fmt::Error)?;
        write!(formatter, "{}", String::from_utf8_lossy(&output))
    }
}

impl Parameters {
    /// Check every value before any simulation work is done.
    pub fn validate(&self) -> Result<()> {
        self.coalescent.validate("coalescent")?;
        self.duplication.validate("duplication")?;
        self.transfer.validate("transfer")?;
        self.loss.validate("loss")?;
        if self.max_retries == 0 {
            return Err(HidtlError::ConfigurationError(
                "max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn write(&self, writer: &mut dyn std::io::Write) -> std::result::Result<(), ParametersError> {
        serde_yaml::to_writer(writer, self).map_err(ParametersError::YamlError)
    }

    pub fn read(
        reader: &mut dyn std::io::Read,
    ) -> std::result::Result<Parameters, ParametersError> {
        serde_yaml::from_reader(reader).map_err(ParametersError::YamlError)
    }

    pub fn write_to_file(&self, filename: &str) -> std::result::Result<(), ParametersError> {
        let file = fs::File::create(filename).map_err(ParametersError::IoError)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write(&mut writer)
    }

    pub fn read_from_file(filename: &str) -> std::result::Result<Parameters, ParametersError> {
        let file = fs::File::open(filename).map_err(ParametersError::IoError)?;
        let mut reader = std::io::BufReader::new(file);
        Self::read(&mut reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write() {
        let mut buffer = Vec::new();
        let parameters = Parameters {
            coalescent: RateDistribution::Gamma {
                shape: 1.,
                scale: 1e-4,
            },
            duplication: RateDistribution::Constant { value: 0. },
            transfer: RateDistribution::Constant { value: 0.5 },
            loss: RateDistribution::Gamma {
                shape: 2.,
                scale: 0.25,
            },
            hemiplasy: false,
            recombination: true,
            seed: 42,
            max_depth: 8,
            max_retries: 100,
        };
        parameters.write(&mut buffer).unwrap();
        let read_parameters = Parameters::read(&mut buffer.as_slice()).unwrap();
        assert_eq!(read_parameters, parameters);
    }

    #[test]
    fn read_partial() {
        let yaml = "seed: 7\nloss:\n  type: constant\n  value: 2.0\n";
        let parameters = Parameters::read(&mut yaml.as_bytes()).unwrap();
        assert_eq!(parameters.seed, 7);
        assert_eq!(parameters.loss, RateDistribution::Constant { value: 2. });
        assert_eq!(parameters.duplication, RateDistribution::default());
        assert!(parameters.hemiplasy);
        assert_eq!(parameters.max_depth, 64);
        assert_eq!(parameters.max_retries, 10_000);
    }

    #[test]
    fn read_write_file() {
        let tmp_dir = std::env::temp_dir().join("hidtl_test_parameters.yaml");
        let path = tmp_dir.to_str().unwrap();
        let parameters = Parameters {
            seed: 3,
            ..Default::default()
        };
        parameters.write_to_file(path).unwrap();
        let read_parameters = Parameters::read_from_file(path).unwrap();
        assert_eq!(read_parameters, parameters);
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn validate() {
        assert!(Parameters::default().validate().is_ok());

        let parameters = Parameters {
            transfer: RateDistribution::Constant { value: -1. },
            ..Default::default()
        };
        assert!(matches!(
            parameters.validate(),
            Err(HidtlError::ConfigurationError(_))
        ));

        let parameters = Parameters {
            max_retries: 0,
            ..Default::default()
        };
        assert!(parameters.validate().is_err());
    }
}
