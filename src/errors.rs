//! All errors that can occur in the hidtl library.

use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum HidtlError {
    ConfigurationError(String),
    InputError(String),
    NonConvergence { attempts: usize },
    DepthExceeded { depth: usize },
    ImplementationError(String),
}

pub type Result<T> = std::result::Result<T, HidtlError>;

impl fmt::Display for HidtlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HidtlError::ConfigurationError(message) => {
                write!(f, "ConfigurationError: {}", message)
            }
            HidtlError::InputError(message) => {
                write!(f, "InputError: {}", message)
            }
            HidtlError::NonConvergence { attempts } => {
                write!(
                    f,
                    "NonConvergence: bounded coalescence left more than one lineage after {} attempts",
                    attempts
                )
            }
            HidtlError::DepthExceeded { depth } => {
                write!(f, "DepthExceeded: grafting recursion reached depth {}", depth)
            }
            HidtlError::ImplementationError(message) => {
                write!(f, "ImplementationError: {}", message)
            }
        }
    }
}

impl std::error::Error for HidtlError {}
