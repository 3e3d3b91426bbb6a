use crate::ops;
use crate::utils::parallel::PoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {details}")]
    InvalidInput { details: String },

    #[error("invalid configuration for '{unit}': {details}")]
    InvalidConfiguration { unit: String, details: String },

    #[error("collaborator '{collaborator}' is unavailable: {details}")]
    CollaboratorUnavailable {
        collaborator: String,
        details: String,
    },

    #[error("unit '{unit}' declared {expected} output but produced {found}")]
    ContractViolation {
        unit: String,
        expected: String,
        found: String,
    },

    #[error("run cancelled after {processed} of {total} items")]
    Cancelled { processed: usize, total: usize },

    #[error(transparent)]
    WorkerPool(#[from] PoolError),
}

impl Error {
    pub fn invalid_input(details: impl Into<String>) -> Self {
        Self::InvalidInput {
            details: details.into(),
        }
    }

    pub fn contract_violation(
        unit: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::ContractViolation {
            unit: unit.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Lifts a fatal unit error to a run-level error.
    ///
    /// Returns `None` for item-level errors, which become absent slots instead.
    pub(crate) fn from_fatal(unit: &str, err: ops::Error) -> Option<Self> {
        if !err.is_fatal() {
            return None;
        }
        match err {
            ops::Error::CollaboratorUnavailable {
                collaborator,
                details,
            } => Some(Self::CollaboratorUnavailable {
                collaborator,
                details,
            }),
            ops::Error::InvalidOptions { details, .. } => Some(Self::InvalidConfiguration {
                unit: unit.to_string(),
                details,
            }),
            _ => None,
        }
    }
}
