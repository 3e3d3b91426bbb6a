use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("structure is empty")]
    EmptyStructure,

    #[error("standardizer rejected the structure: {details}")]
    Rejected { details: String },

    #[error("collaborator '{collaborator}' returned an unusable response: {details}")]
    MalformedResponse {
        collaborator: String,
        details: String,
    },

    #[error(
        "embedding did not converge after {iterations} iterations (rms gradient {rms_gradient:.4})"
    )]
    NotConverged { iterations: usize, rms_gradient: f64 },

    #[error("structure has no conformer; embed geometry before extracting '{feature}'")]
    MissingConformer { feature: String },

    #[error("structure has {atoms} atoms but '{feature}' is limited to {max_atoms}")]
    TooManyAtoms {
        feature: String,
        atoms: usize,
        max_atoms: usize,
    },

    #[error("invalid options for '{unit}': {details}")]
    InvalidOptions { unit: String, details: String },

    #[error("collaborator '{collaborator}' is unavailable: {details}")]
    CollaboratorUnavailable {
        collaborator: String,
        details: String,
    },
}

impl Error {
    pub fn rejected(details: impl Into<String>) -> Self {
        Self::Rejected {
            details: details.into(),
        }
    }

    pub fn malformed_response(collaborator: impl Into<String>, details: impl Into<String>) -> Self {
        Self::MalformedResponse {
            collaborator: collaborator.into(),
            details: details.into(),
        }
    }

    pub fn missing_conformer(feature: impl Into<String>) -> Self {
        Self::MissingConformer {
            feature: feature.into(),
        }
    }

    pub fn too_many_atoms(feature: impl Into<String>, atoms: usize, max_atoms: usize) -> Self {
        Self::TooManyAtoms {
            feature: feature.into(),
            atoms,
            max_atoms,
        }
    }

    pub fn invalid_options(unit: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidOptions {
            unit: unit.into(),
            details: details.into(),
        }
    }

    pub fn unavailable(collaborator: impl Into<String>, details: impl Into<String>) -> Self {
        Self::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            details: details.into(),
        }
    }

    /// Whether the failure concerns the unit or its collaborator rather than the item.
    ///
    /// Fatal errors abort a whole batch; everything else only marks its item absent.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CollaboratorUnavailable { .. } | Self::InvalidOptions { .. }
        )
    }
}
