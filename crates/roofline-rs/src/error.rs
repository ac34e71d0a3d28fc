use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Which tensor of a conv2d query a geometry error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorRole {
    Input,
    Weight,
    Output,
}

impl TensorRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TensorRole::Input => "input",
            TensorRole::Weight => "weight",
            TensorRole::Output => "output",
        }
    }
}

impl std::fmt::Display for TensorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced while building or rendering a roofline query.
#[derive(Debug, Error)]
pub enum RooflineError {
    #[error("invalid {tensor} geometry: {reason}")]
    InvalidGeometry { tensor: TensorRole, reason: String },
    #[error("invalid geometry: itemsize {itemsize} {reason}")]
    InvalidItemsize { itemsize: usize, reason: String },
    #[error("invalid hardware profile field `{field}`: {reason}")]
    InvalidProfile { field: &'static str, reason: String },
    #[error("failed to render roofline query")]
    Format(#[from] std::fmt::Error),
    #[error("failed to read hardware profile {}: {source}", path.display())]
    ProfileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse hardware profile: {0}")]
    ProfileJson(#[from] serde_json::Error),
    #[error("environment variable {var} is not set")]
    MissingEnv { var: &'static str },
    #[error("invalid cache policy: {0}")]
    InvalidPolicy(String),
}

impl RooflineError {
    pub(crate) fn geometry(tensor: TensorRole, reason: impl Into<String>) -> Self {
        RooflineError::InvalidGeometry {
            tensor,
            reason: reason.into(),
        }
    }

    pub(crate) fn profile(field: &'static str, reason: impl Into<String>) -> Self {
        RooflineError::InvalidProfile {
            field,
            reason: reason.into(),
        }
    }
}

pub type RooflineResult<T> = Result<T, RooflineError>;
