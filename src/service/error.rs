use thiserror::Error;

use crate::clusterer::ClusteringError;
use crate::security::AuthError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("No restaurants found")]
    NotFound,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Clustering(#[from] ClusteringError),

    #[error("Store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

impl ServiceError {
    /// HTTP-style status for the failure
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unauthorized(_) => 401,
            ServiceError::NotFound => 404,
            ServiceError::InvalidRequest(_) | ServiceError::Clustering(_) => 400,
            ServiceError::Store(_) => 500,
        }
    }

    /// Message safe to hand back to the caller
    ///
    /// Store failures are reported generically; the detail goes to the log.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::Unauthorized(_) => "Unauthorized".to_string(),
            ServiceError::Store(_) => "Failed to perform clustering analysis".to_string(),
            other => other.to_string(),
        }
    }
}
