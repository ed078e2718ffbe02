use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusteringError {
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },
}
