use models::errors::Violations;
use thiserror::Error;

/// Outcome classes of a user-service operation, independent of transport.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    Validation(#[from] Violations),
    #[error("not found: {0}")]
    NotFound(String),
    /// The store could not be reached or refused the write. Carries the failed operation, never driver text.
    #[error("storage unavailable: failed to {0}")]
    StorageUnavailable(String),
    #[error("internal error: failed to {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn not_found(entity: &str) -> Self { Self::NotFound(format!("{} not found", entity)) }
}

impl From<ServiceError> for tonic::Status {
    fn from(e: ServiceError) -> Self {
        match e {
            // field violations ride along as JSON status details
            ServiceError::Validation(v) => match serde_json::to_vec(v.fields()) {
                Ok(details) => tonic::Status::with_details(
                    tonic::Code::InvalidArgument,
                    format!("invalid request: {v}"),
                    details.into(),
                ),
                Err(_) => tonic::Status::invalid_argument(format!("invalid request: {v}")),
            },
            ServiceError::NotFound(msg) => tonic::Status::not_found(msg),
            ServiceError::StorageUnavailable(op) | ServiceError::Internal(op) => {
                tonic::Status::internal(format!("failed to {op}"))
            }
        }
    }
}
