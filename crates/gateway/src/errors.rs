use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tonic::{Code, Status};
use tracing::{debug, warn};

use crate::observability::RPC_ERRORS_TOTAL;

/// An RPC failure on its way out as an HTTP response.
///
/// Renders the mapped status with the body
/// `{"code": <grpc code>, "message": "...", "details": [...]}`. `details`
/// holds the field violations the service attached, or is empty.
#[derive(Debug)]
pub struct GatewayError(pub Status);

/// HTTP status for a gRPC status code, following the usual gateway convention.
pub fn http_status(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists | Code::Aborted => StatusCode::CONFLICT,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        // client closed request
        Code::Cancelled => StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST),
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::Unknown | Code::Internal | Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self { Self(status) }
}

impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Status::invalid_argument(rejection.body_text()))
    }
}

impl From<QueryRejection> for GatewayError {
    fn from(rejection: QueryRejection) -> Self {
        Self(Status::invalid_argument(rejection.body_text()))
    }
}

impl From<PathRejection> for GatewayError {
    fn from(rejection: PathRejection) -> Self {
        Self(Status::invalid_argument(rejection.body_text()))
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let code = self.0.code();
        let status = http_status(code);
        if status.is_server_error() {
            warn!(grpc_code = ?code, http_status = status.as_u16(), "rpc failed");
        } else {
            debug!(grpc_code = ?code, http_status = status.as_u16(), "rpc rejected");
        }
        RPC_ERRORS_TOTAL.with_label_values(&[code.description()]).inc();
        let details = match serde_json::from_slice(self.0.details()) {
            Ok(serde_json::Value::Array(items)) => items,
            _ => Vec::new(),
        };
        let body = serde_json::json!({
            "code": code as i32,
            "message": self.0.message(),
            "details": details,
        });
        (status, Json(body)).into_response()
    }
}
