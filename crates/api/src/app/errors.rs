use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use orgdesk_infra::ServiceError;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        ServiceError::InvalidEmail => json_error(StatusCode::BAD_REQUEST, "invalid_email", message),
        ServiceError::WeakPassword(_) => json_error(StatusCode::BAD_REQUEST, "weak_password", message),
        ServiceError::EmailExists => json_error(StatusCode::CONFLICT, "email_exists", message),
        ServiceError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", message)
        }
        ServiceError::NotAuthenticated => json_error(StatusCode::UNAUTHORIZED, "unauthorized", message),
        ServiceError::InvalidName => json_error(StatusCode::BAD_REQUEST, "invalid_name", message),
        ServiceError::NameExists => json_error(StatusCode::CONFLICT, "name_exists", message),
        ServiceError::AccessDenied => json_error(StatusCode::FORBIDDEN, "forbidden", message),
        ServiceError::AdminRequired => json_error(StatusCode::FORBIDDEN, "admin_required", message),
        ServiceError::InvalidRole => json_error(StatusCode::BAD_REQUEST, "invalid_role", message),
        ServiceError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        ServiceError::LastAdmin => json_error(StatusCode::BAD_REQUEST, "last_admin", message),
        ServiceError::AlreadyMember => json_error(StatusCode::CONFLICT, "already_member", message),
        ServiceError::Internal => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn json_rejection(err: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", err.body_text())
}

pub fn path_rejection(err: PathRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_request", err.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
