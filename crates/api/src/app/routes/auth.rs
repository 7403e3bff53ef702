use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use orgdesk_auth::AuthenticatedIdentity;

use crate::app::{dto, errors, AppServices};

pub async fn register(
    Extension(services): Extension<AppServices>,
    body: Result<Json<dto::CredentialsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_rejection(e),
    };

    match services.identity.register(&body.email, &body.password).await {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<AppServices>,
    body: Result<Json<dto::CredentialsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_rejection(e),
    };

    match services.identity.login(&body.email, &body.password).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn me(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> axum::response::Response {
    let user = match services.identity.current_user(&identity).await {
        Ok(user) => user,
        Err(e) => return errors::service_error_to_response(e),
    };
    let organizations = match services.organizations.list(&identity).await {
        Ok(organizations) => organizations,
        Err(e) => return errors::service_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(dto::CurrentUserResponse { user, organizations }),
    )
        .into_response()
}
