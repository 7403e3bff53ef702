use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use orgdesk_auth::AuthenticatedIdentity;
use orgdesk_core::{MembershipId, OrganizationId};

use crate::app::{dto, errors, AppServices};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_organization).get(list_organizations))
        .route("/:org_id/switch", post(switch_organization))
        .route("/:org_id/billing", put(update_billing_details))
        .route("/:org_id/members", get(list_members).post(add_member))
        .route(
            "/:org_id/members/:membership_id",
            put(update_member_role).delete(remove_member),
        )
}

pub async fn create_organization(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    body: Result<Json<dto::CreateOrganizationRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_rejection(e),
    };

    match services.organizations.create(&identity, &body.name).await {
        Ok(organization) => (
            StatusCode::CREATED,
            Json(dto::OrganizationResponse { organization }),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_organizations(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> axum::response::Response {
    match services.organizations.list(&identity).await {
        Ok(organizations) => {
            (StatusCode::OK, Json(dto::OrganizationsResponse { organizations })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn switch_organization(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    path: Result<Path<OrganizationId>, PathRejection>,
) -> axum::response::Response {
    let Path(org_id) = match path {
        Ok(path) => path,
        Err(e) => return errors::path_rejection(e),
    };

    match services.organizations.switch(&identity, org_id).await {
        Ok(organization) => {
            (StatusCode::OK, Json(dto::OrganizationResponse { organization })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_billing_details(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    path: Result<Path<OrganizationId>, PathRejection>,
    body: Result<Json<dto::BillingDetailsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Path(org_id) = match path {
        Ok(path) => path,
        Err(e) => return errors::path_rejection(e),
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_rejection(e),
    };

    match services
        .organizations
        .update_billing_details(&identity, org_id, body.billing_details)
        .await
    {
        Ok(organization) => {
            (StatusCode::OK, Json(dto::OrganizationResponse { organization })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_members(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    path: Result<Path<OrganizationId>, PathRejection>,
) -> axum::response::Response {
    let Path(org_id) = match path {
        Ok(path) => path,
        Err(e) => return errors::path_rejection(e),
    };

    match services.organizations.list_members(&identity, org_id).await {
        Ok(members) => (StatusCode::OK, Json(dto::MembersResponse { members })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_member(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    path: Result<Path<OrganizationId>, PathRejection>,
    body: Result<Json<dto::AddMemberRequest>, JsonRejection>,
) -> axum::response::Response {
    let Path(org_id) = match path {
        Ok(path) => path,
        Err(e) => return errors::path_rejection(e),
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_rejection(e),
    };

    match services
        .organizations
        .add_member(&identity, org_id, &body.email, &body.role)
        .await
    {
        Ok(membership) => {
            (StatusCode::CREATED, Json(dto::MembershipResponse { membership })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_member_role(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    path: Result<Path<(OrganizationId, MembershipId)>, PathRejection>,
    body: Result<Json<dto::UpdateRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    let Path((org_id, membership_id)) = match path {
        Ok(path) => path,
        Err(e) => return errors::path_rejection(e),
    };
    let Json(body) = match body {
        Ok(body) => body,
        Err(e) => return errors::json_rejection(e),
    };

    match services
        .organizations
        .update_member_role(&identity, org_id, membership_id, &body.role)
        .await
    {
        Ok(membership) => {
            (StatusCode::OK, Json(dto::MembershipResponse { membership })).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_member(
    Extension(services): Extension<AppServices>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    path: Result<Path<(OrganizationId, MembershipId)>, PathRejection>,
) -> axum::response::Response {
    let Path((org_id, membership_id)) = match path {
        Ok(path) => path,
        Err(e) => return errors::path_rejection(e),
    };

    match services
        .organizations
        .remove_member(&identity, org_id, membership_id)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "member removed" })),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
