use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use rollbook_core::AppError;
use rollbook_models::{
    IssuePinsRequest, PaginatedPinsResponse, PinFilterParams, PinResponse, PinStatusResponse,
    RedeemPinRequest, User,
};
use tracing::instrument;

use crate::middleware::auth::AuthUser;
use crate::middleware::role::RequireAdmin;
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::PinService;

/// Issue a batch of registration PINs for the caller's school
#[utoipa::path(
    post,
    path = "/api/pins",
    request_body = IssuePinsRequest,
    responses(
        (status = 201, description = "PINs issued, in issuance order", body = Vec<PinResponse>),
        (status = 400, description = "Invalid category, count or expiry", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = ErrorResponse),
        (status = 500, description = "Storage failure; the message reports how many PINs were issued", body = ErrorResponse)
    ),
    tag = "Pins",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn issue_pins(
    State(state): State<AppState>,
    RequireAdmin(auth_user): RequireAdmin,
    ValidatedJson(dto): ValidatedJson<IssuePinsRequest>,
) -> Result<(StatusCode, Json<Vec<PinResponse>>), AppError> {
    let pins = PinService::issue_pins(&state, auth_user.school_id(), dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(pins.into_iter().map(PinResponse::from).collect()),
    ))
}

/// List PINs of the caller's school
#[utoipa::path(
    get,
    path = "/api/pins",
    params(
        ("category" = Option<String>, Query, description = "teacher or student"),
        ("consumed" = Option<bool>, Query, description = "Filter by consumption"),
        ("school_id" = Option<String>, Query, description = "School filter (superusers only)"),
        ("limit" = Option<i64>, Query, description = "Page size (default 10, max 100)"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination"),
        ("page" = Option<i64>, Query, description = "Page number, overrides offset")
    ),
    responses(
        (status = 200, description = "Paginated PINs", body = PaginatedPinsResponse),
        (status = 400, description = "Invalid query parameters", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = ErrorResponse)
    ),
    tag = "Pins",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, filters))]
pub async fn list_pins(
    State(state): State<AppState>,
    RequireAdmin(auth_user): RequireAdmin,
    filters: Result<Query<PinFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedPinsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let pins = PinService::list_pins(&state.db, &auth_user, filters).await?;
    Ok(Json(pins))
}

/// Look up a PIN by its code
#[utoipa::path(
    get,
    path = "/api/pins/{code}",
    params(("code" = String, Path, description = "PIN code")),
    responses(
        (status = 200, description = "PIN with its current status", body = PinStatusResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Administrator privileges required", body = ErrorResponse),
        (status = 404, description = "PIN not found", body = ErrorResponse)
    ),
    tag = "Pins",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_pin(
    State(state): State<AppState>,
    RequireAdmin(auth_user): RequireAdmin,
    Path(code): Path<String>,
) -> Result<Json<PinStatusResponse>, AppError> {
    let status = PinService::get_pin_status(&state.db, &auth_user, &code).await?;
    Ok(Json(status))
}

/// Redeem a PIN for the signed-in account
#[utoipa::path(
    post,
    path = "/api/pins/redeem",
    request_body = RedeemPinRequest,
    responses(
        (status = 200, description = "PIN consumed; the account with its new role", body = User),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "PIN belongs to a different school", body = ErrorResponse),
        (status = 404, description = "PIN not found", body = ErrorResponse),
        (status = 409, description = "PIN already used", body = ErrorResponse),
        (status = 410, description = "PIN expired", body = ErrorResponse)
    ),
    tag = "Pins",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn redeem_pin(
    State(state): State<AppState>,
    auth_user: AuthUser,
    ValidatedJson(dto): ValidatedJson<RedeemPinRequest>,
) -> Result<Json<User>, AppError> {
    let user = PinService::redeem_pin(&state.db, auth_user.user_id()?, &dto.code).await?;
    Ok(Json(user))
}
