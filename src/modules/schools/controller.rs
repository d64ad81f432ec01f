use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use rollbook_core::AppError;
use rollbook_models::{CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, SchoolId};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::role::{RequireAdmin, RequireSuperuser};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

use super::service::SchoolService;

#[utoipa::path(
    post,
    path = "/api/schools",
    request_body = CreateSchoolDto,
    responses(
        (status = 201, description = "School created", body = School),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Superuser only", body = ErrorResponse),
        (status = 409, description = "School name already exists", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, dto))]
pub async fn create_school(
    State(state): State<AppState>,
    _superuser: RequireSuperuser,
    ValidatedJson(dto): ValidatedJson<CreateSchoolDto>,
) -> Result<(StatusCode, Json<School>), AppError> {
    let school = SchoolService::create_school(&state.db, dto).await?;
    Ok((StatusCode::CREATED, Json(school)))
}

#[utoipa::path(
    get,
    path = "/api/schools",
    params(
        ("name" = Option<String>, Query, description = "Filter by school name (partial match)"),
        ("limit" = Option<i64>, Query, description = "Limit number of results"),
        ("offset" = Option<i64>, Query, description = "Offset for pagination"),
        ("page" = Option<i64>, Query, description = "Page number, overrides offset")
    ),
    responses(
        (status = 200, description = "Paginated list of schools", body = PaginatedSchoolsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Superuser only", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, filters))]
pub async fn get_all_schools(
    State(state): State<AppState>,
    _superuser: RequireSuperuser,
    filters: Result<Query<SchoolFilterParams>, QueryRejection>,
) -> Result<Json<PaginatedSchoolsResponse>, AppError> {
    let Query(filters) = filters
        .map_err(|e| AppError::bad_request(anyhow::anyhow!("Invalid query parameters: {}", e)))?;

    let schools = SchoolService::get_all_schools(&state.db, filters).await?;
    Ok(Json(schools))
}

/// Administrators may only read their own school; superusers any.
#[utoipa::path(
    get,
    path = "/api/schools/{id}",
    params(("id" = Uuid, Path, description = "School ID")),
    responses(
        (status = 200, description = "School found", body = School),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "School outside the caller's scope", body = ErrorResponse),
        (status = 404, description = "School not found", body = ErrorResponse)
    ),
    tag = "Schools",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state, auth_user))]
pub async fn get_school(
    State(state): State<AppState>,
    RequireAdmin(auth_user): RequireAdmin,
    Path(id): Path<Uuid>,
) -> Result<Json<School>, AppError> {
    let school_id = SchoolId::from(id);
    if !auth_user.roles().is_superuser && auth_user.school_id() != Some(school_id) {
        return Err(AppError::forbidden(
            "Access denied. School is outside your scope.",
        ));
    }

    let school = SchoolService::get_school_by_id(&state.db, school_id).await?;
    Ok(Json(school))
}
