use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use rollbook_auth::{Claims, RoleFlags, verify_token};
use rollbook_core::AppError;
use rollbook_models::{SchoolId, UserId};

use crate::state::AppState;

/// Extractor that validates the bearer JWT and exposes its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.0
            .sub
            .parse::<UserId>()
            .map_err(|_| AppError::unauthorized("Invalid user ID in token"))
    }

    /// The caller's school (None for accounts outside any school).
    pub fn school_id(&self) -> Option<SchoolId> {
        self.0.school_id.map(SchoolId::from)
    }

    pub fn roles(&self) -> &RoleFlags {
        &self.0.roles
    }

    pub fn email(&self) -> &str {
        &self.0.email
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("Invalid authorization header format"))?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn claims(sub: String, school_id: Option<Uuid>) -> Claims {
        Claims {
            sub,
            email: "user@school.test".to_string(),
            school_id,
            roles: RoleFlags::teacher(),
            exp: 9999999999,
            iat: 1234567890,
        }
    }

    #[test]
    fn test_user_id_parses_sub() {
        let id = Uuid::new_v4();
        let user = AuthUser(claims(id.to_string(), None));
        assert_eq!(user.user_id().unwrap(), UserId::from(id));
    }

    #[test]
    fn test_bad_sub_is_unauthorized() {
        let user = AuthUser(claims("not-a-uuid".to_string(), None));
        let err = user.user_id().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_school_id() {
        let school = Uuid::new_v4();
        let user = AuthUser(claims(Uuid::new_v4().to_string(), Some(school)));
        assert_eq!(user.school_id(), Some(SchoolId::from(school)));
        assert!(user.roles().is_teacher);
    }
}
