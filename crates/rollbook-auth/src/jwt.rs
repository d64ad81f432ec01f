//! Access token creation and verification (HS256).

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use rollbook_config::JwtConfig;
use rollbook_core::{AppError, StatusCode};

use crate::claims::{Claims, RoleFlags};

/// Creates an access token embedding the user's school and role flags.
///
/// # Errors
///
/// Returns an internal error if encoding fails.
pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    school_id: Option<Uuid>,
    roles: RoleFlags,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        school_id,
        roles,
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| {
        AppError::with_message(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to create token: {}", e),
        )
    })
}

/// Verifies signature and expiry and returns the claims.
///
/// # Errors
///
/// Returns an unauthorized error for a bad signature, an expired token or a
/// malformed token.
pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test_secret_key_for_testing_purposes".to_string(),
            access_token_expiry: 3600,
        }
    }

    #[test]
    fn test_create_and_verify() {
        let user_id = Uuid::new_v4();
        let school_id = Uuid::new_v4();
        let token = create_access_token(
            user_id,
            "admin@school.test",
            Some(school_id),
            RoleFlags::admin(),
            &config(),
        )
        .unwrap();

        let claims = verify_token(&token, &config()).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.school_id, Some(school_id));
        assert!(claims.roles.is_admin);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = create_access_token(
            Uuid::new_v4(),
            "a@b.test",
            None,
            RoleFlags::student(),
            &config(),
        )
        .unwrap();

        let other = JwtConfig {
            secret: "another_secret".to_string(),
            access_token_expiry: 3600,
        };
        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = JwtConfig {
            secret: config().secret,
            access_token_expiry: -7200,
        };
        let token = create_access_token(
            Uuid::new_v4(),
            "a@b.test",
            None,
            RoleFlags::teacher(),
            &expired,
        )
        .unwrap();

        assert!(verify_token(&token, &config()).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(verify_token("invalid.token.here", &config()).is_err());
    }
}
