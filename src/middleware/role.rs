//! Role flag extractors.
//!
//! Each extractor authenticates the request through [`AuthUser`] and then
//! performs one flag check from [`RoleFlags`]. A missing or bad token is a
//! 401; a valid token lacking the flag is a 403.

use rollbook_auth::RoleFlags;
use rollbook_core::AppError;

use crate::middleware::auth::AuthUser;

pub fn check_superuser(roles: &RoleFlags) -> Result<(), AppError> {
    check(roles.is_superuser, "Superuser privileges required")
}

pub fn check_admin(roles: &RoleFlags) -> Result<(), AppError> {
    check(roles.has_admin_access(), "Administrator privileges required")
}

fn check(allowed: bool, message: &str) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden(format!("Access denied. {}.", message)))
    }
}

/// Defines an extractor wrapping [`AuthUser`] that runs a role check.
macro_rules! require_role {
    ($(#[$meta:meta])* $name:ident, $check:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub AuthUser);

        impl axum::extract::FromRequestParts<$crate::state::AppState> for $name {
            type Rejection = AppError;

            async fn from_request_parts(
                parts: &mut axum::http::request::Parts,
                state: &$crate::state::AppState,
            ) -> Result<Self, Self::Rejection> {
                let auth_user =
                    <AuthUser as axum::extract::FromRequestParts<$crate::state::AppState>>::from_request_parts(parts, state)
                        .await?;
                $check(auth_user.roles())?;
                Ok($name(auth_user))
            }
        }
    };
}

require_role!(
    /// Superusers only.
    RequireSuperuser,
    check_superuser
);
require_role!(
    /// Superusers, staff and school administrators.
    RequireAdmin,
    check_admin
);
