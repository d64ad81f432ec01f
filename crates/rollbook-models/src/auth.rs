//! Authentication DTOs: login and PIN-based registration.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::users::User;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: User,
}

/// Self-service registration. The PIN decides the role granted and the
/// school joined.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 8, max = 32))]
    #[schema(example = "K3XQ9ZP0AB")]
    pub pin: String,
    #[validate(email, length(max = 64))]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(min = 1, max = 32))]
    pub first_name: String,
    #[validate(length(min = 1, max = 32))]
    pub last_name: String,
}
