use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use rollbook_auth::RoleFlags;
use rollbook_core::{PaginationMeta, PaginationParams};
use rollbook_models::{
    AssignableRole, CreateSchoolDto, CreateUserDto, IssuePinsRequest, LoginRequest, LoginResponse,
    PaginatedPinsResponse, PaginatedSchoolsResponse, PinResponse, PinStatusResponse, PinType,
    RedeemPinRequest, RegisterRequest, School, UpdateProfileDto, User,
};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::obtain_token,
        crate::modules::auth::controller::register_with_pin,
        crate::modules::users::controller::get_profile,
        crate::modules::users::controller::update_profile,
        crate::modules::users::controller::create_user,
        crate::modules::schools::controller::create_school,
        crate::modules::schools::controller::get_all_schools,
        crate::modules::schools::controller::get_school,
        crate::modules::pins::controller::issue_pins,
        crate::modules::pins::controller::list_pins,
        crate::modules::pins::controller::get_pin,
        crate::modules::pins::controller::redeem_pin,
    ),
    components(
        schemas(
            ErrorResponse,
            LoginRequest,
            LoginResponse,
            RegisterRequest,
            User,
            RoleFlags,
            AssignableRole,
            CreateUserDto,
            UpdateProfileDto,
            School,
            CreateSchoolDto,
            PaginatedSchoolsResponse,
            PinType,
            IssuePinsRequest,
            PinResponse,
            PinStatusResponse,
            PaginatedPinsResponse,
            RedeemPinRequest,
            PaginationMeta,
            PaginationParams,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Tokens and PIN-based registration"),
        (name = "Users", description = "Account management"),
        (name = "Schools", description = "School management"),
        (name = "Pins", description = "Registration PIN issuance and redemption")
    ),
    info(
        title = "Rollbook API",
        version = "0.1.0",
        description = "School management backend with PIN-based teacher and student registration.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
