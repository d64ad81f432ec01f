//! Authentication and authorization extractors.
//!
//! - [`auth`]: [`auth::AuthUser`], the verified bearer token claims
//! - [`role`]: Role flag extractors (`RequireAdmin`, `RequireSuperuser`, ...)
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::role::RequireAdmin;
//!
//! async fn issue_pins(RequireAdmin(auth_user): RequireAdmin) -> impl IntoResponse {
//!     // Only reached when the token carries admin access
//! }
//! ```

pub mod auth;
pub mod role;
