//! # Rollbook Models
//!
//! Domain models and DTOs for the Rollbook API.
//!
//! # Modules
//!
//! - [`auth`]: Login and PIN-based registration
//! - [`ids`]: Strongly-typed UUID newtypes
//! - [`pins`]: Registration PINs, their lifecycle and request/response shapes
//! - [`schools`]: Schools, the owning organization of users and PINs
//! - [`users`]: User accounts and profile DTOs
//!
//! # Example
//!
//! ```ignore
//! use rollbook_models::pins::{IssuedPin, PinType};
//!
//! let category: PinType = "Teacher".parse()?;
//! if pin.has_expired() {
//!     println!("PIN {} is no longer redeemable", pin.code);
//! }
//! ```

pub mod auth;
pub mod ids;
pub mod pins;
pub mod schools;
pub mod users;

pub use auth::{LoginRequest, LoginResponse, RegisterRequest};
pub use ids::{PinId, SchoolId, UserId};
pub use pins::{
    IssuePinsRequest, IssuedPin, NewPin, PaginatedPinsResponse, PinFilterParams, PinResponse,
    PinStatusResponse, PinType, RedeemError, RedeemPinRequest, UnknownPinType,
};
pub use schools::{CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams};
pub use users::{AssignableRole, CreateUserDto, UpdateProfileDto, User};
