//! # Rollbook Config
//!
//! Configuration types for the Rollbook API, loaded from environment variables:
//!
//! - [`jwt`]: JWT signing secret and token lifetime
//! - [`cors`]: Allowed CORS origins
//! - [`pins`]: Registration PIN issuance policy
//! - [`server`]: Listener address
//!
//! # Example
//!
//! ```ignore
//! use rollbook_config::{CorsConfig, JwtConfig, PinConfig, ServerConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let pin_config = PinConfig::from_env();
//! ```

pub mod cors;
pub mod jwt;
pub mod pins;
pub mod server;

pub use cors::CorsConfig;
pub use jwt::JwtConfig;
pub use pins::PinConfig;
pub use server::ServerConfig;
