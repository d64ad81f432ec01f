//! # Rollbook Auth
//!
//! Authentication types and JWT utilities for the Rollbook API.
//!
//! - [`claims`]: Access token claims and the role flags carried in them
//! - [`jwt`]: Token creation and verification
//!
//! Authorization in Rollbook is a single flag lookup on [`RoleFlags`]; the
//! flags travel inside the access token so checks need no database access.
//!
//! # Example
//!
//! ```ignore
//! use rollbook_auth::{RoleFlags, create_access_token, verify_token};
//! use rollbook_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_access_token(user_id, "admin@school.test", Some(school_id), flags, &config)?;
//! let claims = verify_token(&token, &config)?;
//! assert!(claims.roles.has_admin_access());
//! ```

pub mod claims;
pub mod jwt;

pub use claims::{Claims, RoleFlags};
pub use jwt::{create_access_token, verify_token};
