//! # Rollbook Core
//!
//! Core types, errors, and utilities for the Rollbook API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Pagination parameters and response metadata
//! - [`password`]: bcrypt password hashing and verification
//! - [`serde`]: Query-string friendly deserialization helpers
//!
//! # Example
//!
//! ```ignore
//! use rollbook_core::errors::AppError;
//! use rollbook_core::password::{hash_password, verify_password};
//!
//! let error = AppError::not_found(anyhow::anyhow!("User not found"));
//! let hash = hash_password("secure_password")?;
//! ```

pub mod errors;
pub mod pagination;
pub mod password;
pub mod serde;

pub use axum::http::StatusCode;
pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
