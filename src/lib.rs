//! # Rollbook API
//!
//! School-management backend built with Axum and PostgreSQL. Accounts carry
//! role flags (staff, superuser, admin, teacher, student, guardian) and belong
//! to a school. Teachers and students join a school by redeeming a
//! registration PIN issued by that school's administrators.
//!
//! ## Architecture
//!
//! ```text
//! src/
//! ├── middleware/       # AuthUser and role flag extractors
//! ├── modules/          # Feature modules
//! │   ├── auth/        # Token login, PIN registration
//! │   ├── users/       # Profile and account creation
//! │   ├── schools/     # School management
//! │   └── pins/        # PIN issuance, lookup and redemption
//! ├── docs.rs           # OpenAPI document
//! ├── router.rs         # Route tree and layers
//! ├── state.rs          # Shared application state
//! └── validator.rs      # ValidatedJson extractor
//! ```
//!
//! Each feature module has a `controller.rs` (handlers), `service.rs`
//! (queries and business rules) and `router.rs`. Domain types live in
//! `rollbook-models`; PIN generation and uniqueness live in `rollbook-pins`.
//!
//! ## Permissions
//!
//! | Check | Passes when |
//! |-------|-------------|
//! | superuser | `is_superuser` |
//! | admin | `is_superuser`, `is_staff` or `is_admin` |
//!
//! Flags travel inside the access token, so checks never hit the database.
//!
//! ## API documentation
//!
//! - Swagger UI: `http://localhost:3000/swagger-ui`
//! - Scalar: `http://localhost:3000/scalar`

pub mod docs;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;
pub mod validator;

// Re-export workspace crates for convenience
pub use rollbook_auth;
pub use rollbook_config;
pub use rollbook_core;
pub use rollbook_db;
pub use rollbook_models;
pub use rollbook_pins;
