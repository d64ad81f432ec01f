//! # Rollbook Pins
//!
//! Issues registration PINs that are unique across every PIN ever issued.
//!
//! - [`generator`]: Candidate code generation
//! - [`store`]: The storage port and its PostgreSQL implementation
//! - [`issuer`]: Batch issuance with bounded collision retry
//! - [`error`]: Issuance and storage errors
//!
//! # Example
//!
//! ```ignore
//! use rollbook_config::PinConfig;
//! use rollbook_pins::{PgPinStore, PinIssuer, RandomCodeGenerator};
//!
//! let issuer = PinIssuer::new(PgPinStore::new(pool), RandomCodeGenerator, PinConfig::from_env());
//! let pins = issuer.issue("teacher", 3, Some(school_id), None).await?;
//! ```

pub mod error;
pub mod generator;
pub mod issuer;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod store;

pub use error::{PinError, StoreError};
pub use generator::{ALPHABET, CodeGenerator, RandomCodeGenerator};
pub use issuer::PinIssuer;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryPinStore;
pub use store::{PgPinStore, PinStore};
