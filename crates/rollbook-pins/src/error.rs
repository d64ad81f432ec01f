use rollbook_core::StatusCode;
use rollbook_models::UnknownPinType;
use thiserror::Error;

/// Failure of a single storage call.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The code is already taken by a row the `exists` check did not see.
    #[error("PIN code already exists")]
    Conflict,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict,
            _ => StoreError::Backend(err.into()),
        }
    }
}

#[derive(Debug, Error)]
pub enum PinError {
    #[error(transparent)]
    InvalidCategory(#[from] UnknownPinType),

    #[error("PIN count must be between 1 and {max}, got {requested}")]
    InvalidCount { requested: i64, max: i64 },

    #[error("Expiry must be later than the issuance time")]
    InvalidExpiry,

    /// The configured validity window cannot be added to the issuance time.
    #[error("PIN validity of {days} days is out of range")]
    ValidityOutOfRange { days: i64 },

    /// Storage failed mid-batch. The first `issued` PINs were committed and
    /// remain valid.
    #[error("Failed to persist PINs: {issued} of {requested} issued")]
    PersistenceFailure {
        issued: usize,
        requested: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("No unused code found after {attempts} attempts ({issued} PINs issued)")]
    ExhaustedRetries { attempts: u32, issued: usize },
}

impl PinError {
    pub fn status(&self) -> StatusCode {
        match self {
            PinError::InvalidCategory(_) | PinError::InvalidCount { .. } | PinError::InvalidExpiry => {
                StatusCode::BAD_REQUEST
            }
            PinError::ValidityOutOfRange { .. }
            | PinError::PersistenceFailure { .. }
            | PinError::ExhaustedRetries { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Number of PINs durably issued before the call failed.
    pub fn issued(&self) -> usize {
        match self {
            PinError::PersistenceFailure { issued, .. }
            | PinError::ExhaustedRetries { issued, .. } => *issued,
            _ => 0,
        }
    }
}
