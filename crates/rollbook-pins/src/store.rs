//! Storage port for issued PINs.

use std::future::Future;

use rollbook_models::{IssuedPin, NewPin};
use sqlx::PgPool;
use tracing::{error, instrument};

use crate::error::StoreError;

/// What the issuer needs from storage.
///
/// `exists` must see every code ever inserted, consumed and expired ones
/// included. `insert` must reject a duplicate code with
/// [`StoreError::Conflict`].
pub trait PinStore: Send + Sync {
    fn exists(&self, code: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    fn insert(&self, pin: &NewPin) -> impl Future<Output = Result<IssuedPin, StoreError>> + Send;
}

/// PostgreSQL-backed store over the `pins` table.
#[derive(Debug, Clone)]
pub struct PgPinStore {
    pool: PgPool,
}

impl PgPinStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl PinStore for PgPinStore {
    #[instrument(skip(self), fields(db.operation = "SELECT", db.table = "pins"))]
    async fn exists(&self, code: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM pins WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error checking PIN code");
                StoreError::from(e)
            })
    }

    #[instrument(skip(self, pin), fields(db.operation = "INSERT", db.table = "pins"))]
    async fn insert(&self, pin: &NewPin) -> Result<IssuedPin, StoreError> {
        let sql = format!(
            "INSERT INTO pins (code, category, school_id, issued_at, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            IssuedPin::COLUMNS
        );

        sqlx::query_as::<_, IssuedPin>(&sql)
            .bind(&pin.code)
            .bind(pin.category)
            .bind(pin.school_id)
            .bind(pin.issued_at)
            .bind(pin.expires_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::Conflict => StoreError::Conflict,
                StoreError::Backend(e) => {
                    error!(error = %e, "Database error inserting PIN");
                    StoreError::Backend(e)
                }
            })
    }
}
