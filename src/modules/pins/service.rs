use chrono::{DateTime, Utc};
use rollbook_core::{AppError, PaginationMeta};
use rollbook_models::{
    IssuePinsRequest, IssuedPin, PaginatedPinsResponse, PinFilterParams, PinResponse,
    PinStatusResponse, PinType, RedeemError, SchoolId, User, UserId,
};
use rollbook_pins::{PgPinStore, PinIssuer, RandomCodeGenerator};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, info, instrument, warn};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

pub(crate) fn redeem_error(err: RedeemError) -> AppError {
    AppError::new(err.status(), err)
}

/// Codes are stored uppercase; callers may type them in any case.
pub(crate) fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

pub struct PinService;

impl PinService {
    #[instrument(skip(state, dto), fields(pin.school_id = ?school_id))]
    pub async fn issue_pins(
        state: &AppState,
        school_id: Option<SchoolId>,
        dto: IssuePinsRequest,
    ) -> Result<Vec<IssuedPin>, AppError> {
        let issuer = PinIssuer::new(
            PgPinStore::new(state.db.clone()),
            RandomCodeGenerator,
            state.pin_config.clone(),
        );

        issuer
            .issue(
                dto.category.as_deref().unwrap_or_default(),
                dto.count.unwrap_or(0),
                school_id,
                dto.expires_at,
            )
            .await
            .map_err(|e| AppError::new(e.status(), e))
    }

    /// Lists PINs visible to the caller. Superusers see every school and may
    /// filter by one; everyone else only sees their own school's PINs.
    #[instrument(skip(db, caller, filters), fields(db.operation = "SELECT", db.table = "pins"))]
    pub async fn list_pins(
        db: &PgPool,
        caller: &AuthUser,
        filters: PinFilterParams,
    ) -> Result<PaginatedPinsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();

        let category = filters
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(str::parse::<PinType>)
            .transpose()
            .map_err(AppError::bad_request)?;

        let (school_id, only_unowned) = if caller.roles().is_superuser {
            (filters.school_id, false)
        } else {
            match caller.school_id() {
                Some(school) => (Some(school.into_inner()), false),
                None => (None, true),
            }
        };

        debug!(
            limit,
            offset,
            filter.category = ?category,
            filter.consumed = ?filters.consumed,
            filter.school_id = ?school_id,
            "Fetching PINs"
        );

        const WHERE: &str = "WHERE ($1::text IS NULL OR category = $1) \
             AND ($2::boolean IS NULL OR consumed = $2) \
             AND ($3::uuid IS NULL OR school_id = $3) \
             AND (NOT $4 OR school_id IS NULL)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM pins {}", WHERE))
            .bind(category.map(|c| c.as_str()))
            .bind(filters.consumed)
            .bind(school_id)
            .bind(only_unowned)
            .fetch_one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error counting PINs");
                AppError::from(e)
            })?;

        let data_query = format!(
            "SELECT {} FROM pins {} ORDER BY issued_at DESC, code LIMIT {} OFFSET {}",
            IssuedPin::COLUMNS,
            WHERE,
            limit,
            offset
        );
        let pins = sqlx::query_as::<_, IssuedPin>(&data_query)
            .bind(category.map(|c| c.as_str()))
            .bind(filters.consumed)
            .bind(school_id)
            .bind(only_unowned)
            .fetch_all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Database error fetching PINs");
                AppError::from(e)
            })?;

        debug!(total, returned = pins.len(), "PINs fetched");

        Ok(PaginatedPinsResponse {
            data: pins.into_iter().map(PinResponse::from).collect(),
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    /// A PIN owned by another school is reported as not found.
    #[instrument(skip(db, caller), fields(db.operation = "SELECT", db.table = "pins"))]
    pub async fn get_pin_status(
        db: &PgPool,
        caller: &AuthUser,
        code: &str,
    ) -> Result<PinStatusResponse, AppError> {
        let code = normalize_code(code);

        let pin = sqlx::query_as::<_, IssuedPin>(&format!(
            "SELECT {} FROM pins WHERE code = $1",
            IssuedPin::COLUMNS
        ))
        .bind(&code)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching PIN");
            AppError::from(e)
        })?
        .filter(|pin| caller.roles().is_superuser || pin.school_id == caller.school_id())
        .ok_or_else(|| redeem_error(RedeemError::NotFound))?;

        Ok(PinStatusResponse::at(pin, Utc::now()))
    }

    /// Consumes a PIN for an existing account, granting the PIN's role and,
    /// if the account has no school yet, the PIN's school.
    #[instrument(skip(db, code), fields(user.id = %user_id, db.operation = "UPDATE", db.table = "pins"))]
    pub async fn redeem_pin(db: &PgPool, user_id: UserId, code: &str) -> Result<User, AppError> {
        let now = Utc::now();
        let mut tx = db.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1 FOR UPDATE",
            User::COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        if !user.is_active {
            warn!(user.id = %user_id, "Inactive user attempted PIN redemption");
            return Err(AppError::forbidden("Account is inactive"));
        }

        let pin = Self::lock_pin(&mut tx, code).await?;
        pin.check_redeemable(now, user.school_id).map_err(|e| {
            warn!(pin.id = %pin.id, reason = %e, "PIN redemption rejected");
            redeem_error(e)
        })?;

        let mut roles = user.roles();
        pin.category.grant(&mut roles);
        let school_id = user.school_id.or(pin.school_id);

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_teacher = $2, is_student = $3, school_id = $4, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            User::COLUMNS
        ))
        .bind(user_id)
        .bind(roles.is_teacher)
        .bind(roles.is_student)
        .bind(school_id)
        .fetch_one(&mut *tx)
        .await?;

        let pin = Self::consume_pin(&mut tx, &pin.code, user_id, now).await?;
        tx.commit().await?;

        rollbook_observability::track_pin_redeemed(pin.category.as_str());
        info!(pin.id = %pin.id, pin.category = %pin.category, "PIN redeemed");

        Ok(user)
    }

    /// Loads a PIN and holds its row lock until the transaction ends.
    pub(crate) async fn lock_pin(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<IssuedPin, AppError> {
        sqlx::query_as::<_, IssuedPin>(&format!(
            "SELECT {} FROM pins WHERE code = $1 FOR UPDATE",
            IssuedPin::COLUMNS
        ))
        .bind(normalize_code(code))
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| redeem_error(RedeemError::NotFound))
    }

    /// Flips `consumed`. Only succeeds for a PIN that is still unconsumed.
    pub(crate) async fn consume_pin(
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<IssuedPin, AppError> {
        sqlx::query_as::<_, IssuedPin>(&format!(
            "UPDATE pins SET consumed = TRUE, redeemed_by = $2, redeemed_at = $3 \
             WHERE code = $1 AND consumed = FALSE RETURNING {}",
            IssuedPin::COLUMNS
        ))
        .bind(code)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| redeem_error(RedeemError::AlreadyConsumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" ab12cd34ef "), "AB12CD34EF");
    }

    #[test]
    fn test_redeem_error_keeps_status() {
        let err = redeem_error(RedeemError::Expired);
        assert_eq!(err.status, StatusCode::GONE);
        assert_eq!(err.error.to_string(), "PIN has expired");
    }
}
