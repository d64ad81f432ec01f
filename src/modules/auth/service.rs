use chrono::Utc;
use rollbook_auth::{RoleFlags, create_access_token};
use rollbook_config::JwtConfig;
use rollbook_core::{AppError, hash_password, verify_password};
use rollbook_models::{LoginRequest, LoginResponse, RegisterRequest, User};
use sqlx::{FromRow, PgPool};
use tracing::{debug, error, info, instrument, warn};

use crate::modules::pins::service::{PinService, redeem_error};

#[derive(FromRow)]
struct UserCredentials {
    #[sqlx(flatten)]
    user: User,
    password: String,
}

pub struct AuthService;

impl AuthService {
    #[instrument(skip(db, jwt_config, dto), fields(user.email = %dto.email, db.operation = "SELECT", db.table = "users"))]
    pub async fn login(
        db: &PgPool,
        jwt_config: &JwtConfig,
        dto: LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        let credentials = sqlx::query_as::<_, UserCredentials>(&format!(
            "SELECT {}, password FROM users WHERE email = $1",
            User::COLUMNS
        ))
        .bind(&dto.email)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error during login");
            AppError::from(e)
        })?;

        let Some(UserCredentials { user, password }) = credentials else {
            warn!("Login attempt for unknown email");
            rollbook_observability::track_user_login_failure("unknown_email");
            return Err(AppError::unauthorized("Invalid email or password"));
        };

        if !verify_password(&dto.password, &password)? {
            warn!(user.id = %user.id, "Login attempt with wrong password");
            rollbook_observability::track_user_login_failure("wrong_password");
            return Err(AppError::unauthorized("Invalid email or password"));
        }

        if !user.is_active {
            warn!(user.id = %user.id, "Login attempt for inactive account");
            rollbook_observability::track_user_login_failure("inactive");
            return Err(AppError::unauthorized("Account is inactive"));
        }

        let access_token = create_access_token(
            user.id.into_inner(),
            &user.email,
            user.school_id.map(|id| id.into_inner()),
            user.roles(),
            jwt_config,
        )?;

        rollbook_observability::track_user_login_success();
        info!(user.id = %user.id, "User logged in");

        Ok(LoginResponse {
            access_token,
            token_type: "Bearer".to_string(),
            user,
        })
    }

    /// Creates an account and consumes the PIN in one transaction. The PIN
    /// decides the role flag and the school of the new account.
    #[instrument(skip(db, dto), fields(user.email = %dto.email, db.operation = "INSERT", db.table = "users"))]
    pub async fn register_with_pin(db: &PgPool, dto: RegisterRequest) -> Result<User, AppError> {
        let now = Utc::now();
        let password_hash = hash_password(&dto.password)?;

        let mut tx = db.begin().await?;

        let pin = PinService::lock_pin(&mut tx, &dto.pin).await?;
        pin.check_redeemable(now, None).map_err(|e| {
            warn!(pin.id = %pin.id, reason = %e, "Registration with unusable PIN");
            redeem_error(e)
        })?;

        let mut roles = RoleFlags::default();
        pin.category.grant(&mut roles);
        debug!(pin.category = %pin.category, "Registering user with PIN");

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, first_name, last_name, password, is_teacher, is_student, school_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            User::COLUMNS
        ))
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&password_hash)
        .bind(roles.is_teacher)
        .bind(roles.is_student)
        .bind(pin.school_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                warn!("Registration with an email that is already taken");
                return AppError::conflict(anyhow::anyhow!("Email already registered"));
            }
            error!(error = %e, "Database error registering user");
            AppError::from(e)
        })?;

        PinService::consume_pin(&mut tx, &pin.code, user.id, now).await?;
        tx.commit().await?;

        rollbook_observability::track_pin_redeemed(pin.category.as_str());
        rollbook_observability::track_user_created(pin.category.as_str());
        info!(user.id = %user.id, pin.id = %pin.id, "User registered with PIN");

        Ok(user)
    }
}
