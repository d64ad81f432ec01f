use rollbook_core::{AppError, hash_password};
use rollbook_models::{AssignableRole, CreateUserDto, SchoolId, UpdateProfileDto, User, UserId};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

fn map_email_conflict(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &e
        && db_err.is_unique_violation()
    {
        warn!("Email already in use");
        return AppError::conflict(anyhow::anyhow!("Email already in use"));
    }
    error!(error = %e, "Database error writing user");
    AppError::from(e)
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "users"))]
    pub async fn get_user(db: &PgPool, user_id: UserId) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            User::COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching user");
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))
    }

    /// Creates an account inside `school_id` with the requested roles.
    #[instrument(skip(db, dto), fields(user.email = %dto.email, db.operation = "INSERT", db.table = "users"))]
    pub async fn create_user(
        db: &PgPool,
        school_id: Option<SchoolId>,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        let roles = AssignableRole::apply(&dto.roles);
        let password_hash = hash_password(&dto.password)?;
        debug!(roles = ?dto.roles, "Creating user");

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, first_name, last_name, password, is_admin, is_teacher, \
             is_student, is_guardian, school_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            User::COLUMNS
        ))
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&password_hash)
        .bind(roles.is_admin)
        .bind(roles.is_teacher)
        .bind(roles.is_student)
        .bind(roles.is_guardian)
        .bind(school_id)
        .fetch_one(db)
        .await
        .map_err(map_email_conflict)?;

        for role in &dto.roles {
            rollbook_observability::track_user_created(match role {
                AssignableRole::Admin => "admin",
                AssignableRole::Teacher => "teacher",
                AssignableRole::Student => "student",
                AssignableRole::Guardian => "guardian",
            });
        }
        info!(user.id = %user.id, "User created");

        Ok(user)
    }

    /// Applies the fields present in `dto`; absent fields keep their value.
    #[instrument(skip(db, dto), fields(db.operation = "UPDATE", db.table = "users"))]
    pub async fn update_profile(
        db: &PgPool,
        user_id: UserId,
        dto: UpdateProfileDto,
    ) -> Result<User, AppError> {
        let password_hash = dto.password.as_deref().map(hash_password).transpose()?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = COALESCE($2, email), first_name = COALESCE($3, first_name), \
             last_name = COALESCE($4, last_name), password = COALESCE($5, password), \
             updated_at = NOW() WHERE id = $1 RETURNING {}",
            User::COLUMNS
        ))
        .bind(user_id)
        .bind(&dto.email)
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&password_hash)
        .fetch_optional(db)
        .await
        .map_err(map_email_conflict)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("User not found")))?;

        info!(user.id = %user.id, "Profile updated");
        Ok(user)
    }
}
