//! Administrative operations that have no HTTP endpoint: creating
//! superusers and school administrators, and issuing PINs offline.

use anyhow::Context;
use rollbook_config::PinConfig;
use rollbook_core::hash_password;
use rollbook_models::{IssuedPin, School, SchoolId, User};
use rollbook_pins::{PgPinStore, PinIssuer, RandomCodeGenerator};
use sqlx::PgPool;
use tracing::info;

/// Account details collected from flags or prompts.
#[derive(Debug, Clone)]
pub struct AccountInput {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Superusers are also staff and belong to no school.
pub async fn create_superuser(pool: &PgPool, input: &AccountInput) -> anyhow::Result<User> {
    let password_hash = hash_password(&input.password).map_err(|e| e.error)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, first_name, last_name, password, is_staff, is_superuser) \
         VALUES ($1, $2, $3, $4, TRUE, TRUE) RETURNING {}",
        User::COLUMNS
    ))
    .bind(&input.email)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&password_hash)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to create superuser {}", input.email))?;

    info!(user.id = %user.id, "Superuser created");
    Ok(user)
}

/// Creates a school administrator. The school must exist.
pub async fn create_admin(
    pool: &PgPool,
    input: &AccountInput,
    school_id: SchoolId,
) -> anyhow::Result<User> {
    find_school(pool, school_id).await?;
    let password_hash = hash_password(&input.password).map_err(|e| e.error)?;

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (email, first_name, last_name, password, is_admin, school_id) \
         VALUES ($1, $2, $3, $4, TRUE, $5) RETURNING {}",
        User::COLUMNS
    ))
    .bind(&input.email)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&password_hash)
    .bind(school_id)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to create admin {}", input.email))?;

    info!(user.id = %user.id, school.id = %school_id, "Admin created");
    Ok(user)
}

pub async fn create_school(
    pool: &PgPool,
    name: &str,
    address: Option<&str>,
) -> anyhow::Result<School> {
    let school = sqlx::query_as::<_, School>(
        "INSERT INTO schools (name, address) VALUES ($1, $2) \
         RETURNING id, name, address, created_at, updated_at",
    )
    .bind(name)
    .bind(address)
    .fetch_one(pool)
    .await
    .with_context(|| format!("Failed to create school {}", name))?;

    info!(school.id = %school.id, "School created");
    Ok(school)
}

/// Issues PINs with the same policy as the API (`PIN_*` environment).
pub async fn issue_pins(
    pool: &PgPool,
    category: &str,
    count: i64,
    school_id: Option<SchoolId>,
) -> anyhow::Result<Vec<IssuedPin>> {
    if let Some(school_id) = school_id {
        find_school(pool, school_id).await?;
    }

    let issuer = PinIssuer::new(
        PgPinStore::new(pool.clone()),
        RandomCodeGenerator,
        PinConfig::from_env(),
    );
    let pins = issuer.issue(category, count, school_id, None).await?;
    Ok(pins)
}

async fn find_school(pool: &PgPool, school_id: SchoolId) -> anyhow::Result<School> {
    sqlx::query_as::<_, School>(
        "SELECT id, name, address, created_at, updated_at FROM schools WHERE id = $1",
    )
    .bind(school_id)
    .fetch_optional(pool)
    .await?
    .with_context(|| format!("School {} not found", school_id))
}
