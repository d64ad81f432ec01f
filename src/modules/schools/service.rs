use rollbook_core::{AppError, PaginationMeta};
use rollbook_models::{CreateSchoolDto, PaginatedSchoolsResponse, School, SchoolFilterParams, SchoolId};
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};

const SCHOOL_COLUMNS: &str = "id, name, address, created_at, updated_at";

pub struct SchoolService;

impl SchoolService {
    #[instrument(skip(db, dto), fields(school.name = %dto.name, db.operation = "INSERT", db.table = "schools"))]
    pub async fn create_school(db: &PgPool, dto: CreateSchoolDto) -> Result<School, AppError> {
        debug!(school.address = ?dto.address, "Creating new school");

        let school = sqlx::query_as::<_, School>(&format!(
            "INSERT INTO schools (name, address) VALUES ($1, $2) RETURNING {}",
            SCHOOL_COLUMNS
        ))
        .bind(&dto.name)
        .bind(&dto.address)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                warn!(school.name = %dto.name, "Attempted to create school with existing name");
                return AppError::conflict(anyhow::anyhow!("School name already exists"));
            }
            error!(error = %e, "Database error creating school");
            AppError::from(e)
        })?;

        rollbook_observability::track_school_created();
        info!(school.id = %school.id, "School created");

        Ok(school)
    }

    #[instrument(skip(db, filters), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_all_schools(
        db: &PgPool,
        filters: SchoolFilterParams,
    ) -> Result<PaginatedSchoolsResponse, AppError> {
        let limit = filters.pagination.limit();
        let offset = filters.pagination.offset();
        let name_pattern = filters
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map(|n| format!("%{}%", n));

        debug!(limit, offset, filter.name = ?filters.name, "Fetching schools");

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM schools WHERE ($1::text IS NULL OR name ILIKE $1)",
        )
        .bind(&name_pattern)
        .fetch_one(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error counting schools");
            AppError::from(e)
        })?;

        let schools = sqlx::query_as::<_, School>(&format!(
            "SELECT {} FROM schools WHERE ($1::text IS NULL OR name ILIKE $1) \
             ORDER BY created_at DESC LIMIT {} OFFSET {}",
            SCHOOL_COLUMNS, limit, offset
        ))
        .bind(&name_pattern)
        .fetch_all(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching schools");
            AppError::from(e)
        })?;

        Ok(PaginatedSchoolsResponse {
            data: schools,
            meta: PaginationMeta::new(total, &filters.pagination),
        })
    }

    #[instrument(skip(db), fields(db.operation = "SELECT", db.table = "schools"))]
    pub async fn get_school_by_id(db: &PgPool, school_id: SchoolId) -> Result<School, AppError> {
        sqlx::query_as::<_, School>(&format!(
            "SELECT {} FROM schools WHERE id = $1",
            SCHOOL_COLUMNS
        ))
        .bind(school_id)
        .fetch_optional(db)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error fetching school");
            AppError::from(e)
        })?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("School not found")))
    }
}
