use rollbook_config::{CorsConfig, JwtConfig, PinConfig};
use rollbook_db::{DbInitError, PgPool, init_db_pool};

#[derive(Clone, Debug)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub cors_config: CorsConfig,
    pub pin_config: PinConfig,
}

impl AppState {
    /// State over an existing pool with configuration read from the environment.
    pub fn from_pool(db: PgPool) -> Self {
        Self {
            db,
            jwt_config: JwtConfig::from_env(),
            cors_config: CorsConfig::from_env(),
            pin_config: PinConfig::from_env(),
        }
    }
}

pub async fn init_app_state() -> Result<AppState, DbInitError> {
    Ok(AppState::from_pool(init_db_pool().await?))
}
