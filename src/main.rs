use dotenvy::dotenv;
use rollbook::router::init_router;
use rollbook::state::init_app_state;
use rollbook_config::ServerConfig;
use rollbook_db::run_migrations;
use rollbook_observability::{init_metrics, init_tracing};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let state = match init_app_state().await {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            std::process::exit(1);
        }
    };

    if state.jwt_config.uses_dev_secret() {
        warn!("JWT_SECRET is not set; tokens are signed with the development secret");
    }

    if let Err(e) = run_migrations(&state.db).await {
        error!(error = %e, "Failed to run migrations");
        std::process::exit(1);
    }

    if init_metrics() {
        info!("Metrics available at /metrics");
    }

    let server_config = ServerConfig::from_env();
    let address = server_config.bind_address();
    let app = init_router(state);

    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, address = %address, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(address = %address, "Server running");
    info!("Swagger UI available at http://{}/swagger-ui", address);
    info!("Scalar UI available at http://{}/scalar", address);

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
