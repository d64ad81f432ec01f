//! Rollbook Observability
//!
//! - Structured logging to console and daily-rolling JSON files
//! - HTTP request logging middleware
//! - Prometheus metrics, HTTP and domain counters
//!
//! Compiled in with the `observability` feature (default). At runtime the
//! `OBSERVABILITY_ENABLED` environment variable can switch metrics off.
//! Without the feature every entry point is a no-op and logging falls back
//! to [`init_basic_console_logging`].
//!
//! # Examples
//!
//! ```no_run
//! use rollbook_observability::{init_metrics, init_tracing};
//!
//! #[tokio::main]
//! async fn main() {
//!     init_tracing();
//!     init_metrics();
//! }
//! ```

pub mod basic_logging;
#[cfg(feature = "observability")]
pub mod logging;
#[cfg(feature = "observability")]
pub mod metrics;

pub use basic_logging::init_basic_console_logging;

#[cfg(feature = "observability")]
pub use logging::{init_tracing, logging_middleware};
#[cfg(feature = "observability")]
pub use metrics::{
    init_metrics, is_observability_enabled, metrics_middleware, metrics_routes,
    track_pin_redeemed, track_school_created, track_user_created, track_user_login_failure,
    track_user_login_success,
};

// No-op stubs when observability is disabled
#[cfg(not(feature = "observability"))]
pub mod stubs {
    use axum::{Router, extract::Request, middleware::Next, response::Response};

    pub fn is_observability_enabled() -> bool {
        false
    }

    pub async fn logging_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub async fn metrics_middleware(req: Request, next: Next) -> Response {
        next.run(req).await
    }

    pub fn init_tracing() {
        super::init_basic_console_logging();
    }

    pub fn init_metrics() -> bool {
        false
    }

    pub fn metrics_routes<S>() -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        Router::new()
    }

    pub fn track_user_created(_role: &str) {}
    pub fn track_user_login_success() {}
    pub fn track_user_login_failure(_reason: &str) {}
    pub fn track_school_created() {}
    pub fn track_pin_redeemed(_category: &'static str) {}
}

#[cfg(not(feature = "observability"))]
pub use stubs::*;
