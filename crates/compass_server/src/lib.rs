//! HTTP server wiring for ACM Compass (API, handlers, and shared state).

/// HTTP error mapping for API handlers.
pub mod error;
/// JSON body extraction.
pub mod extract;
/// HTTP handlers for problems, contests, imports, and sync.
pub mod handlers;

pub use compass_core::{
    config, db, models, AppError, Config, Database, ImportStaging, SyncManager, DEFAULT_PORT,
};

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

/// Shared state passed to HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<Config>,
    pub staging: Arc<ImportStaging>,
    pub sync: Arc<SyncManager>,
}

impl AppState {
    /// Construct shared state with in-memory staging and a `git` backend.
    pub fn new(config: Config, db: Database) -> Self {
        let sync = SyncManager::from_config(&config);
        Self::with_parts(config, db, ImportStaging::default(), sync)
    }

    /// Construct shared state from explicit staging and sync components.
    pub fn with_parts(
        config: Config,
        db: Database,
        staging: ImportStaging,
        sync: SyncManager,
    ) -> Self {
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            staging: Arc::new(staging),
            sync: Arc::new(sync),
        }
    }
}

/// Create the application router with all routes and middleware.
///
/// # Arguments
/// - `state`: Shared application state.
/// - `allow_public_access`: Whether to allow cross-origin requests from any origin.
pub fn create_app(state: AppState, allow_public_access: bool) -> Router {
    let cors_port = state.config.port;
    create_app_with_cors_port(state, allow_public_access, cors_port)
}

/// Resolve the listener address from env var overrides and security policy.
///
/// # Returns
/// A socket address that enforces loopback when public access is disabled.
pub fn resolve_bind_address(config: &Config, allow_public_access: bool) -> SocketAddr {
    let default_bind = SocketAddr::from(([127, 0, 0, 1], config.port));
    let requested = match std::env::var("BIND") {
        Ok(value) => match value.trim().parse::<SocketAddr>() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::warn!(
                    "Invalid BIND='{}': {}. Falling back to {}",
                    value,
                    err,
                    default_bind
                );
                default_bind
            }
        },
        Err(_) => default_bind,
    };

    if allow_public_access || requested.ip().is_loopback() {
        return requested;
    }

    tracing::warn!(
        "Non-loopback bind {} requested without ALLOW_PUBLIC_ACCESS; forcing 127.0.0.1",
        requested
    );
    SocketAddr::from(([127, 0, 0, 1], requested.port()))
}

/// Origins allowed to call the API: the local UI plus the scraped contest sites.
fn allowed_origins(config: &Config, cors_port: u16) -> Vec<HeaderValue> {
    let local = [
        format!("http://localhost:{}", cors_port),
        format!("http://127.0.0.1:{}", cors_port),
    ];
    local
        .into_iter()
        .chain(config.import_origins.iter().cloned())
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Ignoring invalid CORS origin '{}': {}", origin, err);
                None
            }
        })
        .collect()
}

fn cors_layer(config: &Config, allow_public_access: bool, cors_port: u16) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE];
    if allow_public_access {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods(methods)
            .allow_headers(tower_http::cors::Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed_origins(config, cors_port)))
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
    }
}

fn api_routes() -> Router<AppState> {
    use handlers::{contest, import, problem, sync};

    Router::new()
        .route(
            "/api/problems",
            get(problem::list_problems).post(problem::create_problem),
        )
        .route(
            "/api/problems/:id",
            get(problem::get_problem)
                .put(problem::update_problem)
                .delete(problem::delete_problem),
        )
        .route(
            "/api/problems/:id/solution",
            get(problem::get_solution)
                .put(problem::save_solution)
                .delete(problem::delete_solution),
        )
        .route(
            "/api/contests",
            get(contest::list_contests).post(contest::create_contest),
        )
        .route(
            "/api/contests/:id",
            get(contest::get_contest)
                .put(contest::update_contest)
                .delete(contest::delete_contest),
        )
        .route(
            "/api/import",
            get(import::get_pending).delete(import::clear_pending),
        )
        .route(
            "/api/import/contest",
            post(import::submit_contest)
                .get(import::get_contest)
                .delete(import::clear_contest),
        )
        .route("/api/import/contest/confirm", post(import::confirm_contest))
        .route(
            "/api/import/problems",
            post(import::submit_problems)
                .get(import::get_problems)
                .delete(import::clear_problems),
        )
        .route("/api/import/problems/stats", post(import::merge_stats))
        .route("/api/import/problems/confirm", post(import::confirm_problems))
        .route("/api/import/confirm", post(import::confirm_all))
        .route("/api/sync", get(sync::sync_summary))
        .route("/api/sync/status", get(sync::sync_status))
        .route("/api/sync/clone", post(sync::clone_repo))
        .route("/api/sync/pull", post(sync::pull))
        .route("/api/sync/push", post(sync::push))
}

fn create_app_with_cors_port(state: AppState, allow_public_access: bool, cors_port: u16) -> Router {
    let cors = cors_layer(&state.config, allow_public_access, cors_port);
    let max_body_size = state.config.max_body_size;

    api_routes().with_state(state).layer(
        tower::ServiceBuilder::new()
            .layer(DefaultBodyLimit::max(max_body_size))
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            )),
    )
}

fn listener_cors_port(listener: &tokio::net::TcpListener, fallback_port: u16) -> u16 {
    listener
        .local_addr()
        .map(|addr| addr.port())
        .unwrap_or(fallback_port)
}

/// Run the Axum server with graceful shutdown support.
///
/// # Errors
/// Returns any I/O error produced by `axum::serve`.
pub async fn serve_router(
    listener: tokio::net::TcpListener,
    state: AppState,
    allow_public_access: bool,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), std::io::Error> {
    let cors_port = listener_cors_port(&listener, state.config.port);
    let app = create_app_with_cors_port(state, allow_public_access, cors_port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
}

#[cfg(test)]
mod tests {
    use super::{allowed_origins, listener_cors_port, resolve_bind_address};
    use compass_core::env::{env_lock, EnvGuard};
    use compass_core::{Config, DEFAULT_PORT};
    use std::net::SocketAddr;

    fn config(port: u16) -> Config {
        Config {
            data_dir: String::from("/tmp/compass-data"),
            config_dir: String::from("/tmp/compass-config"),
            port,
            max_body_size: 1024,
            import_origins: vec!["https://qoj.ac".to_string(), "bad\norigin".to_string()],
            auto_backup: false,
            git_bin: "git".to_string(),
        }
    }

    #[tokio::test]
    async fn listener_cors_port_uses_bound_listener_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener");
        let expected = listener.local_addr().expect("listener addr").port();
        assert_eq!(listener_cors_port(&listener, DEFAULT_PORT), expected);
    }

    #[test]
    fn resolve_bind_address_enforces_loopback_when_public_access_disabled() {
        let _lock = env_lock().lock().expect("env lock");
        let _bind = EnvGuard::set("BIND", "0.0.0.0:4040");
        let resolved = resolve_bind_address(&config(4040), false);
        assert_eq!(resolved.ip().to_string(), "127.0.0.1");
        assert_eq!(resolved.port(), 4040);

        let public = resolve_bind_address(&config(4040), true);
        assert_eq!(public.ip().to_string(), "0.0.0.0");
    }

    #[test]
    fn resolve_bind_address_falls_back_on_invalid_value() {
        let _lock = env_lock().lock().expect("env lock");
        let _bind = EnvGuard::set("BIND", "bad:host");
        assert_eq!(
            resolve_bind_address(&config(4041), false),
            SocketAddr::from(([127, 0, 0, 1], 4041))
        );
    }

    #[test]
    fn allowed_origins_include_local_ui_and_import_sites() {
        let origins: Vec<String> = allowed_origins(&config(7000), 7000)
            .into_iter()
            .map(|value| value.to_str().expect("ascii origin").to_string())
            .collect();
        assert_eq!(
            origins,
            vec![
                "http://localhost:7000",
                "http://127.0.0.1:7000",
                "https://qoj.ac",
            ]
        );
    }
}
