/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use chainwatch_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, None, config);
/// let app = chainwatch_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware, middleware::security::SecurityHeadersLayer};
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, patch, post},
    Router,
};
use chainwatch_shared::{
    quota::QuotaEnforcer,
    redis::{Cache, RateLimiter, RedisClient},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is an Arc or pool handle, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Redis client, used by the health check (None when Redis is not
    /// configured)
    pub redis: Option<RedisClient>,

    /// JSON cache over Redis
    pub cache: Option<Cache>,

    /// Fixed-window rate limiter over Redis
    pub rate_limiter: Option<RateLimiter>,

    /// Plan quota enforcement
    pub quota: QuotaEnforcer,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    ///
    /// When `redis` is None the API still serves requests: rate limiting
    /// fails open and caches are skipped.
    pub fn new(db: PgPool, redis: Option<RedisClient>, config: Config) -> Self {
        let cache = redis.clone().map(Cache::new);
        let rate_limiter = redis.clone().map(RateLimiter::new);
        let quota = QuotaEnforcer::new(db.clone());

        Self {
            db,
            redis,
            cache,
            rate_limiter,
            quota,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// State over a lazy pool for unit tests
    ///
    /// The pool never connects unless a test actually issues a query;
    /// paths under test here stop at token or format validation.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        use crate::config::Environment;
        use sqlx::postgres::PgPoolOptions;

        let db = PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/chainwatch_test")
            .expect("lazy test pool");

        Self::new(db, None, Config::for_tests(Environment::Local))
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                     # Liveness (public)
/// ├── /docs, /openapi.json        # Reference pages (gated by environment)
/// ├── /api/v1/
/// │   ├── /auth/                  # register/login/refresh (public), me
/// │   ├── /api-keys/              # Key management
/// │   ├── /tenants/               # Self-service + platform admin
/// │   ├── /networks/              # Network catalog
/// │   ├── /monitors/              # Monitor CRUD + sync
/// │   ├── /triggers/              # Trigger CRUD + test
/// │   └── /audit/                 # Audit trail
/// ```
///
/// # Middleware
///
/// Request ids and the request log wrap everything; protected scopes run
/// authentication, then tenant resolution, then rate limiting, so the
/// limiter can key on the authenticated tenant. The public auth scope is
/// rate limited without authentication (per client IP).
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Reference pages; auth is attempted but never required, the
    // handlers decide visibility from environment and superuser status
    let docs_routes = Router::new()
        .route("/docs", get(routes::docs::docs_page))
        .route("/openapi.json", get(routes::docs::openapi_json))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth,
        ));

    // Credential endpoints (public, rate limited per client IP)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ));

    // Session-only profile endpoint
    let session_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let api_key_routes = Router::new()
        .route("/", post(routes::api_keys::create_api_key))
        .route("/", get(routes::api_keys::list_api_keys))
        .route("/:id", delete(routes::api_keys::revoke_api_key));

    let tenant_routes = Router::new()
        .route("/me", get(routes::tenants::get_my_tenant))
        .route("/me", patch(routes::tenants::update_my_tenant))
        .route("/", get(routes::tenants::list_tenants))
        .route("/", post(routes::tenants::create_tenant))
        .route("/:id", patch(routes::tenants::update_tenant))
        .route("/:id/suspend", post(routes::tenants::suspend_tenant))
        .route("/:id/reactivate", post(routes::tenants::reactivate_tenant));

    let network_routes = Router::new()
        .route("/", get(routes::networks::list_networks))
        .route("/", post(routes::networks::create_network))
        .route("/:id", patch(routes::networks::update_network))
        .route("/:id", delete(routes::networks::delete_network));

    let monitor_routes = Router::new()
        .route("/", get(routes::monitors::list_monitors))
        .route("/", post(routes::monitors::create_monitor))
        .route("/:id", get(routes::monitors::get_monitor))
        .route("/:id", patch(routes::monitors::update_monitor))
        .route("/:id", delete(routes::monitors::delete_monitor))
        .route("/:id/sync", post(routes::monitors::sync_monitor));

    let trigger_routes = Router::new()
        .route("/", get(routes::triggers::list_triggers))
        .route("/", post(routes::triggers::create_trigger))
        .route("/:id", get(routes::triggers::get_trigger))
        .route("/:id", patch(routes::triggers::update_trigger))
        .route("/:id", delete(routes::triggers::delete_trigger))
        .route("/:id/test", post(routes::triggers::test_trigger));

    let audit_routes = Router::new().route("/", get(routes::audit::list_audit));

    // Everything tenant-facing shares one pipeline. Layer order is
    // bottom-up: authentication first, then tenant resolution, then the
    // rate limiter keyed on the resolved tenant.
    let protected_routes = Router::new()
        .nest("/api-keys", api_key_routes)
        .nest("/tenants", tenant_routes)
        .nest("/networks", network_routes)
        .nest("/monitors", monitor_routes)
        .nest("/triggers", trigger_routes)
        .nest("/audit", audit_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::tenant::tenant_context_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes.merge(session_routes))
        .merge(protected_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-api-key"),
                header::HeaderName::from_static("x-tenant-id"),
            ])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with the outer middleware stack. The last
    // layers wrap the earlier ones, so on the way out responses pass
    // through the request log, then request id stamping, then
    // compression.
    Router::new()
        .merge(health_routes)
        .merge(docs_routes)
        .nest("/api/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(
            state.config.api.environment.is_production(),
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_log::request_log_middleware,
        ))
        .layer(axum::middleware::from_fn(
            middleware::request_id::request_id_middleware,
        ))
        .layer(CompressionLayer::new())
        .with_state(state)
}

// Router-level behavior (route wiring, docs gating, unauthenticated
// rejections) is exercised in tests/router_test.rs; flows that need
// Postgres and Redis live in tests/integration_test.rs.
