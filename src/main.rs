//! orbmem - Main Application Entry Point
//!
//! REST API server granting and enforcing access to per-tenant cognitive
//! databases (memory, vector, graph, and safety stores), monetized through
//! a payment processor.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: identity token + API key with SHA-256 hashing,
//!   bypassed entirely in local mode
//! - **Payments**: Razorpay orders, checkout callbacks, and webhooks,
//!   reconciled exactly-once through an idempotency ledger
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables (mode resolved once)
//! 2. Create database connection pool and run migrations
//! 3. Construct the shared storage engines and the tenant router
//! 4. In cloud mode, construct the identity and payment provider clients
//! 5. Build HTTP router with routes and middleware
//! 6. Start server on configured port

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use orbmem::{
    config::{Config, Mode},
    db,
    engines::{
        graph::InMemoryGraphStore, memory::PostgresMemoryStore, safety::KeywordSafetyScanner,
        vector::InMemoryVectorIndex,
    },
    handlers,
    middleware::{auth, guard, usage},
    state::{AppState, CloudServices},
    tenant::TenantRouter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration; the deployment mode is fixed from here on
    let config = Config::from_env()?;
    tracing::info!(mode = ?config.deployment_mode, "Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    // Shared storage engines; the vector index and graph are one in-process
    // instance for all tenants, isolation comes from the tenant router
    let tenants = Arc::new(TenantRouter::new(
        Arc::new(PostgresMemoryStore::new(pool.clone())),
        Arc::new(InMemoryVectorIndex::new()),
        Arc::new(InMemoryGraphStore::new()),
        Arc::new(KeywordSafetyScanner::new()),
    ));

    // Identity and payment provider clients exist only in cloud mode
    let cloud = match config.deployment_mode {
        Mode::Cloud => Some(Arc::new(CloudServices::from_config(&config)?)),
        Mode::Local => None,
    };

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        tenants,
        cloud,
    };

    // Data-plane routes: auth gate outside, usage tracker inside it
    let data_routes = Router::new()
        .route("/v1/", get(handlers::cognitive::root))
        .route("/v1/memory/set", post(handlers::cognitive::memory_set))
        .route("/v1/memory/get", get(handlers::cognitive::memory_get))
        .route("/v1/memory/keys", get(handlers::cognitive::memory_keys))
        .route(
            "/v1/memory/delete",
            delete(handlers::cognitive::memory_delete),
        )
        .route("/v1/vector/add", post(handlers::cognitive::vector_add))
        .route(
            "/v1/vector/search",
            post(handlers::cognitive::vector_search),
        )
        .route(
            "/v1/graph/add_step",
            post(handlers::cognitive::graph_add_step),
        )
        .route("/v1/graph/path", get(handlers::cognitive::graph_path))
        .route("/v1/safety/scan", post(handlers::cognitive::safety_scan))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            usage::usage_tracker,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    let mut app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .merge(data_routes);

    // Entitlement surface exists only in cloud mode; local mode has no
    // keys, payments, or webhooks to manage
    if config.deployment_mode == Mode::Cloud {
        // Identity-token-only routes: a key may not exist yet
        let bootstrap_routes = Router::new()
            .route("/v1/api-keys/create", post(handlers::api_keys::create_first_key))
            .route("/v1/api-keys/me", get(handlers::api_keys::list_my_keys))
            .route("/v1/payments/create-order", post(handlers::payments::create_order))
            .route("/v1/payments/verify", post(handlers::payments::verify_payment))
            // Webhook authenticates by signature, not headers
            .route("/v1/webhooks/razorpay", post(handlers::webhooks::razorpay_webhook));

        // Regenerate requires the full auth gate
        let keyed_routes = Router::new()
            .route(
                "/v1/api-keys/regenerate",
                post(handlers::api_keys::regenerate_key),
            )
            .route_layer(axum_middleware::from_fn_with_state(
                state.clone(),
                auth::auth_middleware,
            ));

        app = app.merge(bootstrap_routes).merge(keyed_routes);
    }

    let app = app
        // Reject API keys smuggled through query parameters, before anything else
        .layer(axum_middleware::from_fn(guard::block_query_api_keys))
        // Browser frontend calls this API directly
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    axum::serve(listener, app).await?;

    Ok(())
}
