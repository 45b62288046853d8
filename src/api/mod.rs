#![allow(clippy::needless_for_each)]

use crate::cli::telemetry;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, Request},
    routing::{get, post, put},
    Router,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;

pub mod error;
pub mod handlers;
pub mod password;
pub mod store;

use self::store::{PgUserStore, UserStore};

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::user_register::register,
        handlers::user_login::login,
        handlers::profile::profile,
        handlers::profile::names,
        handlers::profile::update_elo,
    ),
    components(schemas(
        handlers::Message,
        handlers::health::Health,
        handlers::user_register::UserRegister,
        handlers::user_login::UserLogin,
        handlers::user_login::LoginSuccess,
        handlers::profile::ProfileFound,
        handlers::profile::NamesRequest,
        handlers::profile::Names,
        handlers::profile::EloUpdate,
        store::Profile,
    )),
    tags(
        (name = "userauth", description = "User registration and login API")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Connection pool settings for the PostgreSQL backend.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    dsn: String,
    min_connections: u32,
    max_connections: u32,
    max_lifetime: Duration,
}

impl PoolConfig {
    #[must_use]
    pub fn new(dsn: String) -> Self {
        Self {
            dsn,
            min_connections: 1,
            max_connections: 5,
            max_lifetime: Duration::from_secs(60 * 2),
        }
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(self.min_connections);
        self
    }

    #[must_use]
    pub const fn max_connections(&self) -> u32 {
        self.max_connections
    }

    /// Open the pool and check one connection out.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    pub async fn connect(&self) -> Result<PgPool> {
        PgPoolOptions::new()
            .min_connections(self.min_connections)
            .max_connections(self.max_connections)
            .max_lifetime(self.max_lifetime)
            .test_before_acquire(true)
            .connect(&self.dsn)
            .await
            .context("Failed to connect to database")
    }
}

/// Build the application router around a user store.
pub fn router(store: Arc<dyn UserStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_origin(Any);

    // CORS stays off /health so OPTIONS reaches the handler
    let api = Router::new()
        .route("/", get(|| async { "🌱" }))
        .route("/profile", post(handlers::register))
        .route("/profile/names", post(handlers::names))
        .route("/profile/elo", put(handlers::update_elo))
        .route("/profile/:uuid", get(handlers::profile))
        .route("/login", post(handlers::login))
        .layer(cors);

    Router::new()
        .merge(api)
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(store)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, pool_config: PoolConfig) -> Result<()> {
    let pool = pool_config.connect().await?;

    info!(
        "Connected to database (max connections: {})",
        pool_config.max_connections()
    );

    let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let app = router(store);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    telemetry::shutdown_tracer();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
