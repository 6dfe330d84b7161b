//! barberx is a booking backend for salons and barbers.

#![forbid(unsafe_code)]
mod account;
mod barber;
mod crypto;
mod customer;
mod database;
pub mod error;
mod middleware;
mod router;
mod salon;
pub mod telemetry;
mod token;

pub mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
use error::ServerError;
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    app: Router,
    method: Method,
    path: &str,
    token: Option<&str>,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub db: database::Database,
    pub crypto: Arc<crypto::Crypto>,
    pub token: token::TokenManager,
    pub metrics: Option<PrometheusHandle>,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(
                        size_bytes = chunk.len(),
                        latency = ?latency,
                        "sending body chunk"
                    )
                })
                .make_span_with(
                    DefaultMakeSpan::new()
                        .include_headers(true)
                        .level(tracing::Level::INFO),
                )
                .on_request(DefaultOnRequest::new())
                .on_response(
                    DefaultOnResponse::new()
                        .include_headers(true)
                        .latency_unit(LatencyUnit::Micros),
                ),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(10),
        ))
        // Remove senstive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([header::AUTHORIZATION, header::COOKIE]))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any)
                .vary([header::AUTHORIZATION]),
        );

    let customer = Router::new()
        .route("/profile", get(router::customer_area))
        .route_layer(AxumMiddleware::from_fn(middleware::require_customer));
    let customer_profile = router::customer_profile::router()
        .route_layer(AxumMiddleware::from_fn(middleware::require_customer));
    let owner = Router::new()
        .route("/dashboard", get(router::owner_dashboard))
        .nest("/barber", router::barber::router())
        .route_layer(AxumMiddleware::from_fn(middleware::require_owner));
    let salon =
        router::salon::router().route_layer(AxumMiddleware::from_fn(middleware::require_owner));

    // Role gates run after `auth`, which is added last.
    let protected = Router::new()
        .nest("/customer", customer)
        .nest("/customer-profile", customer_profile)
        .nest("/owner", owner)
        .nest("/salon", salon)
        .route_layer(AxumMiddleware::from_fn_with_state(state.clone(), middleware::auth));

    let api = Router::new()
        .nest("/auth", router::auth::router())
        .nest("/public", router::public::router())
        .merge(protected);

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        .route("/metrics", get(telemetry::render))
        .nest("/api", api)
        .with_state(state)
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(middleware)
}

/// Initialize the application state.
pub async fn initialize_state(
    metrics: Option<PrometheusHandle>,
) -> Result<AppState, Box<dyn std::error::Error>> {
    // read configuration file. let it in memory.
    let config = config::Configuration::default()
        .path(std::env::var("CONFIG_PATH").map(PathBuf::from).unwrap_or_default())
        .read()?;

    let db = match config.postgres {
        Some(ref config) => {
            database::Database::postgres(
                &config.address,
                config
                    .username
                    .as_deref()
                    .unwrap_or(database::DEFAULT_CREDENTIALS),
                config
                    .password
                    .as_deref()
                    .unwrap_or(database::DEFAULT_CREDENTIALS),
                config
                    .database
                    .as_deref()
                    .unwrap_or(database::DEFAULT_DATABASE_NAME),
                config.pool_size.unwrap_or(database::DEFAULT_POOL_SIZE),
            )
            .await?
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, data is kept in memory"
            );
            database::Database::memory()
        },
    };

    let crypto = Arc::new(crypto::Crypto::new(config.argon2.clone())?);

    // handle jwt.
    let Some(secret) = config.token.secret.as_deref() else {
        return Err(ServerError::Internal {
            details: "missing `token.secret` entry or `JWT_SECRET` environment variable".into(),
            source: None,
        }
        .into());
    };
    let mut token = token::TokenManager::new(&config.name, secret);
    if let Some(audience) = &config.token.audience {
        token.audience(audience);
    }
    if let Some(expires_in) = config.token.expires_in {
        token.lifetime(expires_in);
    }

    Ok(AppState {
        config,
        db,
        crypto,
        token,
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Role;
    use crate::router::tests::{bearer, json};

    #[tokio::test]
    async fn test_owner_dashboard() {
        let state = router::state();
        let (_, owner) = bearer(&state, Role::Owner);

        let response = make_request(
            app(state),
            Method::GET,
            "/api/owner/dashboard",
            Some(&owner),
            String::new(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["message"], "Owner dashboard data");
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let response =
            make_request(app(router::state()), Method::GET, "/metrics", None, String::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
