//! Middlewares for routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::AppState;
use crate::account::Role;
use crate::error::{Result, ServerError};

const BEARER: &str = "Bearer ";

/// Authenticated caller, inserted into request extensions by [`auth`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
}

/// Custom middleware for authentification.
pub async fn auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let claims = state.token.decode(token.trim()).map_err(|err| {
        tracing::debug!(error = %err, "rejected bearer token");
        ServerError::Unauthorized
    })?;

    req.extensions_mut().insert(Principal {
        id: claims.sub,
        role: claims.role,
    });
    Ok(next.run(req).await)
}

async fn require(role: Role, req: Request, next: Next) -> Result<Response> {
    match req.extensions().get::<Principal>() {
        Some(principal) if principal.role == role => Ok(next.run(req).await),
        Some(_) => Err(ServerError::Forbidden),
        None => Err(ServerError::Unauthorized),
    }
}

/// Let only customers through. Must run after [`auth`].
pub async fn require_customer(req: Request, next: Next) -> Result<Response> {
    require(Role::Customer, req, next).await
}

/// Let only salon owners through. Must run after [`auth`].
pub async fn require_owner(req: Request, next: Next) -> Result<Response> {
    require(Role::Owner, req, next).await
}
