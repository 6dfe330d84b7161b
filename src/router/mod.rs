//! HTTP routes.
pub mod auth;
pub mod barber;
pub mod customer_profile;
pub mod public;
pub mod salon;
pub mod status;

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::ServerError;

/// [`axum::extract::Path`] rejecting with [`ServerError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServerError))]
pub struct Path<T>(pub T);

/// [`axum::extract::Query`] rejecting with [`ServerError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServerError))]
pub struct Query<T>(pub T);

/// [`axum::Json`] body rejecting with [`ServerError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct Json<T>(pub T);

/// JSON body that passed [`Validate`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Valid<T>(pub T);

impl<T, S> FromRequest<S> for Valid<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Successful response body: `{ success, data, count, message }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            count: None,
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Serialize> Envelope<Vec<T>> {
    /// List with its length in `count`.
    pub fn list(items: Vec<T>) -> Self {
        Self {
            count: Some(items.len()),
            ..Self::data(items)
        }
    }
}

impl Envelope<()> {
    /// Body holding only a message.
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            count: None,
            message: Some(message.into()),
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        axum::Json(self).into_response()
    }
}

/// Landing body of the role areas.
#[derive(Debug, PartialEq, Serialize, serde::Deserialize)]
pub struct Area {
    pub message: String,
}

/// `GET /api/customer/profile`.
pub async fn customer_area() -> axum::Json<Area> {
    axum::Json(Area {
        message: "Customer profile data".to_owned(),
    })
}

/// `GET /api/owner/dashboard`.
pub async fn owner_dashboard() -> axum::Json<Area> {
    axum::Json(Area {
        message: "Owner dashboard data".to_owned(),
    })
}

/// In-memory state for handler tests.
#[cfg(test)]
pub fn state() -> crate::AppState {
    use std::sync::Arc;

    crate::AppState {
        config: Arc::new(crate::config::Configuration::default()),
        db: crate::database::Database::memory(),
        crypto: Arc::new(crate::crypto::test_crypto()),
        token: crate::token::TokenManager::new("barberx", "secret"),
        metrics: None,
    }
}
