//! Registration, login and password recovery.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::AppState;
use crate::account::{AccountService, Registration, Role};
use crate::error::Result;
use crate::router::{Envelope, Valid};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
pub struct LoginBody {
    #[validate(email(message = "Email must be formatted."))]
    email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub role: Role,
    pub user: LoggedUser,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
}

#[derive(Deserialize, Validate)]
pub struct ForgotPasswordBody {
    #[validate(email(message = "Email must be formatted."))]
    email: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordResponse {
    pub message: String,
    pub reset_token: String,
}

#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    #[validate(length(min = 1, message = "Token is required."))]
    token: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    new_password: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup/customer", post(signup_customer))
        .route("/signup/owner", post(signup_owner))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

async fn signup_customer(
    State(accounts): State<AccountService>,
    Valid(body): Valid<Registration>,
) -> Result<(StatusCode, Envelope<()>)> {
    accounts.register(Role::Customer, body).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::done("Customer registered successfully"),
    ))
}

async fn signup_owner(
    State(accounts): State<AccountService>,
    Valid(body): Valid<Registration>,
) -> Result<(StatusCode, Envelope<()>)> {
    accounts.register(Role::Owner, body).await?;

    Ok((
        StatusCode::CREATED,
        Envelope::done("Owner registered successfully"),
    ))
}

async fn login(
    State(accounts): State<AccountService>,
    Valid(body): Valid<LoginBody>,
) -> Result<Json<LoginResponse>> {
    let session = accounts.login(&body.email, &body.password).await?;
    tracing::info!(
        account_id = %session.account.id,
        role = %session.account.role,
        "account logged in"
    );

    Ok(Json(LoginResponse {
        token: session.token,
        token_type: TOKEN_TYPE.to_owned(),
        expires_in: session.expires_in,
        role: session.account.role,
        user: LoggedUser {
            id: session.account.id,
            email: session.account.email,
            full_name: session.account.name,
        },
    }))
}

async fn forgot_password(
    State(accounts): State<AccountService>,
    Valid(body): Valid<ForgotPasswordBody>,
) -> Result<Json<ForgotPasswordResponse>> {
    let reset_token = accounts.forgot_password(&body.email).await?;

    Ok(Json(ForgotPasswordResponse {
        message: "Reset link generated".to_owned(),
        reset_token,
    }))
}

async fn reset_password(
    State(accounts): State<AccountService>,
    Valid(body): Valid<ResetPasswordBody>,
) -> Result<Envelope<()>> {
    accounts
        .reset_password(&body.token, &body.new_password)
        .await?;

    Ok(Envelope::done("Password reset successful"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::tests::json;
    use crate::*;
    use axum::http::Method;
    use serde_json::json;

    async fn signup(app: &Router, role: &str, body: serde_json::Value) -> StatusCode {
        make_request(
            app.clone(),
            Method::POST,
            &format!("/api/auth/signup/{role}"),
            None,
            body.to_string(),
        )
        .await
        .status()
    }

    #[tokio::test]
    async fn test_signup_and_login() {
        let state = router::state();
        let app = app(state.clone());

        let status = signup(
            &app,
            "customer",
            json!({ "name": "Jane Doe", "email": "jane@doe.io", "password": "correct horse" }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "jane@doe.io", "password": "correct horse" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: LoginResponse = serde_json::from_value(json(response).await).unwrap();
        assert_eq!(body.token_type, TOKEN_TYPE);
        assert_eq!(body.role, Role::Customer);
        assert_eq!(body.user.full_name, "Jane Doe");

        let claims = state.token.decode(&body.token).unwrap();
        assert_eq!(claims.sub, body.user.id);
        assert_eq!(claims.role, Role::Customer);

        let response = make_request(
            app,
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "jane@doe.io", "password": "wrong horse" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let app = app(router::state());

        // Weak password.
        let status = signup(
            &app,
            "customer",
            json!({ "name": "Jane Doe", "email": "jane@doe.io", "password": "short" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Owners need a phone number.
        let status = signup(
            &app,
            "owner",
            json!({ "name": "Sam Owner", "email": "sam@shop.io", "password": "correct horse" }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let owner = json!({
            "fullName": "Sam Owner",
            "email": "sam@shop.io",
            "password": "correct horse",
            "phoneNumber": "555-0100"
        });
        assert_eq!(signup(&app, "owner", owner.clone()).await, StatusCode::CREATED);
        assert_eq!(signup(&app, "owner", owner).await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_password_recovery() {
        let app = app(router::state());
        signup(
            &app,
            "customer",
            json!({ "name": "Jane Doe", "email": "jane@doe.io", "password": "correct horse" }),
        )
        .await;

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/auth/forgot-password",
            None,
            json!({ "email": "jane@doe.io" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: ForgotPasswordResponse = serde_json::from_value(json(response).await).unwrap();
        assert_eq!(body.message, "Reset link generated");

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/auth/reset-password",
            None,
            json!({ "token": body.reset_token, "newPassword": "battery staple" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app.clone(),
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "jane@doe.io", "password": "battery staple" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = make_request(
            app,
            Method::POST,
            "/api/auth/forgot-password",
            None,
            json!({ "email": "ghost@doe.io" }).to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
