use std::sync::Arc;

use axum::extract::FromRef;
use chrono::{Duration, Utc};
use serde::Deserialize;
use validator::Validate;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::AppState;
use crate::account::{Account, AccountRepository, Role, normalize_email};
use crate::crypto::{Crypto, random_token};
use crate::error::{Result, ServerError};
use crate::token::TokenManager;

/// Password reset links stay valid one hour.
const RESET_TOKEN_LIFETIME: i64 = 1;
/// Login looks accounts up in this order.
const LOGIN_ORDER: [Role; 2] = [Role::Customer, Role::Owner];

/// Data required to open an account.
#[derive(Deserialize, Validate, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(alias = "fullName")]
    #[validate(length(min = 2, message = "Name must be at least 2 characters long."))]
    pub name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
    pub phone_number: Option<String>,
}

/// Outcome of a successful login.
pub struct Session {
    pub token: String,
    pub expires_in: u64,
    pub account: Account,
}

/// Account manager.
#[derive(Clone)]
pub struct AccountService {
    repo: Arc<dyn AccountRepository>,
    crypto: Arc<Crypto>,
    token: TokenManager,
}

impl FromRef<AppState> for AccountService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.db.accounts),
            Arc::clone(&state.crypto),
            state.token.clone(),
        )
    }
}

impl AccountService {
    /// Create a new [`AccountService`].
    pub fn new(repo: Arc<dyn AccountRepository>, crypto: Arc<Crypto>, token: TokenManager) -> Self {
        Self {
            repo,
            crypto,
            token,
        }
    }

    /// Open a new account. Emails are unique per role.
    pub async fn register(&self, role: Role, registration: Registration) -> Result<Account> {
        let phone_number = registration
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
            .map(str::to_owned);
        if role == Role::Owner && phone_number.is_none() {
            return Err(ServerError::field(
                "phoneNumber",
                "required",
                "Phone number is required for salon owners.",
            ));
        }

        let email = normalize_email(&registration.email);
        if self.repo.find_by_email(role, &email).await?.is_some() {
            return Err(ServerError::Conflict("Email is already registered"));
        }

        let password = self.crypto.pwd.hash_password(&registration.password)?;
        let mut account = Account::new(role, registration.name.trim().to_owned(), email, password);
        account.phone_number = phone_number;

        self.repo.create(&account).await?;
        tracing::info!(account_id = %account.id, %role, "account registered");

        Ok(account)
    }

    /// Check credentials and issue an access token.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let account = self
            .find_any_by_email(&normalize_email(email))
            .await?
            .ok_or(ServerError::InvalidCredentials)?;

        if !self.crypto.pwd.verify_password(password, &account.password) {
            tracing::debug!(account_id = %account.id, "wrong password");
            return Err(ServerError::InvalidCredentials);
        }

        Ok(Session {
            token: self.token.create(account.id, account.role)?,
            expires_in: self.token.expires_in(),
            account,
        })
    }

    /// Store a fresh reset token on the account and return it.
    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        let mut account = self
            .find_any_by_email(&normalize_email(email))
            .await?
            .ok_or(ServerError::NotFound("User not found"))?;

        let token = random_token();
        account.reset_token = Some(token.clone());
        account.reset_expires_at = Some(Utc::now() + Duration::hours(RESET_TOKEN_LIFETIME));
        self.repo.update(&account).await?;

        Ok(token)
    }

    /// Replace the password of the account holding `token`.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        let mut account = self.repo.find_by_reset_token(token).await?.ok_or_else(|| {
            ServerError::field("token", "invalid_token", "Invalid or expired token")
        })?;

        if account
            .reset_expires_at
            .is_none_or(|expires_at| expires_at < Utc::now())
        {
            return Err(ServerError::field("token", "expired_token", "Token expired"));
        }

        account.password = self.crypto.pwd.hash_password(new_password)?;
        account.reset_token = None;
        account.reset_expires_at = None;
        self.repo.update(&account).await?;
        tracing::info!(account_id = %account.id, "password reset");

        Ok(())
    }

    async fn find_any_by_email(&self, email: &str) -> Result<Option<Account>> {
        for role in LOGIN_ORDER {
            if let Some(account) = self.repo.find_by_email(role, email).await? {
                return Ok(Some(account));
            }
        }

        Ok(None)
    }
}
