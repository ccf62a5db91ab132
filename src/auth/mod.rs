// =============================================================================
// Accounts & Tokens
// =============================================================================
//
// `AuthService` ties a `CredentialStore` to a `TokenIssuer`:
//
//   signup  → store a salted password hash
//   login   → verify password → issue token
//   verify  → check token MAC + expiry → user
// =============================================================================

pub mod store;
pub mod token;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub use store::{Account, CredentialStore, InMemoryCredentialStore};
pub use token::{TokenError, TokenIssuer};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("an account with this email already exists")]
    UserExists,
    #[error("no account for this email")]
    UserNotFound,
    #[error("password does not match")]
    InvalidPassword,
    #[error("invalid token: {0}")]
    InvalidToken(#[from] TokenError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserView,
}

pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    tokens: TokenIssuer,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, tokens: TokenIssuer) -> Self {
        Self { store, tokens }
    }

    pub fn signup(&self, req: SignupRequest) -> Result<UserView, AuthError> {
        let username = req.username.trim();
        let email = req.email.trim().to_lowercase();
        if username.is_empty() || email.is_empty() || req.password.is_empty() {
            return Err(AuthError::InvalidRequest(
                "username, email and password are required".into(),
            ));
        }

        self.store.insert(Account::new(username, email.as_str(), &req.password))?;
        info!(username, email = %email, "account created");
        Ok(UserView {
            username: username.to_string(),
            email,
        })
    }

    pub fn login(&self, req: LoginRequest) -> Result<LoginResponse, AuthError> {
        let email = req.email.trim().to_lowercase();
        let account = self.store.lookup(&email).ok_or(AuthError::UserNotFound)?;
        if !account.verify_password(&req.password) {
            warn!(email = %email, "login rejected: bad password");
            return Err(AuthError::InvalidPassword);
        }

        let token = self.tokens.issue(&account.email, &account.username);
        info!(email = %email, "login succeeded");
        Ok(LoginResponse {
            token,
            user: UserView {
                username: account.username,
                email: account.email,
            },
        })
    }

    pub fn verify(&self, token: &str) -> Result<UserView, AuthError> {
        let claims = self.tokens.verify(token)?;
        Ok(UserView {
            username: claims.username,
            email: claims.sub,
        })
    }
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

/// Compare two byte slices in constant time. A length mismatch returns
/// early; only the contents are compared without short-circuiting.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
