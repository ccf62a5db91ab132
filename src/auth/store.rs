// =============================================================================
// Credential Store — injected account lookup with salted password hashes
// =============================================================================
//
// Passwords never reach the store in plaintext: `Account::new` derives
// `hex(SHA-256(salt || password))` with a fresh random salt per account, and
// verification recomputes the digest and compares in constant time.
// =============================================================================

use std::collections::HashMap;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use super::{constant_time_eq, AuthError};

/// A registered account.
#[derive(Clone)]
pub struct Account {
    pub username: String,
    pub email: String,
    salt: String,
    password_hash: String,
}

impl Account {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let password_hash = hash_password(&salt, password);
        Self {
            username: username.into(),
            email: email.into(),
            salt,
            password_hash,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        let candidate = hash_password(&self.salt, password);
        constant_time_eq(candidate.as_bytes(), self.password_hash.as_bytes())
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Account storage keyed by email.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, email: &str) -> Option<Account>;

    /// Fails with `AuthError::UserExists` if the email is already taken.
    fn insert(&self, account: Account) -> Result<(), AuthError>;
}

/// Process-local store; contents are lost on restart.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn lookup(&self, email: &str) -> Option<Account> {
        self.accounts.read().get(email).cloned()
    }

    fn insert(&self, account: Account) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write();
        if accounts.contains_key(&account.email) {
            return Err(AuthError::UserExists);
        }
        accounts.insert(account.email.clone(), account);
        Ok(())
    }
}
