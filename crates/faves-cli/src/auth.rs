//! Per-profile API access tokens kept in the OS keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;
use thiserror::Error;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "faves-cli";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Access token cannot be empty")]
    EmptyToken,
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Clone)]
pub struct TokenStore {
    username: String,
}

impl TokenStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("access_token:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(not(test))]
    pub fn load(&self) -> AuthResult<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn load(&self) -> AuthResult<Option<String>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        Ok(guard.get(&self.username).cloned())
    }

    #[cfg(not(test))]
    fn write(&self, token: &str) -> AuthResult<()> {
        self.entry()?
            .set_password(token)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn write(&self, token: &str) -> AuthResult<()> {
        Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?
            .insert(self.username.clone(), token.to_string());
        Ok(())
    }

    /// Store a token, trimming surrounding whitespace.
    pub fn save(&self, token: &str) -> AuthResult<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }
        self.write(token)
    }

    /// Remove the stored token. Returns whether one existed.
    #[cfg(not(test))]
    pub fn clear(&self) -> AuthResult<bool> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    pub fn clear(&self) -> AuthResult<bool> {
        Ok(Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?
            .remove(&self.username)
            .is_some())
    }
}
