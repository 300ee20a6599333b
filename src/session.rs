//! Client-side session storage
//!
//! The dashboard persists exactly three keys between page loads. This is the
//! key/value storage that holds them.

use std::collections::HashMap;

pub const TOKEN_KEY: &str = "mbl_token";
pub const USERNAME_KEY: &str = "mbl_username";
pub const ROLE_KEY: &str = "mbl_role";

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    storage: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session as left behind by a successful login
    pub fn with_credentials(token: &str, username: &str, role: &str) -> Self {
        let mut session = Self::new();
        session.set(TOKEN_KEY, token);
        session.set(USERNAME_KEY, username);
        session.set(ROLE_KEY, role);
        session
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.storage.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.storage.insert(key.to_string(), value.to_string());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.storage.remove(key)
    }

    pub fn clear(&mut self) {
        self.storage.clear();
    }

    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN_KEY).filter(|t| !t.is_empty())
    }

    pub fn username(&self) -> Option<&str> {
        self.get(USERNAME_KEY)
    }

    pub fn role(&self) -> Option<&str> {
        self.get(ROLE_KEY)
    }

    pub fn is_admin(&self) -> bool {
        self.role() == Some(ADMIN_ROLE)
    }

    /// Drops the three session keys, leaving anything else in place
    pub fn end(&mut self) {
        for key in [TOKEN_KEY, USERNAME_KEY, ROLE_KEY] {
            self.remove(key);
        }
    }
}
