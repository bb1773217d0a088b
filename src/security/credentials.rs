//! Username/password credentials.

use std::collections::HashMap;

use thiserror::Error;

/// Upper bound on configured users.
pub const MAX_USERS: usize = 1024;

/// Errors from [`CredentialStore::add`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{0:?} already exists")]
    Duplicate(String),

    #[error("too many entries (limit {0})")]
    Full(usize),
}

/// Errors from parsing a `user:pass,...` list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("invalid user:pass entry {0:?}")]
    Malformed(String),

    #[error("user and password must be non-empty: {0:?}")]
    Empty(String),

    #[error("users: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    Denied,
}

/// Bounded map of unique keys to values.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    entries: HashMap<Vec<u8>, Vec<u8>>,
    max_size: usize,
}

impl CredentialStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_size,
        }
    }

    /// Add `key` unless it already exists or the store is full.
    pub fn add(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.entries.contains_key(key.as_bytes()) {
            return Err(StoreError::Duplicate(key.to_string()));
        }
        if self.entries.len() >= self.max_size {
            return Err(StoreError::Full(self.max_size));
        }

        self.entries
            .insert(key.as_bytes().to_vec(), value.as_bytes().to_vec());
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Users allowed to authenticate with a username and password.
#[derive(Debug, Clone)]
pub struct Credentials {
    store: CredentialStore,
}

impl Credentials {
    /// Parse a comma-separated `user:pass` list. Empty items are skipped.
    pub fn parse(list: &str) -> Result<Self, CredentialError> {
        let mut store = CredentialStore::new(MAX_USERS);

        for entry in list.split(',').filter(|entry| !entry.is_empty()) {
            let mut parts = entry.split(':');
            let (Some(user), Some(pass), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(CredentialError::Malformed(entry.to_string()));
            };
            if user.is_empty() || pass.is_empty() {
                return Err(CredentialError::Empty(entry.to_string()));
            }

            store.add(user, pass)?;
        }

        Ok(Self { store })
    }

    /// Check a username/password pair.
    pub fn authenticate(&self, username: &[u8], password: &[u8]) -> Result<(), AuthError> {
        if username.is_empty() || password.is_empty() {
            return Err(AuthError::Denied);
        }

        match self.store.get(username) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(AuthError::Denied),
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
