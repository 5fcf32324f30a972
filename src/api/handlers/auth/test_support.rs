//! In-memory credential store for handler tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::credentials::{Credential, CredentialStore, hash_password, verify_password};

struct Row {
    email: String,
    password_hash: String,
    email_validated: bool,
}

#[derive(Default)]
pub(crate) struct MemoryCredentialStore {
    rows: Mutex<HashMap<String, Row>>,
    lookups: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryCredentialStore {
    pub(crate) fn insert(
        &self,
        username: &str,
        email: &str,
        password: &str,
        email_validated: bool,
    ) -> Result<()> {
        let row = Row {
            email: email.to_string(),
            password_hash: hash_password(password)?,
            email_validated,
        };
        self.rows
            .lock()
            .map_err(|_| anyhow!("store poisoned"))?
            .insert(username.to_string(), row);
        Ok(())
    }

    /// Number of `check_credentials` calls so far.
    pub(crate) fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub(crate) fn fail_lookups(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn is_validated(&self, username: &str) -> bool {
        self.rows
            .lock()
            .ok()
            .and_then(|rows| rows.get(username).map(|row| row.email_validated))
            .unwrap_or(false)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn check_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Credential>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }

        let found = {
            let rows = self.rows.lock().map_err(|_| anyhow!("store poisoned"))?;
            rows.get(username).map(|row| {
                (
                    row.password_hash.clone(),
                    Credential {
                        username: username.to_string(),
                        email: row.email.clone(),
                        email_validated: row.email_validated,
                    },
                )
            })
        };

        let (stored, credential) = match found {
            Some((hash, credential)) => (Some(hash), Some(credential)),
            None => (None, None),
        };
        if verify_password(stored, password.to_string()).await? {
            Ok(credential)
        } else {
            Ok(None)
        }
    }

    async fn confirm_email(&self, username: &str) -> Result<bool> {
        let mut rows = self.rows.lock().map_err(|_| anyhow!("store poisoned"))?;
        Ok(rows
            .get_mut(username)
            .map(|row| row.email_validated = true)
            .is_some())
    }

    async fn ping(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("connection refused"));
        }
        Ok(())
    }
}
