//! Authenticated-session lifecycle and the durable token slot.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context, Result};
use shared::domain::User;
use tracing::{debug, info, warn};

use crate::{api::RosterApi, error::ClientError};

/// Fixed key of the only durable client-side value.
pub const TOKEN_STORAGE_KEY: &str = "token";
pub const SESSION_FILE_NAME: &str = "session.json";

pub trait TokenSlot: Send + Sync {
    fn read(&self) -> Result<Option<String>>;
    fn write(&self, token: &str) -> Result<()>;
    fn erase(&self) -> Result<()>;
}

/// Key-value JSON file holding the session token under [`TOKEN_STORAGE_KEY`].
pub struct FileTokenSlot {
    path: PathBuf,
}

impl FileTokenSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(SESSION_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read '{}'", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw)
            .with_context(|| format!("malformed session file '{}'", self.path.display()))
    }

    fn store_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path)
                    .with_context(|| format!("failed to remove '{}'", self.path.display()))?;
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create session directory '{}'", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized)
            .with_context(|| format!("failed to write '{}'", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("failed to replace '{}'", self.path.display()))?;
        Ok(())
    }
}

impl TokenSlot for FileTokenSlot {
    fn read(&self) -> Result<Option<String>> {
        Ok(self.load_entries()?.remove(TOKEN_STORAGE_KEY))
    }

    fn write(&self, token: &str) -> Result<()> {
        let mut entries = self.load_entries().unwrap_or_default();
        entries.insert(TOKEN_STORAGE_KEY.to_string(), token.to_string());
        self.store_entries(&entries)
    }

    fn erase(&self) -> Result<()> {
        let mut entries = self.load_entries().unwrap_or_default();
        entries.remove(TOKEN_STORAGE_KEY);
        self.store_entries(&entries)
    }
}

#[derive(Default)]
pub struct MemoryTokenSlot {
    value: Mutex<Option<String>>,
}

impl MemoryTokenSlot {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenSlot for MemoryTokenSlot {
    fn read(&self) -> Result<Option<String>> {
        let value = self
            .value
            .lock()
            .map_err(|_| anyhow!("token slot lock poisoned"))?;
        Ok(value.clone())
    }

    fn write(&self, token: &str) -> Result<()> {
        let mut value = self
            .value
            .lock()
            .map_err(|_| anyhow!("token slot lock poisoned"))?;
        *value = Some(token.to_string());
        Ok(())
    }

    fn erase(&self) -> Result<()> {
        let mut value = self
            .value
            .lock()
            .map_err(|_| anyhow!("token slot lock poisoned"))?;
        *value = None;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// What a screen guarded by the session should do right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessGate {
    /// Identity unknown; do not redirect yet.
    Wait,
    RedirectToLogin,
    Proceed,
}

/// Outstanding identity validation for a restored token.
#[derive(Debug)]
pub struct ValidationTicket {
    epoch: u64,
    token: String,
}

impl ValidationTicket {
    pub fn token(&self) -> &str {
        &self.token
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Authenticated,
    Rejected,
    /// The session changed (login/logout) after the ticket was issued.
    Stale,
}

pub struct SessionStore {
    slot: Arc<dyn TokenSlot>,
    token: Option<String>,
    user: Option<User>,
    status: SessionStatus,
    epoch: u64,
    pending_validation: Option<u64>,
}

impl SessionStore {
    /// Reads the persisted token. Returns a ticket when that token still has
    /// to be validated against the server.
    pub fn start(slot: Arc<dyn TokenSlot>) -> (Self, Option<ValidationTicket>) {
        let persisted = match slot.read() {
            Ok(token) => token.filter(|token| !token.trim().is_empty()),
            Err(err) => {
                warn!("failed to read persisted session token: {err:#}");
                None
            }
        };

        let mut store = Self {
            slot,
            token: None,
            user: None,
            status: SessionStatus::Unauthenticated,
            epoch: 0,
            pending_validation: None,
        };

        let ticket = persisted.map(|token| {
            store.token = Some(token.clone());
            store.status = SessionStatus::Initializing;
            store.pending_validation = Some(store.epoch);
            debug!("restored session token; awaiting validation");
            ValidationTicket {
                epoch: store.epoch,
                token,
            }
        });
        (store, ticket)
    }

    /// Starts the store and runs the validation request to completion.
    pub async fn restore(slot: Arc<dyn TokenSlot>, api: &dyn RosterApi) -> Self {
        let (mut store, ticket) = Self::start(slot);
        if let Some(ticket) = ticket {
            let result = api.me(ticket.token()).await;
            store.complete_validation(ticket, result);
        }
        store
    }

    pub fn complete_validation(
        &mut self,
        ticket: ValidationTicket,
        result: Result<User, ClientError>,
    ) -> ValidationOutcome {
        if self.pending_validation != Some(ticket.epoch) {
            debug!(
                ticket_epoch = ticket.epoch,
                current_epoch = self.epoch,
                "discarding stale session validation"
            );
            return ValidationOutcome::Stale;
        }
        self.pending_validation = None;

        match result {
            Ok(user) => {
                info!(username = %user.username, "session validated");
                self.user = Some(user);
                self.status = SessionStatus::Authenticated;
                ValidationOutcome::Authenticated
            }
            Err(err) => {
                warn!("session validation failed: {err}");
                self.clear_and_erase();
                ValidationOutcome::Rejected
            }
        }
    }

    /// Trusts a token/user pair just returned by a successful login exchange.
    pub fn login(&mut self, token: String, user: User) -> Result<(), ClientError> {
        self.slot.write(&token).map_err(ClientError::storage)?;
        self.epoch += 1;
        self.pending_validation = None;
        info!(username = %user.username, "signed in");
        self.token = Some(token);
        self.user = Some(user);
        self.status = SessionStatus::Authenticated;
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), ClientError> {
        self.epoch += 1;
        self.pending_validation = None;
        self.token = None;
        self.user = None;
        self.status = SessionStatus::Unauthenticated;
        info!("signed out");
        self.slot.erase().map_err(ClientError::storage)
    }

    /// A request carrying the current token was rejected as unauthenticated.
    pub fn expire(&mut self) {
        if self.token.is_none() {
            return;
        }
        warn!("session token rejected by server; clearing session");
        self.epoch += 1;
        self.pending_validation = None;
        self.clear_and_erase();
    }

    fn clear_and_erase(&mut self) {
        self.token = None;
        self.user = None;
        self.status = SessionStatus::Unauthenticated;
        if let Err(err) = self.slot.erase() {
            warn!("failed to erase persisted session token: {err:#}");
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn loading(&self) -> bool {
        self.status == SessionStatus::Initializing && self.pending_validation.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// The token, only once the session is authenticated.
    pub fn token(&self) -> Option<&str> {
        match self.status {
            SessionStatus::Authenticated => self.token.as_deref(),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    pub fn gate(&self) -> AccessGate {
        if self.loading() {
            AccessGate::Wait
        } else if self.user.is_some() {
            AccessGate::Proceed
        } else {
            AccessGate::RedirectToLogin
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
