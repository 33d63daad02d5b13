//! Shared application state.
//!
//! `CoreState` owns the runtime configuration and the table of operator
//! sessions issued by the login endpoint. Every request opens its own
//! SQLite connection through `open_db()`; nothing database-related is
//! cached between requests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::config::AppConfig;
use crate::db;

/// An authenticated operator session, keyed by the SHA-256 of its bearer token.
#[derive(Debug, Clone)]
pub struct OperatorSession {
    pub username: String,
    pub expires_at: Instant,
}

pub struct CoreState {
    pub config: AppConfig,
    /// Token hash → session. Raw tokens are never stored.
    sessions: RwLock<HashMap<[u8; 32], OperatorSession>>,
}

impl CoreState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.config.db_path
    }

    /// Open a fresh connection with migrations applied.
    pub fn open_db(&self) -> Result<rusqlite::Connection, CoreError> {
        db::open_database(self.db_path()).map_err(CoreError::Database)
    }

    /// Create the database file and bring the schema up to date.
    pub fn initialize(&self) -> Result<(), CoreError> {
        let conn = self.open_db()?;
        let tables = db::count_tables(&conn)?;
        tracing::info!(path = %self.db_path().display(), tables, "Database ready");
        Ok(())
    }

    /// Register a session for `token_hash`, valid for the configured TTL.
    pub fn start_session(&self, token_hash: [u8; 32], username: &str) -> Result<(), CoreError> {
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        let now = Instant::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            token_hash,
            OperatorSession {
                username: username.to_string(),
                expires_at: now + self.config.session_ttl,
            },
        );
        Ok(())
    }

    /// Resolve a token hash to its session. Expired sessions are dropped.
    pub fn session_for(&self, token_hash: &[u8; 32]) -> Result<Option<OperatorSession>, CoreError> {
        {
            let sessions = self.sessions.read().map_err(|_| CoreError::LockPoisoned)?;
            match sessions.get(token_hash) {
                None => return Ok(None),
                Some(s) if s.expires_at > Instant::now() => return Ok(Some(s.clone())),
                Some(_) => {}
            }
        }
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        sessions.remove(token_hash);
        Ok(None)
    }

    /// Revoke a session. Returns whether one existed.
    pub fn end_session(&self, token_hash: &[u8; 32]) -> Result<bool, CoreError> {
        let mut sessions = self.sessions.write().map_err(|_| CoreError::LockPoisoned)?;
        Ok(sessions.remove(token_hash).is_some())
    }

    pub fn active_sessions(&self) -> Result<usize, CoreError> {
        let sessions = self.sessions.read().map_err(|_| CoreError::LockPoisoned)?;
        let now = Instant::now();
        Ok(sessions.values().filter(|s| s.expires_at > now).count())
    }

    pub fn session_ttl(&self) -> Duration {
        self.config.session_ttl
    }
}

// ═══════════════════════════════════════════════════════════
// Error types
// ═══════════════════════════════════════════════════════════

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
}
