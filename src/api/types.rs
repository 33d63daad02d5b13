//! Shared types for the REST API layer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::core_state::CoreState;

/// Consecutive failed logins before a source is locked out.
const MAX_LOGIN_FAILURES: u32 = 5;
/// Lockout duration once the failure limit is reached.
const LOCKOUT_SECS: u64 = 5 * 60;
/// Upper bound on tracked usernames; unlocked entries are evicted past it.
const MAX_TRACKED_SOURCES: usize = 1024;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Wraps `CoreState` plus API-specific caches.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
    pub login_lockout: Arc<Mutex<LoginLockout>>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self {
            core,
            login_lockout: Arc::new(Mutex::new(LoginLockout::new())),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// User context: injected by auth middleware
// ═══════════════════════════════════════════════════════════

/// Authenticated operator, injected into request extensions
/// by the auth middleware after successful token validation.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub username: String,
    pub token_hash: [u8; 32],
}

// ═══════════════════════════════════════════════════════════
// Tokens
// ═══════════════════════════════════════════════════════════

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

// ═══════════════════════════════════════════════════════════
// Login lockout: per-username failure counter
// ═══════════════════════════════════════════════════════════

struct FailureWindow {
    failures: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

impl FailureWindow {
    /// Still relevant: locked, or failed recently enough to count.
    fn is_live(&self, now: Instant, window: Duration) -> bool {
        match self.locked_until {
            Some(until) => until > now,
            None => now.duration_since(self.last_failure) < window,
        }
    }
}

/// Counts consecutive failed logins per source and locks the source
/// out for a fixed period once the limit is hit.
pub struct LoginLockout {
    sources: HashMap<String, FailureWindow>,
    max_failures: u32,
    lockout: Duration,
}

impl LoginLockout {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
            max_failures: MAX_LOGIN_FAILURES,
            lockout: Duration::from_secs(LOCKOUT_SECS),
        }
    }

    /// `Err(retry_after_secs)` while the source is locked out.
    pub fn check(&mut self, source: &str) -> Result<(), u64> {
        let now = Instant::now();
        let Some(locked_until) = self.sources.get(source).map(|w| w.locked_until) else {
            return Ok(());
        };
        match locked_until {
            Some(until) if until > now => Err((until - now).as_secs().max(1)),
            Some(_) => {
                // Lockout elapsed, start over
                self.sources.remove(source);
                Ok(())
            }
            None => Ok(()),
        }
    }

    pub fn record_failure(&mut self, source: &str) {
        let now = Instant::now();
        self.prune(now);

        let window = self
            .sources
            .entry(source.to_string())
            .or_insert(FailureWindow {
                failures: 0,
                last_failure: now,
                locked_until: None,
            });
        window.failures += 1;
        window.last_failure = now;
        if window.failures >= self.max_failures {
            window.locked_until = Some(Instant::now() + self.lockout);
            tracing::warn!(source, failures = window.failures, "Login locked out");
        }
    }

    pub fn clear(&mut self, source: &str) {
        self.sources.remove(source);
    }

    /// Drop stale entries. Past the cap, unlocked counters go too.
    fn prune(&mut self, now: Instant) {
        let window = self.lockout;
        self.sources.retain(|_, w| w.is_live(now, window));
        if self.sources.len() >= MAX_TRACKED_SOURCES {
            self.sources.retain(|_, w| w.locked_until.is_some());
        }
    }

    pub fn tracked(&self) -> usize {
        self.sources.len()
    }
}

impl Default for LoginLockout {
    fn default() -> Self {
        Self::new()
    }
}
