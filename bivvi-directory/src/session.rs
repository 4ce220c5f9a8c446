//! Per-connection session table.
//!
//! The only shared mutable state in the server: a map from a connection's
//! peer-address string to the canonical DN it bound as.  Written by the bind
//! handler, read by WhoAmI, and removed by a [`SessionGuard`] when the
//! connection handler exits — on any path, including panics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The session table lock was poisoned by a panicking writer.
#[derive(Debug, thiserror::Error)]
#[error("session table lock poisoned")]
pub struct SessionPoisoned;

#[derive(Debug, Default, Clone)]
pub struct SessionManager {
    sessions: Arc<Mutex<HashMap<String, String>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful bind.  Last write wins for a given peer.
    pub fn bind(&self, peer: &str, canonical_dn: String) -> Result<(), SessionPoisoned> {
        let mut sessions = self.sessions.lock().map_err(|_| SessionPoisoned)?;
        sessions.insert(peer.to_string(), canonical_dn);
        Ok(())
    }

    /// The canonical DN bound on this peer's connection, if any.
    pub fn bound_dn(&self, peer: &str) -> Result<Option<String>, SessionPoisoned> {
        let sessions = self.sessions.lock().map_err(|_| SessionPoisoned)?;
        Ok(sessions.get(peer).cloned())
    }

    /// Drop the session for a peer.  Removing an absent peer is a no-op.
    pub fn remove(&self, peer: &str) -> Result<(), SessionPoisoned> {
        let mut sessions = self.sessions.lock().map_err(|_| SessionPoisoned)?;
        sessions.remove(peer);
        Ok(())
    }

    pub fn count(&self) -> Result<usize, SessionPoisoned> {
        let sessions = self.sessions.lock().map_err(|_| SessionPoisoned)?;
        Ok(sessions.len())
    }
}

/// Removes a peer's session when dropped, tying session lifetime to the
/// connection handler's scope.
pub struct SessionGuard {
    sessions: SessionManager,
    peer: String,
}

impl SessionGuard {
    pub fn new(sessions: SessionManager, peer: String) -> Self {
        Self { sessions, peer }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        // A poisoned table cannot be cleaned further; nothing to do.
        let _ = self.sessions.remove(&self.peer);
    }
}
