//! Seam between the directory server and the SSH host-key challenge.
//!
//! The bind handler talks to a [`HostKeyChallenge`] trait object so tests can
//! substitute a canned verdict; the production implementation is a thin
//! wrapper around `bivvi-probe`.

use async_trait::async_trait;
use ssh_key::PublicKey;

pub use bivvi_probe::{Outcome, ProbeError};

#[async_trait]
pub trait HostKeyChallenge: Send + Sync {
    /// Challenge `host:port` to prove ownership of `expected`.
    async fn validate(
        &self,
        host: &str,
        port: u16,
        expected: &PublicKey,
    ) -> Result<Outcome, ProbeError>;
}

/// The live probe: a fresh SSH handshake per call.
#[derive(Debug, Default)]
pub struct SshChallenge;

#[async_trait]
impl HostKeyChallenge for SshChallenge {
    async fn validate(
        &self,
        host: &str,
        port: u16,
        expected: &PublicKey,
    ) -> Result<Outcome, ProbeError> {
        bivvi_probe::validate_host_key(host, port, expected).await
    }
}
