//! The challenge itself: connect, handshake, classify the failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use russh::client::{self, AuthResult};
use ssh_key::PublicKey;
use tokio::net::TcpStream;
use tracing::debug;

use bivvi_core::keys::marshal_authorized_key;

/// What the challenge concluded about key ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The server completed key exchange with the expected host key and then
    /// refused our empty authentication — it controls the private key.
    Validated,
    /// The server presented a different host key.  Authoritative refusal.
    NotValidated,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// TCP connect (including name resolution) failed; nothing was learned
    /// about the key.
    #[error("ssh endpoint unreachable: {0}")]
    Unreachable(#[source] std::io::Error),

    /// The server dropped the connection after transport setup instead of
    /// answering our authentication request.  `host_key_matched` records
    /// whether key exchange got far enough to verify the host key; callers
    /// must treat this bucket as a lookup failure either way.
    #[error("server may not be accepting auth methods")]
    Inconclusive { host_key_matched: bool },

    /// The handshake completed with no credentials offered.  A server that
    /// lets anonymous clients in proves nothing about key ownership.
    #[error("connection succeeded illegally")]
    IllegalSuccess,

    /// Any other handshake failure (version exchange, algorithm mismatch...).
    #[error("ssh handshake failed: {0}")]
    Handshake(#[source] russh::Error),
}

struct ChallengeHandler {
    expected: PublicKey,
    matched: Arc<AtomicBool>,
}

impl client::Handler for ChallengeHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        // Byte equality of the canonical authorized-keys encodings; a key
        // that cannot be re-marshalled counts as a mismatch.
        let matched = match (
            marshal_authorized_key(&self.expected),
            marshal_authorized_key(server_public_key),
        ) {
            (Ok(expected), Ok(offered)) => expected == offered,
            _ => false,
        };
        self.matched.store(matched, Ordering::SeqCst);

        if matched {
            debug!("host key matches the expected key, proceeding");
        } else {
            debug!("host key does not match the expected key, aborting handshake");
        }
        Ok(matched)
    }
}

/// Challenge the SSH server at `host:port` to prove it holds the private key
/// for `expected`.
///
/// Classification, in order:
/// 1. handshake aborted by our host-key callback → `Ok(NotValidated)`;
/// 2. key matched and the server refused our empty auth → `Ok(Validated)`;
/// 3. reset/EOF after transport setup → [`ProbeError::Inconclusive`];
/// 4. TCP connect failure → [`ProbeError::Unreachable`];
/// 5. authentication unexpectedly succeeded → [`ProbeError::IllegalSuccess`].
pub async fn validate_host_key(
    host: &str,
    port: u16,
    expected: &PublicKey,
) -> Result<Outcome, ProbeError> {
    debug!(host, port, "opening TCP connection for host-key challenge");
    let stream = TcpStream::connect((host, port))
        .await
        .map_err(ProbeError::Unreachable)?;

    let matched = Arc::new(AtomicBool::new(false));
    let handler = ChallengeHandler {
        expected: expected.clone(),
        matched: Arc::clone(&matched),
    };

    let config = Arc::new(client::Config::default());
    let mut handle = match client::connect_stream(config, stream, handler).await {
        Ok(handle) => handle,
        Err(russh::Error::UnknownKey) => {
            // Our callback rejected the offered key.
            debug!(host, port, "wrong host key presented");
            return Ok(Outcome::NotValidated);
        }
        Err(russh::Error::Disconnect) | Err(russh::Error::IO(_)) => {
            debug!(host, port, "connection dropped during handshake");
            return Err(ProbeError::Inconclusive {
                host_key_matched: matched.load(Ordering::SeqCst),
            });
        }
        Err(err) => return Err(ProbeError::Handshake(err)),
    };

    let auth = handle.authenticate_none("bivvi").await;

    let outcome = match auth {
        Ok(AuthResult::Failure { .. }) => {
            // Key exchange succeeded against the expected key; the refusal of
            // our empty method list is the proof we wanted.
            debug!(host, port, "host key validated");
            Ok(Outcome::Validated)
        }
        Ok(AuthResult::Success) => Err(ProbeError::IllegalSuccess),
        Err(russh::Error::Disconnect) | Err(russh::Error::IO(_)) => Err(ProbeError::Inconclusive {
            host_key_matched: matched.load(Ordering::SeqCst),
        }),
        Err(err) => Err(ProbeError::Handshake(err)),
    };

    let _ = handle
        .disconnect(russh::Disconnect::ByApplication, "challenge complete", "en")
        .await;

    outcome
}
