//! SSH host-key challenge: prove that the server at `host:port` controls the
//! private half of an expected public key, without holding any credentials.
//!
//! # How the proof works
//!
//! A correctly configured SSH server binds its host key into the exchange
//! hash and signs it *before* it evaluates authentication.  So the probe runs
//! a client handshake offering no usable auth method: a server holding the
//! matching private key completes key exchange (our host-key callback sees
//! the real key) and then refuses our empty method list, while an impostor
//! fails the signature check inside key exchange and never reaches
//! authentication.  Success is therefore inferred from the *kind* of failure
//! — the handshake never completes legitimately.
//!
//! The probe is stateless: one fresh TCP connection per call, the expected
//! key supplied explicitly, no host-key caching.

mod challenge;

pub use challenge::{validate_host_key, Outcome, ProbeError};
