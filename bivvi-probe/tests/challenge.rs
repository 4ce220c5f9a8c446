//! End-to-end challenge tests against in-process SSH servers.
//!
//! Each test stands up a russh server with a known host key and checks how
//! the probe classifies the resulting handshake.

use std::sync::Arc;
use std::time::Duration;

use bivvi_probe::{Outcome, ProbeError, validate_host_key};
use russh::server::{self, Auth, Server as _};
use ssh_key::{Algorithm, PrivateKey, PublicKey};

fn generate_keypair() -> (PrivateKey, PublicKey) {
    let private = PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ed25519).unwrap();
    let public = private.public_key().clone();
    (private, public)
}

fn server_config(host_key: PrivateKey) -> server::Config {
    server::Config {
        auth_rejection_time: Duration::ZERO,
        auth_rejection_time_initial: Some(Duration::ZERO),
        keys: vec![host_key],
        ..Default::default()
    }
}

/// A server that leaves every auth callback at its rejecting default — the
/// shape of a correctly configured host from the probe's point of view.
#[derive(Clone)]
struct RejectingServer;

struct RejectingHandler;

impl server::Server for RejectingServer {
    type Handler = RejectingHandler;

    fn new_client(&mut self, _peer: Option<std::net::SocketAddr>) -> RejectingHandler {
        RejectingHandler
    }
}

impl server::Handler for RejectingHandler {
    type Error = russh::Error;
}

/// A misconfigured server that lets anonymous clients straight in.
#[derive(Clone)]
struct AnonymousServer;

struct AnonymousHandler;

impl server::Server for AnonymousServer {
    type Handler = AnonymousHandler;

    fn new_client(&mut self, _peer: Option<std::net::SocketAddr>) -> AnonymousHandler {
        AnonymousHandler
    }
}

impl server::Handler for AnonymousHandler {
    type Error = russh::Error;

    async fn auth_none(&mut self, _user: &str) -> Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }
}

async fn spawn_server<S>(mut srv: S, host_key: PrivateKey) -> u16
where
    S: server::Server + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = Arc::new(server_config(host_key));
    tokio::spawn(async move {
        let _ = srv.run_on_socket(config, &listener).await;
    });
    port
}

#[tokio::test]
async fn validated_when_server_refuses_our_empty_auth() {
    let (private, public) = generate_keypair();
    let port = spawn_server(RejectingServer, private).await;

    let outcome = validate_host_key("127.0.0.1", port, &public).await.unwrap();
    assert_eq!(outcome, Outcome::Validated);
}

#[tokio::test]
async fn not_validated_when_host_key_differs() {
    let (private, _) = generate_keypair();
    let (_, wrong_public) = generate_keypair();
    let port = spawn_server(RejectingServer, private).await;

    let outcome = validate_host_key("127.0.0.1", port, &wrong_public)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NotValidated);
}

#[tokio::test]
async fn illegal_success_when_server_accepts_anonymous_clients() {
    let (private, public) = generate_keypair();
    let port = spawn_server(AnonymousServer, private).await;

    let err = validate_host_key("127.0.0.1", port, &public)
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::IllegalSuccess), "got {err:?}");
}

#[tokio::test]
async fn unreachable_when_nothing_is_listening() {
    let (_, public) = generate_keypair();

    // Bind to learn a free port, then release it before probing.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = validate_host_key("127.0.0.1", port, &public)
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Unreachable(_)), "got {err:?}");
}

#[tokio::test]
async fn repeated_probes_are_stateless() {
    let (private, public) = generate_keypair();
    let port = spawn_server(RejectingServer, private).await;

    for _ in 0..3 {
        let outcome = validate_host_key("127.0.0.1", port, &public).await.unwrap();
        assert_eq!(outcome, Outcome::Validated);
    }
}
