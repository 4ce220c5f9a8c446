//! Shared helpers: an in-process SSH endpoint, a directory server runner and
//! a minimal framed LDAP client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt as _, StreamExt as _};
use ldap3_proto::LdapCodec;
use ldap3_proto::proto::{
    LdapBindCred, LdapBindRequest, LdapDerefAliases, LdapExtendedRequest, LdapExtendedResponse,
    LdapFilter, LdapMsg, LdapOp, LdapResult, LdapSearchRequest, LdapSearchResultEntry,
    LdapSearchScope,
};
use russh::server::{self, Auth, Server as _};
use ssh_key::{Algorithm, PrivateKey, PublicKey};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use bivvi_directory::{DirectoryServer, WHOAMI_OID};

/// Pinned RSA-2048 fixture shared with the unit tests.
pub const TEST_KEY: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQCqMQOAqYhVGXxLRjZUVE6cZ6gEYQhYKrRsP0aIBijHWyPGo+ccDwHwsZ5PBhF4UNOGkGgPZt6NHhgl0G4qEGWVtZVhr5dX8NGxwm/ZQYxhj1WV0WldkxGxzb9KG6sQqpD7YZxPkEwVZI2bJA3h0qcOi4/FOY+bL5YAHzTK9QMqrnZcVx3UhGI9h2Gpk2LJJ8xvQPPPbUPHwNzxDuL3UHqPOwQYVixG29NMGXqA4QdDPpH4Poff7hR1sGPxULPKaefhysQ0qz1ezhYQxCjzKIGOwgwYvxgk1JtNp3EKZLtl1B2nwUY9Uu7p44TH/JvJBCkkKiIYbV8Tj8NkH9jskG5v test@bivvi";

pub fn generate_keypair() -> (PrivateKey, PublicKey) {
    let private = PrivateKey::random(&mut rand::rngs::OsRng, Algorithm::Ed25519).unwrap();
    let public = private.public_key().clone();
    (private, public)
}

// ---------------------------------------------------------------------------
// In-process SSH endpoint
// ---------------------------------------------------------------------------

/// An SSH server that would accept any public key but refuses everything
/// else — the shape of a user's own identity endpoint.
#[derive(Clone)]
struct AcceptKeysServer;

struct AcceptKeysHandler;

impl server::Server for AcceptKeysServer {
    type Handler = AcceptKeysHandler;

    fn new_client(&mut self, _peer: Option<SocketAddr>) -> AcceptKeysHandler {
        AcceptKeysHandler
    }
}

impl server::Handler for AcceptKeysHandler {
    type Error = russh::Error;

    async fn auth_publickey(
        &mut self,
        _user: &str,
        _public_key: &PublicKey,
    ) -> Result<Auth, Self::Error> {
        Ok(Auth::Accept)
    }
}

/// Start an SSH server whose host key is `host_key`; returns its port.
pub async fn spawn_ssh_server(host_key: PrivateKey) -> u16 {
    let config = Arc::new(server::Config {
        auth_rejection_time: Duration::ZERO,
        auth_rejection_time_initial: Some(Duration::ZERO),
        keys: vec![host_key],
        ..Default::default()
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut ssh = AcceptKeysServer;
    tokio::spawn(async move {
        let _ = ssh.run_on_socket(config, &listener).await;
    });
    port
}

// ---------------------------------------------------------------------------
// Directory server runner
// ---------------------------------------------------------------------------

/// Run `server` on an ephemeral port; connections drain when the test's
/// runtime shuts down.
pub async fn spawn_directory(server: DirectoryServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(Arc::new(server).serve(listener, std::future::pending()));
    addr
}

// ---------------------------------------------------------------------------
// Framed LDAP client
// ---------------------------------------------------------------------------

pub struct LdapClient {
    framed: Framed<TcpStream, LdapCodec>,
    next_msgid: i32,
}

impl LdapClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to directory");
        Self {
            framed: Framed::new(stream, LdapCodec::default()),
            next_msgid: 0,
        }
    }

    async fn send(&mut self, op: LdapOp) {
        self.next_msgid += 1;
        let msg = LdapMsg {
            msgid: self.next_msgid,
            op,
            ctrl: Vec::new(),
        };
        self.framed.send(msg).await.expect("send request");
    }

    async fn recv(&mut self) -> LdapMsg {
        self.framed
            .next()
            .await
            .expect("server closed the connection")
            .expect("decode response")
    }

    pub async fn simple_bind(&mut self, dn: &str, password: &str) -> LdapResult {
        self.send(LdapOp::BindRequest(LdapBindRequest {
            dn: dn.to_string(),
            cred: LdapBindCred::Simple(password.to_string()),
        }))
        .await;

        match self.recv().await.op {
            LdapOp::BindResponse(resp) => resp.res,
            other => panic!("expected BindResponse, got {other:?}"),
        }
    }

    pub async fn search_base(&mut self, base: &str) -> (Vec<LdapSearchResultEntry>, LdapResult) {
        self.send(LdapOp::SearchRequest(LdapSearchRequest {
            base: base.to_string(),
            scope: LdapSearchScope::Base,
            aliases: LdapDerefAliases::Never,
            sizelimit: 0,
            timelimit: 0,
            typesonly: false,
            filter: LdapFilter::Present("objectClass".to_string()),
            attrs: Vec::new(),
        }))
        .await;

        let mut entries = Vec::new();
        loop {
            match self.recv().await.op {
                LdapOp::SearchResultEntry(entry) => entries.push(entry),
                LdapOp::SearchResultDone(result) => return (entries, result),
                other => panic!("unexpected search response {other:?}"),
            }
        }
    }

    pub async fn whoami(&mut self) -> LdapExtendedResponse {
        self.send(LdapOp::ExtendedRequest(LdapExtendedRequest {
            name: WHOAMI_OID.to_string(),
            value: None,
        }))
        .await;

        match self.recv().await.op {
            LdapOp::ExtendedResponse(resp) => resp,
            other => panic!("expected ExtendedResponse, got {other:?}"),
        }
    }
}

/// Attribute values of `name` in the entry, decoded as UTF-8.
pub fn attr_values(entry: &LdapSearchResultEntry, name: &str) -> Vec<String> {
    entry
        .attributes
        .iter()
        .find(|a| a.atype == name)
        .map(|a| {
            a.vals
                .iter()
                .map(|v| String::from_utf8(v.clone()).unwrap())
                .collect()
        })
        .unwrap_or_default()
}
