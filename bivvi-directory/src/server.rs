//! TCP accept loop and per-connection request framing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context as _;
use futures::{SinkExt as _, StreamExt as _};
use ldap3_proto::LdapCodec;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::challenge::{HostKeyChallenge, SshChallenge};
use crate::session::{SessionGuard, SessionManager};

/// The directory server: session table plus the host-key challenge used by
/// bind.  Connections are handled concurrently; requests within one
/// connection are serialized by the framing, and a response is written
/// before the next request is read.
pub struct DirectoryServer {
    pub(crate) sessions: SessionManager,
    pub(crate) challenge: Arc<dyn HostKeyChallenge>,
}

impl DirectoryServer {
    /// A server that authenticates binds with the live SSH probe.
    pub fn new() -> Self {
        Self::with_challenge(Arc::new(SshChallenge))
    }

    /// A server with a caller-supplied challenge implementation.
    pub fn with_challenge(challenge: Arc<dyn HostKeyChallenge>) -> Self {
        Self {
            sessions: SessionManager::new(),
            challenge,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Accept connections until `shutdown` resolves, then close the listener
    /// and let in-flight connections drain.
    pub async fn serve(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> anyhow::Result<()> {
        let local = listener.local_addr().context("listener local address")?;
        info!(addr = %local, "directory server listening");

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let server = Arc::clone(&self);
                        connections.spawn(server.handle_connection(stream, peer));
                    }
                    Err(err) => warn!("accept failed: {err}"),
                },
                _ = &mut shutdown => break,
            }
        }

        drop(listener);
        info!(in_flight = connections.len(), "listener closed, draining connections");
        while connections.join_next().await.is_some() {}
        Ok(())
    }

    /// One connection: read framed requests, write the responses for each,
    /// stop on unbind or I/O error.  The session guard removes this peer's
    /// session on every exit path.
    async fn handle_connection(self: Arc<Self>, stream: TcpStream, peer: SocketAddr) {
        debug!(peer = %peer, "connection opened");
        let _guard = SessionGuard::new(self.sessions.clone(), peer.to_string());
        let mut framed = Framed::new(stream, LdapCodec::default());

        'requests: while let Some(next) = framed.next().await {
            let msg = match next {
                Ok(msg) => msg,
                Err(err) => {
                    debug!(peer = %peer, "read error, closing connection: {err}");
                    break;
                }
            };

            let Some(responses) = self.dispatch(peer, msg).await else {
                break;
            };
            for response in responses {
                if let Err(err) = framed.send(response).await {
                    debug!(peer = %peer, "write error, closing connection: {err}");
                    break 'requests;
                }
            }
        }

        debug!(peer = %peer, "connection closed");
    }
}

impl Default for DirectoryServer {
    fn default() -> Self {
        Self::new()
    }
}
