//! LDAP front-end for bivvi.
//!
//! Serves a small subset of LDAP v3 — simple bind, base-object search and
//! the RFC 4532 WhoAmI extended operation — over plain TCP.  There is no
//! user database: the distinguished name carries a full SSH public key and
//! every attribute of the one entry we serve is derived from it.
//!
//! ```text
//! DN:       cn=<authorized-keys line>,ou=campers,dc=0_1_0,dc=bivvi
//! Password: <host>:<port> of an SSH server whose host key is that key
//! ```
//!
//! # Authentication flow
//!
//! 1. The client binds with the DN above and a `host:port` password.
//! 2. The host must equal the client's own connection address — you cannot
//!    authenticate with someone else's SSH server.
//! 3. The server proves key ownership with an SSH host-key challenge
//!    (`bivvi-probe`) against that endpoint.
//! 4. On success the canonicalized DN is recorded for the connection and
//!    WhoAmI reports it; searches synthesize the entry on demand and work
//!    without a bind.

pub mod challenge;
pub mod dn;
mod handler;
pub mod server;
pub mod session;

pub use challenge::{HostKeyChallenge, SshChallenge};
pub use handler::WHOAMI_OID;
pub use server::DirectoryServer;
pub use session::SessionManager;
