//! Request handlers: bind, search and the WhoAmI extended operation.
//!
//! Each handler is a result-returning pipeline.  Expected rejections produce
//! a protocol response themselves; only genuine faults bubble up as errors,
//! which the dispatcher translates into `OperationsError` so that a response
//! is always written.

use std::net::SocketAddr;

use anyhow::Context as _;
use ldap3_proto::proto::{
    LdapBindCred, LdapBindRequest, LdapBindResponse, LdapExtendedRequest, LdapExtendedResponse,
    LdapMsg, LdapOp, LdapPartialAttribute, LdapResult, LdapResultCode, LdapSearchRequest,
    LdapSearchResultEntry, LdapSearchScope,
};
use ssh_key::HashAlg;
use tracing::{debug, info, warn};

use bivvi_core::Identity;
use bivvi_core::keys::parse_authorized_key;

use crate::challenge::Outcome;
use crate::dn::{canonical_dn, extract_cn};
use crate::server::DirectoryServer;

/// RFC 4532 "Who am I?" extended operation.
pub const WHOAMI_OID: &str = "1.3.6.1.4.1.4203.1.11.3";

fn ldap_msg(msgid: i32, op: LdapOp) -> LdapMsg {
    LdapMsg {
        msgid,
        op,
        ctrl: Vec::new(),
    }
}

fn result_of(code: LdapResultCode, message: impl Into<String>) -> LdapResult {
    LdapResult {
        code,
        matcheddn: String::new(),
        message: message.into(),
        referral: Vec::new(),
    }
}

fn bind_response(msgid: i32, code: LdapResultCode, message: impl Into<String>) -> LdapMsg {
    ldap_msg(
        msgid,
        LdapOp::BindResponse(LdapBindResponse {
            res: result_of(code, message),
            saslcreds: None,
        }),
    )
}

fn search_done(msgid: i32, code: LdapResultCode, message: impl Into<String>) -> LdapMsg {
    ldap_msg(msgid, LdapOp::SearchResultDone(result_of(code, message)))
}

fn extended_response(
    msgid: i32,
    code: LdapResultCode,
    message: impl Into<String>,
    name: Option<String>,
    value: Option<Vec<u8>>,
) -> LdapMsg {
    ldap_msg(
        msgid,
        LdapOp::ExtendedResponse(LdapExtendedResponse {
            res: result_of(code, message),
            name,
            value,
        }),
    )
}

fn attr(name: impl Into<String>, vals: &[&str]) -> LdapPartialAttribute {
    LdapPartialAttribute {
        atype: name.into(),
        vals: vals.iter().map(|v| v.as_bytes().to_vec()).collect(),
    }
}

impl DirectoryServer {
    /// Route one request to its handler and convert handler faults into the
    /// operation's `OperationsError` response.  `None` ends the connection.
    pub(crate) async fn dispatch(&self, peer: SocketAddr, msg: LdapMsg) -> Option<Vec<LdapMsg>> {
        let msgid = msg.msgid;
        match msg.op {
            LdapOp::BindRequest(req) => Some(match self.handle_bind(peer, msgid, req).await {
                Ok(responses) => responses,
                Err(err) => {
                    warn!(peer = %peer, "bind handler fault: {err:#}");
                    vec![bind_response(
                        msgid,
                        LdapResultCode::OperationsError,
                        format!("Internal error: {err}"),
                    )]
                }
            }),
            LdapOp::SearchRequest(req) => Some(match self.handle_search(peer, msgid, req) {
                Ok(responses) => responses,
                Err(err) => {
                    warn!(peer = %peer, "search handler fault: {err:#}");
                    vec![search_done(
                        msgid,
                        LdapResultCode::OperationsError,
                        format!("Internal error: {err}"),
                    )]
                }
            }),
            LdapOp::ExtendedRequest(req) => Some(match self.handle_extended(peer, msgid, req) {
                Ok(responses) => responses,
                Err(err) => {
                    warn!(peer = %peer, "extended handler fault: {err:#}");
                    vec![extended_response(
                        msgid,
                        LdapResultCode::OperationsError,
                        format!("Internal error: {err}"),
                        None,
                        None,
                    )]
                }
            }),
            LdapOp::UnbindRequest => {
                debug!(peer = %peer, "unbind, closing connection");
                None
            }
            LdapOp::AbandonRequest(_) => Some(Vec::new()),
            LdapOp::ModifyRequest(_) => Some(vec![ldap_msg(
                msgid,
                LdapOp::ModifyResponse(result_of(
                    LdapResultCode::UnwillingToPerform,
                    "directory is read-only",
                )),
            )]),
            LdapOp::AddRequest(_) => Some(vec![ldap_msg(
                msgid,
                LdapOp::AddResponse(result_of(
                    LdapResultCode::UnwillingToPerform,
                    "directory is read-only",
                )),
            )]),
            LdapOp::DelRequest(_) => Some(vec![ldap_msg(
                msgid,
                LdapOp::DelResponse(result_of(
                    LdapResultCode::UnwillingToPerform,
                    "directory is read-only",
                )),
            )]),
            other => {
                warn!(peer = %peer, "unsupported operation {other:?}, closing connection");
                None
            }
        }
    }

    /// Simple bind: prove key ownership via the SSH host-key challenge.
    ///
    /// The password carries `host:port` of the client's own SSH server; the
    /// host must equal the connection's peer address so a client cannot lean
    /// on someone else's SSH endpoint.
    async fn handle_bind(
        &self,
        peer: SocketAddr,
        msgid: i32,
        req: LdapBindRequest,
    ) -> anyhow::Result<Vec<LdapMsg>> {
        info!(peer = %peer, "bind attempt");

        let reject = |message: String| {
            warn!(peer = %peer, "bind rejected: {message}");
            Ok(vec![bind_response(
                msgid,
                LdapResultCode::InvalidCredentials,
                message,
            )])
        };

        let password = match req.cred {
            LdapBindCred::Simple(password) => password,
            _ => return reject("simple authentication required".to_string()),
        };

        let Some((host_raw, port_str)) = password.rsplit_once(':') else {
            return reject("Invalid host:port format: missing port in address".to_string());
        };
        let port = match port_str.parse::<u32>() {
            Ok(port) if (1..=65535).contains(&port) => port as u16,
            Ok(port) => return reject(format!("Invalid port: {port}")),
            Err(_) => return reject(format!("Invalid port: {port_str}")),
        };
        // IPv6 literals arrive bracketed in host:port form.
        let host = host_raw
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host_raw);

        let client_host = peer.ip().to_string();
        if client_host != host {
            return reject("Client host does not match the host in the password".to_string());
        }

        let cn = match extract_cn(&req.dn) {
            Ok(cn) => cn,
            Err(err) => return reject(format!("Invalid DN format: {err}")),
        };
        let key = match parse_authorized_key(cn) {
            Ok(key) => key,
            Err(err) => return reject(format!("Invalid SSH key: {err}")),
        };

        let fingerprint = key.fingerprint(HashAlg::Sha256);
        info!(
            peer = %peer,
            key = %key.algorithm(),
            fingerprint = %fingerprint,
            host,
            port,
            "validating key against SSH endpoint"
        );

        match self.challenge.validate(host, port, &key).await {
            Ok(Outcome::Validated) => {}
            Ok(Outcome::NotValidated) => {
                return reject("SSH validation failed: server public key did not match".to_string());
            }
            Err(err) => return reject(format!("SSH validation failed: {err}")),
        }

        let canonical = canonical_dn(&key).context("canonicalize bound DN")?;
        self.sessions.bind(&peer.to_string(), canonical)?;

        info!(peer = %peer, fingerprint = %fingerprint, "bind accepted");
        Ok(vec![bind_response(msgid, LdapResultCode::Success, "")])
    }

    /// Base-object search: synthesize the one entry for the key in the base
    /// DN.  Requires no prior bind.
    fn handle_search(
        &self,
        peer: SocketAddr,
        msgid: i32,
        req: LdapSearchRequest,
    ) -> anyhow::Result<Vec<LdapMsg>> {
        info!(peer = %peer, base = %req.base, "search request");

        let cn = match extract_cn(&req.base) {
            Ok(cn) => cn,
            Err(err) => {
                warn!(peer = %peer, "search rejected: invalid DN: {err}");
                return Ok(vec![search_done(
                    msgid,
                    LdapResultCode::InvalidDNSyntax,
                    format!("Invalid DN format: {err}"),
                )]);
            }
        };
        let key = match parse_authorized_key(cn) {
            Ok(key) => key,
            Err(err) => {
                warn!(peer = %peer, "search rejected: invalid SSH key: {err}");
                return Ok(vec![search_done(
                    msgid,
                    LdapResultCode::InvalidDNSyntax,
                    format!("Invalid SSH key: {err}"),
                )]);
            }
        };

        if !matches!(req.scope, LdapSearchScope::Base) {
            debug!(peer = %peer, "non-base scope requested, serving the base entry");
        }

        let identity = Identity::from_public_key(&key).context("derive identity")?;
        info!(
            peer = %peer,
            key = %key.algorithm(),
            fingerprint = %key.fingerprint(HashAlg::Sha256),
            uid = %identity.username(),
            "returning derived attributes"
        );

        let mut attributes = vec![
            attr("objectClass", &["inetOrgPerson", "posixAccount"]),
            attr("uid", &[identity.username().as_str()]),
            attr("uidNumber", &[identity.posix_user_id().to_string().as_str()]),
            attr("gidNumber", &[identity.gid_number().to_string().as_str()]),
            attr("homeDirectory", &[identity.home_directory().as_str()]),
            attr("telephoneNumber", &[identity.phone_number().as_str()]),
            attr("displayName", &[identity.display_name("en")]),
            attr("cn", &[identity.display_name("en")]),
        ];
        for locale in identity.supported_locales() {
            attributes.push(attr(
                format!("displayName;lang-{locale}"),
                &[identity.display_name(locale)],
            ));
        }

        Ok(vec![
            ldap_msg(
                msgid,
                LdapOp::SearchResultEntry(LdapSearchResultEntry {
                    dn: req.base.clone(),
                    attributes,
                }),
            ),
            search_done(msgid, LdapResultCode::Success, ""),
        ])
    }

    /// WhoAmI: report the DN bound on this connection, if any.
    fn handle_extended(
        &self,
        peer: SocketAddr,
        msgid: i32,
        req: LdapExtendedRequest,
    ) -> anyhow::Result<Vec<LdapMsg>> {
        info!(peer = %peer, oid = %req.name, "extended operation");

        if req.name != WHOAMI_OID {
            return Ok(vec![extended_response(
                msgid,
                LdapResultCode::UnwillingToPerform,
                format!("Extended operation {} not supported", req.name),
                None,
                None,
            )]);
        }

        match self.sessions.bound_dn(&peer.to_string())? {
            None => {
                debug!(peer = %peer, "whoami without a bound session");
                Ok(vec![extended_response(
                    msgid,
                    LdapResultCode::OperationsError,
                    "not authenticated - no bound session",
                    None,
                    None,
                )])
            }
            Some(dn) => {
                let authz_id = format!("dn:{dn}");
                info!(peer = %peer, authz_id = %authz_id, "whoami");
                Ok(vec![extended_response(
                    msgid,
                    LdapResultCode::Success,
                    "",
                    Some(WHOAMI_OID.to_string()),
                    Some(authz_id.into_bytes()),
                )])
            }
        }
    }
}
