//! The fixed four-component distinguished-name schema.
//!
//! Every DN this server understands has the shape
//! `cn=<authorized-keys line>,ou=campers,dc=0_1_0,dc=bivvi`.  Parsing splits
//! on bare commas — the authorized-keys grammar cannot produce a comma in
//! the algorithm or base-64 body, and comments with commas are not supported.
//! This is *not* a general-purpose RFC 4514 parser and no quoting or
//! escaping is recognised.

use ssh_key::PublicKey;

use bivvi_core::keys::marshal_authorized_key;

const OU: &str = "ou=campers";
const DC_VERSION: &str = "dc=0_1_0";
const DC_ROOT: &str = "dc=bivvi";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DnError {
    #[error("DN must start with cn=")]
    MissingCnPrefix,
    #[error("DN must have exactly 4 parts")]
    WrongPartCount,
    #[error("second part must be ou=campers")]
    WrongOu,
    #[error("third part must be dc=0_1_0")]
    WrongVersionDc,
    #[error("fourth part must be dc=bivvi")]
    WrongRootDc,
}

/// Extract the `cn=` value from a schema-conforming DN.
pub fn extract_cn(dn: &str) -> Result<&str, DnError> {
    if !dn.starts_with("cn=") {
        return Err(DnError::MissingCnPrefix);
    }
    let parts: Vec<&str> = dn.split(',').collect();
    if parts.len() != 4 {
        return Err(DnError::WrongPartCount);
    }
    if parts[1] != OU {
        return Err(DnError::WrongOu);
    }
    if parts[2] != DC_VERSION {
        return Err(DnError::WrongVersionDc);
    }
    if parts[3] != DC_ROOT {
        return Err(DnError::WrongRootDc);
    }
    Ok(&parts[0]["cn=".len()..])
}

/// The canonical DN for a key: the re-marshalled authorized-keys form (no
/// comment, no trailing whitespace) inside the fixed suffix.
///
/// Fully determined by the key — two bindings with bit-identical keys yield
/// byte-identical canonical names.
pub fn canonical_dn(key: &PublicKey) -> Result<String, ssh_key::Error> {
    Ok(format!(
        "cn={},{OU},{DC_VERSION},{DC_ROOT}",
        marshal_authorized_key(key)?
    ))
}
