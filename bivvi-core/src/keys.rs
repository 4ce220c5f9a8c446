//! Authorized-keys parsing and canonical marshalling.
//!
//! The directory schema embeds public keys verbatim inside distinguished
//! names, so everything that compares or re-forms a key goes through the one
//! canonical form produced here: `<algorithm> <base64>` with the comment
//! cleared and no surrounding whitespace.

use ssh_key::PublicKey;

/// Parse a single authorized-keys line, tolerating surrounding whitespace.
pub fn parse_authorized_key(text: &str) -> Result<PublicKey, ssh_key::Error> {
    PublicKey::from_openssh(text.trim())
}

/// Canonical authorized-keys form of a key: `<algorithm> <base64>`.
///
/// The comment is dropped — an empty comment is canonical — so two parses of
/// the same key material always marshal to byte-identical text.
pub fn marshal_authorized_key(key: &PublicKey) -> Result<String, ssh_key::Error> {
    let canonical = PublicKey::new(key.key_data().clone(), "");
    Ok(canonical.to_openssh()?.trim_end().to_string())
}
