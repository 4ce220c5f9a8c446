//! Derived user identity: a pure function of an SSH public key.

use std::collections::HashMap;

use data_encoding::BASE32;
use sha2::{Digest, Sha256};
use ssh_key::PublicKey;

use crate::bitset::BitSet;
use crate::syllables::Generator;

/// Width of the fingerprint window feeding the numeric id, the phone number
/// and the display name.
pub const KEY_HASH_BITS: usize = 40;

/// The constant POSIX group id shared by every derived identity.
pub const GID_NUMBER: u32 = 1001;

/// LDAP/POSIX attributes derived from one public key.
///
/// The SHA-256 of the key's wire form is computed once at construction, and
/// the per-locale display-name table is populated eagerly.  Every accessor is
/// deterministic: the same key yields byte-identical attributes on any host.
pub struct Identity {
    hash: [u8; 32],
    display_names: HashMap<String, String>,
}

impl Identity {
    /// Derive the identity of `key`.
    ///
    /// Fails only when the key cannot be re-encoded to its wire form.
    pub fn from_public_key(key: &PublicKey) -> Result<Self, ssh_key::Error> {
        let wire = key.to_bytes()?;
        let hash: [u8; 32] = Sha256::digest(&wire).into();

        let key_bits = BitSet::from_bytes_truncated(&hash, KEY_HASH_BITS);
        let mut display_names = HashMap::new();
        display_names.insert("en".to_string(), Generator::english().generate(&key_bits));

        Ok(Self {
            hash,
            display_names,
        })
    }

    /// The 32-byte fingerprint: SHA-256 of the key wire form.
    pub fn fingerprint(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Login name: `u` plus the first eight characters of the standard
    /// base-32 fingerprint, lowercased.
    pub fn username(&self) -> String {
        let b32 = BASE32.encode(&self.hash);
        format!("u{}", b32[..8].to_lowercase())
    }

    /// Numeric user id: the 40-bit fingerprint window plus 1000.
    ///
    /// Held in a `u64` — the window alone can exceed 32 bits.
    pub fn posix_user_id(&self) -> u64 {
        self.key_bits().to_u64() + 1000
    }

    /// Constant group id.
    pub fn gid_number(&self) -> u32 {
        GID_NUMBER
    }

    /// Home directory path derived from the login name.
    pub fn home_directory(&self) -> String {
        format!("/home/{}", self.username())
    }

    /// Phone number: `8` followed by the 40-bit window in decimal, at least
    /// four digits wide.
    pub fn phone_number(&self) -> String {
        format!("8{:04}", self.key_bits().to_u64())
    }

    /// Pronounceable display name for `locale`, falling back to English.
    pub fn display_name(&self, locale: &str) -> &str {
        self.display_names
            .get(locale)
            .or_else(|| self.display_names.get("en"))
            .expect("English display name is always populated")
    }

    /// Locales with a display name, in no particular order.
    pub fn supported_locales(&self) -> impl Iterator<Item = &str> {
        self.display_names.keys().map(String::as_str)
    }

    /// The leading [`KEY_HASH_BITS`] bits of the fingerprint, read through
    /// the little-endian convention of [`BitSet::from_bytes`].
    fn key_bits(&self) -> BitSet {
        BitSet::from_bytes_truncated(&self.hash, KEY_HASH_BITS)
    }
}
