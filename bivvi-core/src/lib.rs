//! Deterministic identity derivation for bivvi.
//!
//! Everything in this crate is a pure function of an SSH public key: the
//! 32-byte SHA-256 fingerprint of the key's wire form feeds a bit extractor
//! ([`bitset::BitSet`]), a phonotactic syllable generator
//! ([`syllables::Generator`]) and a custom base-32 codec ([`base32`]), which
//! together produce the POSIX/LDAP attributes served by `bivvi-directory`.
//!
//! Two independent deployments derive byte-identical identities for the same
//! key: no randomness, clock, or host state enters any function here.

pub mod base32;
pub mod bitset;
pub mod identity;
pub mod keys;
pub mod syllables;

pub use identity::Identity;
