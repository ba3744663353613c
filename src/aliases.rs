// src/aliases.rs
//! Re-exports secure-gate's ergonomic secret types
//!
//! These are the canonical wrappers for key material inside the crate.
//! Everything here zeroizes on drop and never prints its contents.

pub use secure_gate::dynamic_alias;

// Half of a decoded key secret (signing or encryption half)
dynamic_alias!(pub KeyMaterial, Vec<u8>);

// Decoded secret before it is split into signing + encryption halves
dynamic_alias!(pub RawSecret, Vec<u8>);

// Decrypted payloads handed back to callers of the file store
dynamic_alias!(pub PlainText, Vec<u8>);
