// src/core/mod.rs
pub mod crypto;
pub mod keyring;

pub use crypto::{secure_compare, strategy_for, CipherStrategy};
pub use keyring::{Encrypted, Keyring};
