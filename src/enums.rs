// src/enums.rs
//! Public enum types used throughout the crate
//!
//! Central location for the user-visible cipher selection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Supported encryption algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CipherAlgorithm {
    #[serde(rename = "aes-128-cbc")]
    Aes128Cbc,
    #[serde(rename = "aes-192-cbc")]
    Aes192Cbc,
    #[serde(rename = "aes-256-cbc")]
    Aes256Cbc,
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
}

impl CipherAlgorithm {
    pub const ALL: [CipherAlgorithm; 4] = [
        CipherAlgorithm::Aes128Cbc,
        CipherAlgorithm::Aes192Cbc,
        CipherAlgorithm::Aes256Cbc,
        CipherAlgorithm::Aes256Gcm,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CipherAlgorithm::Aes128Cbc => "aes-128-cbc",
            CipherAlgorithm::Aes192Cbc => "aes-192-cbc",
            CipherAlgorithm::Aes256Cbc => "aes-256-cbc",
            CipherAlgorithm::Aes256Gcm => "aes-256-gcm",
        }
    }

    /// Length in bytes of each key half (signing and encryption)
    pub fn key_size(self) -> usize {
        match self {
            CipherAlgorithm::Aes128Cbc => 16,
            CipherAlgorithm::Aes192Cbc => 24,
            CipherAlgorithm::Aes256Cbc | CipherAlgorithm::Aes256Gcm => 32,
        }
    }

    /// Whether the mode produces its own authentication tag
    pub fn is_authenticated(self) -> bool {
        matches!(self, CipherAlgorithm::Aes256Gcm)
    }
}

impl fmt::Display for CipherAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CipherAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        CipherAlgorithm::ALL
            .into_iter()
            .find(|algo| algo.name() == wanted)
            .ok_or_else(|| CoreError::Config(format!("unsupported cipher {s:?}")))
    }
}
