use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// SHA-256 checksum of a stored upload, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(String);

impl ContentHash {
    const HEX_LEN: usize = 64;

    pub fn from_hex(hex: impl Into<String>) -> Result<Self, DomainError> {
        let hex = hex.into();
        if hex.len() != Self::HEX_LEN {
            return Err(DomainError::InvalidChecksum {
                expected: format!("{} hex characters", Self::HEX_LEN),
                actual: format!("{} characters", hex.len()),
            });
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DomainError::InvalidChecksum {
                expected: "hex characters only".to_string(),
                actual: hex,
            });
        }
        Ok(Self(hex.to_ascii_lowercase()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ContentHash {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
