//! Sensitive pattern registry.
//!
//! A registry entry describes one logical secret; expansion turns it into one
//! concrete byte pattern per encoding the secret might appear under in a
//! process image (raw bytes, hex text, base64 text). Every expanded pattern
//! is checked independently by the analyzer.

mod manifest;

pub use manifest::{PatternManifest, SecretEntry, builtin_manifest, load_manifest, save_manifest};

use serde::{Deserialize, Serialize};

/// How a secret's bytes are rendered in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Encoding {
    Raw,
    Hex,
    Base64,
}

/// One concrete byte pattern to search for. Immutable once built.
#[derive(Debug, Clone)]
pub struct SensitivePattern {
    pub label: String,
    pub encoding: Encoding,
    pub bytes: Vec<u8>,
    /// Residual matches tolerated in the final snapshot. Zero for ordinary
    /// secrets; non-zero only for material the target is known to pin.
    pub allowed_count: usize,
}

impl SensitivePattern {
    pub fn new(label: impl Into<String>, encoding: Encoding, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            encoding,
            bytes,
            allowed_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_displays_lowercase() {
        assert_eq!(Encoding::Raw.to_string(), "raw");
        assert_eq!(Encoding::Hex.to_string(), "hex");
        assert_eq!(Encoding::Base64.to_string(), "base64");
    }

    #[test]
    fn encoding_serde_roundtrip() {
        let json = serde_json::to_string(&Encoding::Base64).unwrap();
        assert_eq!(json, "\"base64\"");
        let back: Encoding = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Encoding::Base64);
    }
}
