use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::{Encoding, SensitivePattern};
use crate::error::{Error, Result};

/// One secret under test, entered as hex text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretEntry {
    pub label: String,
    pub hex: String,
    #[serde(default = "default_encodings")]
    pub encodings: Vec<Encoding>,
    #[serde(default)]
    pub allowed_count: usize,
}

fn default_encodings() -> Vec<Encoding> {
    vec![Encoding::Raw]
}

/// Versioned, externally loadable registry of sensitive patterns plus the
/// capture-sanity canary string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternManifest {
    pub version: String,
    pub canary: String,
    pub secrets: Vec<SecretEntry>,
}

impl PatternManifest {
    /// The canary as a searchable pattern. The target holds this marker in
    /// memory until the erasure signal, so its absence from the initial
    /// snapshot means the capture itself is broken.
    pub fn canary_pattern(&self) -> SensitivePattern {
        SensitivePattern::new("canary", Encoding::Raw, self.canary.clone().into_bytes())
    }

    /// Expand every secret into one pattern per requested encoding.
    pub fn expand(&self) -> Result<Vec<SensitivePattern>> {
        let mut patterns = Vec::new();

        for entry in &self.secrets {
            let raw = hex::decode(entry.hex.trim()).map_err(|e| Error::InvalidPattern {
                label: entry.label.clone(),
                message: e.to_string(),
            })?;

            if raw.is_empty() {
                return Err(Error::InvalidPattern {
                    label: entry.label.clone(),
                    message: "secret is empty".to_string(),
                });
            }

            for &encoding in &entry.encodings {
                let bytes = match encoding {
                    Encoding::Raw => raw.clone(),
                    Encoding::Hex => hex::encode(&raw).into_bytes(),
                    Encoding::Base64 => STANDARD.encode(&raw).into_bytes(),
                };
                patterns.push(SensitivePattern {
                    label: entry.label.clone(),
                    encoding,
                    bytes,
                    allowed_count: entry.allowed_count,
                });
            }
        }

        Ok(patterns)
    }
}

pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<PatternManifest> {
    let content = fs::read_to_string(&path).map_err(|source| Error::Io {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    let manifest = serde_json::from_str(&content)?;
    Ok(manifest)
}

pub fn save_manifest<P: AsRef<Path>>(path: P, manifest: &PatternManifest) -> Result<()> {
    let content = serde_json::to_string_pretty(manifest)?;
    fs::write(&path, content).map_err(|source| Error::Io {
        path: path.as_ref().to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Default registry used when no manifest is supplied on the command line.
///
/// The secret values here match the fixtures baked into the bundled audit
/// targets; real deployments load their own manifest instead.
pub fn builtin_manifest() -> PatternManifest {
    PatternManifest {
        version: "1".to_string(),
        canary: "ZEROAUDIT CANARY: RESIDENT UNTIL THE WIPE SIGNAL".to_string(),
        secrets: vec![
            SecretEntry {
                label: "symmetric key".to_string(),
                hex: "5b5c2b271cfbd1d0c33eb06c86b3b6a9f27e94e06ab32ae11e6c7d3b173a6406".to_string(),
                encodings: vec![Encoding::Raw, Encoding::Base64],
                allowed_count: 0,
            },
            SecretEntry {
                label: "auth tag".to_string(),
                hex: "1a08e32c3f2c4d559c66a1f47bb9e8b2".to_string(),
                encodings: vec![Encoding::Raw, Encoding::Hex],
                allowed_count: 0,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_produces_one_pattern_per_encoding() {
        let manifest = builtin_manifest();
        let patterns = manifest.expand().unwrap();
        assert_eq!(patterns.len(), 4);

        let key_raw = &patterns[0];
        assert_eq!(key_raw.label, "symmetric key");
        assert_eq!(key_raw.encoding, Encoding::Raw);
        assert_eq!(key_raw.bytes.len(), 32);

        let key_b64 = &patterns[1];
        assert_eq!(key_b64.encoding, Encoding::Base64);
        // Base64 of 32 bytes is 44 characters with padding.
        assert_eq!(key_b64.bytes.len(), 44);
    }

    #[test]
    fn hex_encoding_is_lowercase_text() {
        let manifest = PatternManifest {
            version: "1".to_string(),
            canary: "c".to_string(),
            secrets: vec![SecretEntry {
                label: "tag".to_string(),
                hex: "DEADBEEF".to_string(),
                encodings: vec![Encoding::Hex],
                allowed_count: 0,
            }],
        };
        let patterns = manifest.expand().unwrap();
        assert_eq!(patterns[0].bytes, b"deadbeef");
    }

    #[test]
    fn invalid_hex_is_rejected_with_label() {
        let manifest = PatternManifest {
            version: "1".to_string(),
            canary: "c".to_string(),
            secrets: vec![SecretEntry {
                label: "bad entry".to_string(),
                hex: "zz".to_string(),
                encodings: vec![Encoding::Raw],
                allowed_count: 0,
            }],
        };
        let err = manifest.expand().unwrap_err();
        assert!(err.to_string().contains("bad entry"));
    }

    #[test]
    fn empty_secret_is_rejected() {
        let manifest = PatternManifest {
            version: "1".to_string(),
            canary: "c".to_string(),
            secrets: vec![SecretEntry {
                label: "empty".to_string(),
                hex: String::new(),
                encodings: vec![Encoding::Raw],
                allowed_count: 0,
            }],
        };
        assert!(manifest.expand().is_err());
    }

    #[test]
    fn manifest_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");

        let manifest = builtin_manifest();
        save_manifest(&path, &manifest).unwrap();
        let loaded = load_manifest(&path).unwrap();

        assert_eq!(loaded.version, manifest.version);
        assert_eq!(loaded.canary, manifest.canary);
        assert_eq!(loaded.secrets.len(), manifest.secrets.len());
        assert_eq!(loaded.secrets[0].encodings, manifest.secrets[0].encodings);
    }

    #[test]
    fn load_missing_manifest_reports_path() {
        let err = load_manifest("/nonexistent/patterns.json").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/nonexistent/patterns.json"));
    }

    #[test]
    fn encodings_default_to_raw() {
        let json = r#"{
            "version": "1",
            "canary": "marker",
            "secrets": [{"label": "k", "hex": "00ff"}]
        }"#;
        let manifest: PatternManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.secrets[0].encodings, vec![Encoding::Raw]);
        assert_eq!(manifest.secrets[0].allowed_count, 0);
    }
}
