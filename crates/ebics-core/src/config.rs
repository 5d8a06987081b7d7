use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EbicsError, EbicsResult};
use crate::return_code::{self, MessageCatalog, ReturnCode};
use crate::types::Subscriber;

/// Largest segment the protocol allows (1 MiB of transformed order data)
pub const MAX_SEGMENT_SIZE: usize = 1_048_576;

/// Smallest RSA modulus accepted for newly generated keys
pub const MIN_RSA_KEY_BITS: usize = 1536;

/// Top-level client configuration (loaded from ebics.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EbicsConfig {
    pub client: ClientConfig,
    pub transfer: TransferConfig,
    pub crypto: CryptoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bank host identifier
    pub host_id: String,
    pub partner_id: String,
    pub user_id: String,
    /// Locale used to resolve return-code text (default: en)
    pub locale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Root directory holding one sub-directory per transaction
    pub segment_dir: PathBuf,
    /// Re-check the plaintext digest after download when one is known
    pub verify_download_digest: bool,
    /// Segment size bound in bytes (default and maximum: 1 MiB)
    pub segment_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Signature version: "A005" or "A006"
    pub signature_version: String,
    /// RSA modulus length for generated keys
    pub rsa_key_bits: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host_id: String::new(),
            partner_id: String::new(),
            user_id: String::new(),
            locale: "en".into(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            segment_dir: PathBuf::from("~/.local/share/ebics/segments"),
            verify_download_digest: true,
            segment_size: MAX_SEGMENT_SIZE,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            signature_version: "A006".into(),
            rsa_key_bits: 2048,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// The configured subscriber identity; every id must be set.
    pub fn subscriber(&self) -> EbicsResult<Subscriber> {
        for (field, value) in [
            ("host_id", &self.host_id),
            ("partner_id", &self.partner_id),
            ("user_id", &self.user_id),
        ] {
            if value.trim().is_empty() {
                return Err(EbicsError::Config(format!("client.{field} is not set")));
            }
        }
        Ok(Subscriber {
            host_id: self.host_id.clone(),
            partner_id: self.partner_id.clone(),
            user_id: self.user_id.clone(),
        })
    }

    /// Text for `code` in the configured locale.
    pub fn describe(&self, code: &ReturnCode, catalog: Option<&dyn MessageCatalog>) -> String {
        return_code::describe(code, catalog, &self.locale)
    }
}

impl TransferConfig {
    /// `segment_dir` with a leading `~/` replaced by `$HOME`.
    pub fn resolved_segment_dir(&self) -> PathBuf {
        expand_tilde(&self.segment_dir)
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join(rest),
        None => path.to_path_buf(),
    }
}

impl EbicsConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> EbicsResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| EbicsError::io(format!("reading config {}", path.display()), e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| EbicsError::Config(format!("parsing config {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EbicsResult<()> {
        if self.transfer.segment_size == 0 || self.transfer.segment_size > MAX_SEGMENT_SIZE {
            return Err(EbicsError::Config(format!(
                "transfer.segment_size must be in 1..={MAX_SEGMENT_SIZE}, got {}",
                self.transfer.segment_size
            )));
        }
        if !matches!(self.crypto.signature_version.as_str(), "A005" | "A006") {
            return Err(EbicsError::Config(format!(
                "crypto.signature_version must be A005 or A006, got '{}'",
                self.crypto.signature_version
            )));
        }
        if self.crypto.rsa_key_bits < MIN_RSA_KEY_BITS {
            return Err(EbicsError::Config(format!(
                "crypto.rsa_key_bits must be at least {MIN_RSA_KEY_BITS}, got {}",
                self.crypto.rsa_key_bits
            )));
        }
        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(EbicsError::Config(format!(
                "logging.format must be text or json, got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}
