// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Session configuration and its storage port.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{
    DeflateCodec, DEFAULT_DELIMITER, DEFAULT_MAX_DECODED_BYTES, MAX_COMPRESSION_LEVEL,
};

/// Key under which [`ProvenanceConfig`] is stored.
pub const CONFIG_KEY: &str = "provenance";

/// Tunables for a provenance session.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvenanceConfig {
    /// Seed the session from the ambient location when `done` is called.
    pub load_from_location: bool,
    /// Marker wrapping an exported state.
    pub delimiter: String,
    /// DEFLATE level for exported states (0..=9).
    pub compression_level: u32,
    /// Largest decoded state accepted on import, in bytes.
    pub max_decoded_bytes: u64,
    /// Label of the root node.
    pub root_label: String,
    /// Label of nodes created by state import.
    pub import_label: String,
}

impl Default for ProvenanceConfig {
    fn default() -> Self {
        Self {
            load_from_location: false,
            delimiter: DEFAULT_DELIMITER.to_owned(),
            compression_level: 6,
            max_decoded_bytes: DEFAULT_MAX_DECODED_BYTES,
            root_label: "Root".to_owned(),
            import_label: "Imported state".to_owned(),
        }
    }
}

impl ProvenanceConfig {
    /// The delimiter to use; an empty setting falls back to `||`.
    pub fn delimiter(&self) -> &str {
        if self.delimiter.is_empty() {
            DEFAULT_DELIMITER
        } else {
            &self.delimiter
        }
    }

    /// The compression level clamped to the supported range.
    pub fn compression_level(&self) -> u32 {
        self.compression_level.min(MAX_COMPRESSION_LEVEL)
    }

    /// The default codec for these settings.
    pub fn codec(&self) -> DeflateCodec {
        DeflateCodec::new(self.compression_level())
            .with_max_decoded_bytes(self.max_decoded_bytes)
    }
}

/// Storage port for raw config blobs keyed by logical name.
pub trait ConfigStore {
    /// Loads a raw blob. Returns [`ConfigError::NotFound`] when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persists a raw blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

/// Loads and saves [`ProvenanceConfig`] through a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Creates a service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Loads and deserializes the blob under `key`; `Ok(None)` if missing
    /// or empty.
    ///
    /// # Errors
    ///
    /// Storage failures other than `NotFound`, and malformed JSON.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serializes `value` as pretty JSON under `key`.
    ///
    /// # Errors
    ///
    /// Serialization or storage failures.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Loads the session config, falling back to defaults when none is
    /// stored. Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// See [`ConfigService::load`].
    pub fn load_provenance(&self) -> Result<ProvenanceConfig, ConfigError> {
        Ok(self.load(CONFIG_KEY)?.unwrap_or_default())
    }

    /// Saves the session config.
    ///
    /// # Errors
    ///
    /// See [`ConfigService::save`].
    pub fn save_provenance(&self, config: &ProvenanceConfig) -> Result<(), ConfigError> {
        self.save(CONFIG_KEY, config)
    }
}
