//! Error types for schema construction, providers, and load cycles.
//!
//! Schema errors fail fast when the registry is built. Everything that can
//! go wrong while loading is a [`LoadError`] collected into one list; a load
//! never stops early because one source misbehaved.

use std::path::PathBuf;

use thiserror::Error;

use crate::coerce::{CoerceError, OptionType};
use crate::key::Key;
use crate::validate::ValidationError;

/// Mistakes in the declared option schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("option key must not be empty")]
    EmptyKey,

    #[error("duplicate option key {0}")]
    DuplicateKey(Key),

    #[error("option keys {first} and {second} both normalize to {spelling:?}")]
    KeyCollision {
        first: Key,
        second: Key,
        spelling: String,
    },

    #[error("short flag -{short} is used by both {first} and {second}")]
    DuplicateShort { short: char, first: Key, second: Key },

    #[error("default value {value} for option {key} is not a valid {ty}")]
    DefaultTypeMismatch {
        key: Key,
        ty: OptionType,
        value: String,
    },
}

/// Errors raised while a provider initializes.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("unsupported config file extension {0:?}, expected .yaml, .yml, .json, or .toml")]
    UnsupportedFormat(String),

    #[error("required config file not found (tried {0})")]
    MissingFile(String),

    #[error("invalid command-line flags: {0}")]
    Flags(String),

    /// `--help` was requested; carries the rendered help text.
    #[error("{0}")]
    HelpRequested(String),

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// A problem recorded during a load cycle.
#[derive(Error, Debug)]
pub enum LoadError {
    /// A provider failed to initialize and contributed nothing.
    #[error("{provider}: {source}")]
    ProviderInit {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// `Registry::set` was called with a key that names no option.
    #[error("unknown option key {key}")]
    UnknownKey { key: Key },

    /// A source holds a key that matches no option.
    #[error("{provider}: unknown field: {field}")]
    UnknownField { provider: String, field: String },

    #[error("{0}")]
    Coerce(#[from] CoerceError),

    #[error("{0}")]
    Validation(#[from] ValidationError),
}

impl LoadError {
    /// The field name, when this error reports an unknown field.
    pub fn unknown_field(&self) -> Option<&str> {
        match self {
            LoadError::UnknownField { field, .. } => Some(field),
            _ => None,
        }
    }
}
