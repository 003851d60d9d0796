#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the badge service."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.

use std::path::{Path, PathBuf};

/// Unified error type returned by the fetcher, cache, configuration loader and
/// HTTP server.
///
/// Only [`Error::UserNotFound`] and [`Error::Upstream`] ever reach the badge
/// handler's response logic; the remaining variants surface at startup or are
/// logged and swallowed.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the configuration violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Wraps JSON encoding and decoding errors for cached values.
    #[error("failed to serialize badge values: {source}")]
    Serialize {
        /// Underlying serde_json error.
        source: serde_json::Error
    },
    /// The upstream data source reports that the user does not exist.
    #[error("GitHub user '{username}' was not found")]
    UserNotFound {
        /// Username as supplied in the request path.
        username: String
    },
    /// Any other failure while talking to the upstream data source.
    #[error("upstream error: {message}")]
    Upstream {
        /// Human readable message describing the upstream failure.
        message: String
    },
    /// The cache refused to store a value.
    #[error("cache write failed for key {key}: {reason}")]
    CacheWrite {
        /// Cache key that could not be written.
        key:    String,
        /// Reason reported by the cache store.
        reason: String
    },
    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address the server attempted to listen on.
        address: String,
        /// Underlying I/O error.
        source:  std::io::Error
    },
    /// Wraps transport errors raised by hyper.
    #[error("http error: {source}")]
    Http {
        /// Underlying hyper error.
        source: hyper::Error
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs an upstream error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the upstream failure.
    pub fn upstream<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Upstream {
            message: message.into()
        }
    }

    /// Constructs a cache write error for `key`.
    pub fn cache_write<K, R>(key: K, reason: R) -> Self
    where
        K: Into<String>,
        R: Into<String>
    {
        Self::CacheWrite {
            key:    key.into(),
            reason: reason.into()
        }
    }

    /// Returns `true` when the error means the requested user does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UserNotFound { .. })
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// This method is primarily intended for CLI contexts where the variant
    /// name does not add value to end users. The returned string matches the
    /// [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

impl From<hyper::Error> for Error {
    fn from(source: hyper::Error) -> Self {
        Self::Http {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
