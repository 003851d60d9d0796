//! Service configuration documents.
//!
//! Settings can be provided as a YAML document and are then overridden by
//! command-line flags and environment variables. Every field has a default so
//! an empty document, or no document at all, yields a working configuration.

use std::{fs, net::SocketAddr, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    badge::BadgeDefaults,
    cache::{DEFAULT_MAX_ENTRIES, DEFAULT_MAX_ITEM_BYTES},
    error::{self, Error},
};

/// Address used when neither the document nor the CLI provides one.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8080";

/// Root configuration document.
///
/// # Examples
///
/// ```
/// use ghbadge::parse_settings;
///
/// let yaml = r#"
/// listen: 0.0.0.0:9000
/// cache:
///   max_entries: 128
/// badge:
///   support_default: false
/// "#;
/// let settings = parse_settings(yaml,).expect("valid configuration",);
/// assert_eq!(settings.cache.max_entries, 128);
/// assert!(!settings.badge.support_default);
/// assert!(settings.badge.analytics_default);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default, deny_unknown_fields)]
pub struct Settings
{
    /// Socket address the HTTP server binds to.
    pub listen: String,

    /// Token used to authenticate GitHub API requests.
    pub github_token: Option<String,>,

    /// Alternative GitHub API root, e.g. for GitHub Enterprise.
    pub api_base: Option<String,>,

    /// Cache sizing.
    pub cache: CacheSettings,

    /// Badge rendering defaults.
    pub badge: BadgeSettings,
}

impl Default for Settings
{
    fn default() -> Self
    {
        Self {
            listen:       DEFAULT_LISTEN.to_owned(),
            github_token: None,
            api_base:     None,
            cache:        CacheSettings::default(),
            badge:        BadgeSettings::default(),
        }
    }
}

/// Limits of the in-process cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings
{
    /// Entries kept before eviction starts.
    pub max_entries:    usize,
    /// Largest value accepted by the cache, in bytes.
    pub max_item_bytes: usize,
}

impl Default for CacheSettings
{
    fn default() -> Self
    {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES, max_item_bytes: DEFAULT_MAX_ITEM_BYTES,
        }
    }
}

/// Badge rendering defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize,)]
#[serde(default, deny_unknown_fields)]
pub struct BadgeSettings
{
    /// Whether the support link is shown when `s` is absent.
    pub support_default:   bool,
    /// Whether analytics are embedded when `a` is absent.
    pub analytics_default: bool,
    /// Analytics property id; without it no analytics snippet is emitted.
    pub analytics_id:      Option<String,>,
}

impl Default for BadgeSettings
{
    fn default() -> Self
    {
        Self {
            support_default: true, analytics_default: true, analytics_id: None,
        }
    }
}

impl BadgeSettings
{
    /// Flag defaults used while parsing badge requests.
    pub fn defaults(&self,) -> BadgeDefaults
    {
        BadgeDefaults {
            support: self.support_default, analytics: self.analytics_default,
        }
    }
}

impl Settings
{
    /// Parses the listen address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when `listen` is not a socket address.
    pub fn listen_addr(&self,) -> Result<SocketAddr, Error,>
    {
        self.listen.trim().parse().map_err(|e| {
            Error::validation(format!("listen address '{}' is invalid: {e}", self.listen),)
        },)
    }

    /// Checks invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first violated invariant.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        self.listen_addr()?;

        if self.cache.max_entries == 0 {
            return Err(Error::validation("cache.max_entries must be greater than zero",),);
        }
        if self.cache.max_item_bytes == 0 {
            return Err(Error::validation("cache.max_item_bytes must be greater than zero",),);
        }
        if self.github_token.as_deref().is_some_and(|token| token.trim().is_empty(),) {
            return Err(Error::validation("github_token must not be blank",),);
        }

        Ok((),)
    }
}

/// Parses a YAML settings document and validates it.
///
/// # Errors
///
/// Returns [`Error::Parse`] for malformed YAML and [`Error::Validation`] for
/// documents that violate invariants.
pub fn parse_settings(yaml: &str,) -> Result<Settings, Error,>
{
    let settings = if yaml.trim().is_empty() {
        Settings::default()
    } else {
        serde_yaml::from_str::<Settings,>(yaml,)?
    };
    settings.validate()?;

    Ok(settings,)
}

/// Reads and parses the YAML settings document at `path`.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read, otherwise the errors of
/// [`parse_settings`].
pub fn load_settings(path: &Path,) -> Result<Settings, Error,>
{
    let contents = fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
    parse_settings(&contents,)
}
