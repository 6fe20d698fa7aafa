//! The configuration surface consumed by the reconciler and the logger.
//!
//! Parsing a TOML file into these types is the job of an external loader;
//! this module only models the shape of the data once parsed, the way the
//! rest of the crate's config types carry `serde` derives without owning
//! the file-reading side of things.

use camino::Utf8PathBuf;
use serde::Deserialize;

/// Top-level configuration for a single run of the zone database core.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub zones: Vec<ZoneConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One zone's configuration: where to find it, and who it talks to.
#[derive(Clone, Debug, Deserialize)]
pub struct ZoneConfig {
    /// The zone's apex name, e.g. `"example.com."`.
    pub name: String,

    /// Path to the zone's original (textual) source, for diagnostics.
    pub file: Utf8PathBuf,

    /// Path to the compiled form of the zone that the core actually loads.
    pub db: Utf8PathBuf,

    #[serde(default)]
    pub acl: ZoneAclConfig,
}

/// The four ACLs a zone carries.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ZoneAclConfig {
    #[serde(default)]
    pub xfr_in: Vec<AclRuleConfig>,
    #[serde(default)]
    pub xfr_out: Vec<AclRuleConfig>,
    #[serde(default)]
    pub notify_in: Vec<AclRuleConfig>,
    #[serde(default)]
    pub notify_out: Vec<AclRuleConfig>,
}

/// A single ACL rule: a remote allowed to use this ACL's action.
#[derive(Clone, Debug, Deserialize)]
pub struct AclRuleConfig {
    pub remote: RemoteConfig,
}

/// A resolvable remote endpoint: a host (name or address) and a port.
///
/// A port of `0` means "any port", used by `xfr_in` rules where only the
/// master's address matters for polling.
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteConfig {
    pub address: String,
    #[serde(default)]
    pub port: u16,
}

/// Logging configuration, consumed by [`crate::log::Logger`].
#[derive(Clone, Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub target: LogTarget,
    #[serde(default)]
    pub trace_targets: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            target: LogTarget::Stderr,
            trace_targets: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    File(Utf8PathBuf),
    Syslog,
    Stdout,
    Stderr,
}

impl Default for LogTarget {
    fn default() -> Self {
        Self::Stderr
    }
}
