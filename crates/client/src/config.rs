//! Client configuration via `erbind.toml`
//!
//! The file names the engine library, the instance name and logging mode
//! passed to `initialize`, an optional configuration id, and the engine
//! settings document. The `[settings]` table is converted to JSON verbatim,
//! so its keys are whatever the engine expects.

use std::path::{Path, PathBuf};

use erbind_core::{ConfigId, Error, Result};
use serde::{Deserialize, Serialize};

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "erbind.toml";

/// Where to find the native engine library.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LibraryConfig {
    /// Explicit library path. When absent the platform default name is
    /// resolved through the dynamic linker search path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Resolver configuration loaded from `erbind.toml`.
///
/// # Example
///
/// ```toml
/// instance_name = "erbind"
/// verbose_logging = false
/// # config_id = 1
///
/// [library]
/// # path = "/opt/er/lib/liberengine.so"
///
/// [settings.PIPELINE]
/// CONFIGPATH = "/etc/opt/er"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Instance name reported to the engine.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    /// Ask the engine for verbose logging.
    #[serde(default)]
    pub verbose_logging: bool,
    /// Configuration to attach with; the engine default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_id: Option<ConfigId>,
    /// Native library location.
    #[serde(default)]
    pub library: LibraryConfig,
    /// Engine settings document.
    #[serde(default)]
    pub settings: toml::Table,
}

fn default_instance_name() -> String {
    "erbind".to_string()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            verbose_logging: false,
            config_id: None,
            library: LibraryConfig::default(),
            settings: toml::Table::new(),
        }
    }
}

impl ResolverConfig {
    /// The `[settings]` table as the JSON document `initialize` expects.
    pub fn settings_json(&self) -> Result<String> {
        serde_json::to_string(&self.settings).map_err(|e| Error::Config {
            reason: format!("settings cannot be rendered as JSON: {}", e),
        })
    }

    /// Commented template written for a fresh `erbind.toml`.
    pub fn default_toml() -> &'static str {
        r#"# erbind client configuration
#
# Instance name reported to the engine (default: "erbind")
instance_name = "erbind"

# Ask the engine for verbose logging (default: false)
verbose_logging = false

# Configuration id to attach with. Omit to use the engine default.
# config_id = 1

[library]
# Engine library path. Omit to resolve the platform default name
# through the dynamic linker search path.
# path = "/opt/er/lib/liberengine.so"

# Engine settings, passed to initialize as a JSON document.
[settings]
# [settings.PIPELINE]
# CONFIGPATH = "/etc/opt/er"
# RESOURCEPATH = "/opt/er/resources"
# SUPPORTPATH = "/opt/er/data"
"#
    }

    /// Load a config file. Keys missing from the file take their defaults.
    ///
    /// Unreadable or malformed files fail with [`Error::Config`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
            reason: format!("cannot read config file '{}': {}", path.display(), e),
        })?;
        toml::from_str(&content).map_err(|e| Error::Config {
            reason: format!("invalid config file '{}': {}", path.display(), e),
        })
    }

    /// Create `path` from [`ResolverConfig::default_toml`] unless it exists.
    /// An existing file is left untouched.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| Error::Config {
                reason: format!(
                    "cannot create config file '{}': {}",
                    path.display(),
                    e
                ),
            })?;
        }
        Ok(())
    }

    /// Save this config as TOML, replacing `path`.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            reason: format!("cannot serialize config: {}", e),
        })?;
        std::fs::write(path, content).map_err(|e| Error::Config {
            reason: format!("cannot write config file '{}': {}", path.display(), e),
        })
    }
}
