//! Configuration Manager
//!
//! Layers built-in defaults, a TOML file, an optional environment overlay file
//! and `FARE_` environment variables into one hierarchical tree. The tree can
//! be queried by dotted key or as typed [`MonitorSettings`], and re-read on
//! demand with [`ConfigManager::reload`].

use crate::settings::MonitorSettings;
use anyhow::{Context, Result};
use config_crate::{Config, Environment, File};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environment variable prefix, e.g. `FARE_SCRAPER__MAX_WORKERS=8`
pub const ENV_PREFIX: &str = "FARE";

/// Where configuration is read from
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Base TOML file; defaults only when `None`
    pub base: Option<PathBuf>,
    /// Overlay `<dir of base>/environments/<name>.toml`, if it exists
    pub environment: Option<String>,
    /// Read `FARE_*` variables
    pub use_env: bool,
}

impl ConfigSources {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(path.into()),
            environment: None,
            use_env: true,
        }
    }

    fn overlay_path(&self) -> Option<PathBuf> {
        let env = self.environment.as_ref()?;
        let dir = self
            .base
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new("."));
        Some(dir.join("environments").join(format!("{}.toml", env)))
    }
}

struct Loaded {
    tree: Config,
    settings: Arc<MonitorSettings>,
}

/// Read-only hierarchical configuration, explicitly reloadable
pub struct ConfigManager {
    sources: ConfigSources,
    loaded: RwLock<Loaded>,
}

impl std::fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigManager")
            .field("sources", &self.sources)
            .finish_non_exhaustive()
    }
}

impl ConfigManager {
    pub fn load(sources: ConfigSources) -> Result<Self> {
        let loaded = Self::read(&sources)?;
        Ok(Self {
            sources,
            loaded: RwLock::new(loaded),
        })
    }

    /// Built-in defaults only; no files, no environment
    pub fn defaults() -> Result<Self> {
        Self::load(ConfigSources::default())
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::load(ConfigSources::file(path))
    }

    /// Current typed snapshot
    pub fn settings(&self) -> Arc<MonitorSettings> {
        Arc::clone(&self.loaded.read().settings)
    }

    /// Look up one value by dotted key, e.g. `deals.extreme_threshold_factor`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.loaded
            .read()
            .tree
            .get::<T>(key)
            .with_context(|| format!("Failed to read configuration key '{}'", key))
    }

    /// Re-read every source; the previous snapshot stays in place on failure
    pub fn reload(&self) -> Result<Arc<MonitorSettings>> {
        let fresh = Self::read(&self.sources)?;
        let settings = Arc::clone(&fresh.settings);
        *self.loaded.write() = fresh;
        info!("Configuration reloaded");
        Ok(settings)
    }

    fn read(sources: &ConfigSources) -> Result<Loaded> {
        let defaults = Config::try_from(&MonitorSettings::default())
            .context("Failed to serialize default configuration")?;
        let mut builder = Config::builder().add_source(defaults);

        if let Some(base) = &sources.base {
            debug!("Loading configuration file: {:?}", base);
            builder = builder.add_source(File::from(base.as_path()).required(true));
        }

        if let Some(overlay) = sources.overlay_path() {
            if overlay.exists() {
                info!("Loading environment config: {:?}", overlay);
                builder = builder.add_source(File::from(overlay));
            } else {
                warn!("Environment config not found: {:?}", overlay);
            }
        }

        if sources.use_env {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let tree = builder.build().context("Failed to build configuration")?;
        let mut settings: MonitorSettings = tree
            .clone()
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        expand_env_vars(&mut settings)?;
        settings.validate()?;

        Ok(Loaded {
            tree,
            settings: Arc::new(settings),
        })
    }
}

/// Expand `${VAR}` references in URL-valued settings
fn expand_env_vars(settings: &mut MonitorSettings) -> Result<()> {
    let expand = |value: &mut String, what: &str| -> Result<()> {
        let expanded = shellexpand::env(value.as_str())
            .with_context(|| format!("Failed to expand {}", what))?;
        *value = expanded.into_owned();
        Ok(())
    };

    expand(&mut settings.provider.api_base_url, "provider.api_base_url")?;
    expand(&mut settings.provider.site_base_url, "provider.site_base_url")?;

    let notifications = &mut settings.notifications;
    if let Some(url) = notifications.admin_webhook.as_mut() {
        expand(url, "notifications.admin_webhook")?;
    }
    if let Some(url) = notifications.default_webhook.as_mut() {
        expand(url, "notifications.default_webhook")?;
    }
    for url in notifications.deal_webhooks.values_mut() {
        expand(url, "notifications.deal_webhooks")?;
    }
    Ok(())
}
