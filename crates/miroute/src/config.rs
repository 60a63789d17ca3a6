//! TOML + environment configuration for the CLI.
//!
//! `miroute.toml` holds a `[defaults]` section and any number of
//! `[[routers]]` entries; `MIROUTE_*` environment variables layer on
//! top via figment (nested keys split on `__`, e.g.
//! `MIROUTE_DEFAULTS__TIMEOUT`). Resolution turns one entry plus the
//! defaults and CLI flags into an `UpdaterConfig` for the engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use miroute_core::UpdaterConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `miroute.toml` contents.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Settings applied to every router unless overridden per entry.
    #[serde(default)]
    pub defaults: Defaults,

    /// Routers to poll.
    #[serde(default)]
    pub routers: Vec<RouterProfile>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds between successful poll cycles.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Days an absent device is kept; 0 keeps devices forever.
    #[serde(default = "default_activity_days")]
    pub activity_days: u32,

    /// Seconds before an unrefreshed optional category is cleared.
    #[serde(default = "default_max_staleness")]
    pub max_staleness: u64,

    /// Track wireless clients only, bypassing the device list.
    #[serde(default)]
    pub force_load: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            scan_interval: default_scan_interval(),
            timeout: default_timeout(),
            activity_days: default_activity_days(),
            max_staleness: default_max_staleness(),
            force_load: false,
        }
    }
}

fn default_scan_interval() -> u64 {
    miroute_core::config::DEFAULT_SCAN_INTERVAL.as_secs()
}
fn default_timeout() -> u64 {
    miroute_api::transport::DEFAULT_TIMEOUT.as_secs()
}
fn default_activity_days() -> u32 {
    miroute_core::config::DEFAULT_ACTIVITY_DAYS
}
fn default_max_staleness() -> u64 {
    miroute_core::config::DEFAULT_MAX_STALENESS.as_secs()
}

/// One router entry.
#[derive(Debug, Deserialize, Serialize)]
pub struct RouterProfile {
    /// Label used in output and cache keys; defaults to the address.
    pub name: Option<String>,

    /// Host or host:port, no scheme.
    pub address: String,

    /// Admin password (plaintext -- prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable holding the admin password.
    pub password_env: Option<String>,

    pub scan_interval: Option<u64>,
    pub timeout: Option<u64>,
    pub activity_days: Option<u32>,
    pub max_staleness: Option<u64>,
    pub force_load: Option<bool>,
}

impl RouterProfile {
    /// Display label: name when given, address otherwise.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.address)
    }
}

// ── File locations ──────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path(override_path: Option<&Path>) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }
    ProjectDirs::from("com", "miroute", "miroute").map_or_else(
        || home_fallback(".config").join("miroute.toml"),
        |dirs| dirs.config_dir().join("miroute.toml"),
    )
}

/// Directory for persisted router snapshots.
pub fn cache_dir() -> PathBuf {
    ProjectDirs::from("com", "miroute", "miroute").map_or_else(
        || home_fallback(".cache"),
        |dirs| dirs.cache_dir().to_path_buf(),
    )
}

fn home_fallback(kind: &str) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(kind);
    p.push("miroute");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Load the full config from file + environment.
pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("MIROUTE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Router selection & resolution ───────────────────────────────────

/// Pick the routers a command should act on.
///
/// With `--router` the value is matched against entry names and
/// addresses; an unmatched value is treated as an ad-hoc address when
/// `MIROUTE_PASSWORD` is set. Without the flag every configured entry
/// is selected.
pub fn select_routers(
    config: &Config,
    global: &GlobalOpts,
) -> Result<Vec<UpdaterConfig>, CliError> {
    if let Some(ref wanted) = global.router {
        let found = config
            .routers
            .iter()
            .find(|r| r.name.as_deref() == Some(wanted.as_str()) || r.address == *wanted);
        return match found {
            Some(profile) => Ok(vec![resolve(profile, &config.defaults, global)?]),
            None => ad_hoc_router(wanted, config, global),
        };
    }

    if config.routers.is_empty() {
        let path = config_path(global.config.as_deref());
        return Err(CliError::NoConfig {
            path: path.display().to_string(),
        });
    }

    config
        .routers
        .iter()
        .map(|profile| resolve(profile, &config.defaults, global))
        .collect()
}

/// Like [`select_routers`] but for commands that target one router.
pub fn select_one_router(config: &Config, global: &GlobalOpts) -> Result<UpdaterConfig, CliError> {
    let mut selected = select_routers(config, global)?;
    if selected.len() > 1 {
        let names = config
            .routers
            .iter()
            .map(RouterProfile::label)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CliError::Validation {
            field: "--router".into(),
            reason: format!("multiple routers configured, pick one of: {names}"),
        });
    }
    selected.pop().ok_or_else(|| CliError::NoConfig {
        path: config_path(global.config.as_deref()).display().to_string(),
    })
}

/// Translate one profile + defaults + CLI flags into engine settings.
pub fn resolve(
    profile: &RouterProfile,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<UpdaterConfig, CliError> {
    let password = resolve_password(profile)?;

    let scan_secs = profile.scan_interval.unwrap_or(defaults.scan_interval);
    if scan_secs == 0 {
        return Err(CliError::Validation {
            field: "scan_interval".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    // Timeout: flag > profile > defaults.
    let timeout_secs = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(defaults.timeout);
    if timeout_secs == 0 {
        return Err(CliError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    let mut config = UpdaterConfig::new(profile.address.clone(), password);
    config.entry_id = profile.label().to_string();
    config.scan_interval = Duration::from_secs(scan_secs);
    config.timeout = Duration::from_secs(timeout_secs);
    config.activity_days = profile.activity_days.unwrap_or(defaults.activity_days);
    config.max_staleness =
        Duration::from_secs(profile.max_staleness.unwrap_or(defaults.max_staleness));
    config.is_force_load = profile.force_load.unwrap_or(defaults.force_load);
    Ok(config)
}

fn resolve_password(profile: &RouterProfile) -> Result<SecretString, CliError> {
    if let Some(ref plain) = profile.password {
        return Ok(SecretString::from(plain.clone()));
    }
    let from_env = profile
        .password_env
        .as_deref()
        .and_then(|var| std::env::var(var).ok());
    if let Some(value) = from_env {
        return Ok(SecretString::from(value));
    }
    Err(CliError::NoPassword {
        router: profile.label().to_string(),
    })
}

fn ad_hoc_router(
    address: &str,
    config: &Config,
    global: &GlobalOpts,
) -> Result<Vec<UpdaterConfig>, CliError> {
    let Ok(password) = std::env::var("MIROUTE_PASSWORD") else {
        let names = config
            .routers
            .iter()
            .map(RouterProfile::label)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(CliError::RouterNotFound {
            name: address.to_string(),
            available: if names.is_empty() {
                "none".into()
            } else {
                names
            },
        });
    };

    let profile = RouterProfile {
        name: None,
        address: address.to_string(),
        password: Some(password),
        password_env: None,
        scan_interval: None,
        timeout: None,
        activity_days: None,
        max_staleness: None,
        force_load: None,
    };
    Ok(vec![resolve(&profile, &config.defaults, global)?])
}
