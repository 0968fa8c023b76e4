use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

use crate::services::uptime::DEFAULT_TIMEZONE;

const DEFAULT_DATA_ROOT: &str = "/var/lib/uptime-report";
const DEFAULT_SETUP_CONFIG_PATH: &str = "/etc/uptime-report/config.json";
const DEFAULT_REPORT_LOCATION_CONCURRENCY: u64 = 4;
const MAX_REPORT_LOCATION_CONCURRENCY: u64 = 64;

pub(crate) fn setup_config_path() -> PathBuf {
    env_optional_path("UPTIME_SETUP_CONFIG_PATH")
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETUP_CONFIG_PATH))
}

/// Values read from the optional JSON setup file. Environment variables win.
#[derive(Debug, Clone, Default, Deserialize)]
struct SetupConfigOverrides {
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default)]
    data_root: Option<String>,
    #[serde(default)]
    report_output_path: Option<String>,
    #[serde(default)]
    default_timezone: Option<String>,
    #[serde(default)]
    report_location_concurrency: Option<u64>,
}

impl SetupConfigOverrides {
    fn string(value: &Option<String>) -> Option<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

fn load_setup_config_overrides(path: &Path) -> Option<SetupConfigOverrides> {
    if !path.exists() {
        return None;
    }
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to read setup config; using env defaults"
            );
            return None;
        }
    };
    match serde_json::from_str(&contents) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "failed to parse setup config; using env defaults"
            );
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct UptimeConfig {
    pub database_url: String,
    pub data_root: PathBuf,
    pub report_output_path: PathBuf,
    pub default_timezone: Tz,
    pub report_location_concurrency: usize,
}

impl UptimeConfig {
    pub fn from_env() -> Result<Self> {
        let overrides = load_setup_config_overrides(&setup_config_path()).unwrap_or_default();

        let database_url = env_optional_string("UPTIME_DATABASE_URL")
            .or_else(|| SetupConfigOverrides::string(&overrides.database_url))
            .context("UPTIME_DATABASE_URL must be set (or present as database_url in the setup config)")?;
        let database_url = normalize_database_url(database_url);

        let data_root = env_optional_string("UPTIME_DATA_ROOT")
            .or_else(|| SetupConfigOverrides::string(&overrides.data_root))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_ROOT));
        if data_root.as_os_str().is_empty() {
            anyhow::bail!("UPTIME_DATA_ROOT resolved to an empty path");
        }

        let report_output_path = env_optional_string("UPTIME_REPORT_OUTPUT_PATH")
            .or_else(|| SetupConfigOverrides::string(&overrides.report_output_path))
            .map(PathBuf::from)
            .unwrap_or_else(|| data_root.join("reports"));

        let default_timezone = match env_optional_string("UPTIME_DEFAULT_TIMEZONE")
            .or_else(|| SetupConfigOverrides::string(&overrides.default_timezone))
        {
            Some(name) => parse_timezone(&name)?,
            None => DEFAULT_TIMEZONE,
        };

        let report_location_concurrency = env_optional_u64("UPTIME_REPORT_LOCATION_CONCURRENCY")
            .or(overrides.report_location_concurrency)
            .unwrap_or(DEFAULT_REPORT_LOCATION_CONCURRENCY)
            .clamp(1, MAX_REPORT_LOCATION_CONCURRENCY) as usize;

        let mut config = Self {
            database_url,
            data_root,
            report_output_path,
            default_timezone,
            report_location_concurrency,
        };
        config.validate_paths()?;
        Ok(config)
    }

    fn validate_paths(&mut self) -> Result<()> {
        self.data_root =
            validate_and_canonicalize_path(self.data_root.clone(), None, "UPTIME_DATA_ROOT")?;
        self.report_output_path = validate_and_canonicalize_path(
            self.report_output_path.clone(),
            Some(&self.data_root),
            "UPTIME_REPORT_OUTPUT_PATH",
        )?;
        Ok(())
    }
}

fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|err| anyhow::anyhow!("UPTIME_DEFAULT_TIMEZONE {name:?} is not a known zone: {err}"))
}

fn env_optional_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_optional_u64(key: &str) -> Option<u64> {
    let raw = env_optional_string(key)?;
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric setting");
            None
        }
    }
}

fn env_optional_path(key: &str) -> Option<PathBuf> {
    env_optional_string(key).map(PathBuf::from)
}

fn validate_and_canonicalize_path(
    path: PathBuf,
    base: Option<&Path>,
    label: &str,
) -> Result<PathBuf> {
    if !path.is_absolute() {
        anyhow::bail!("{label} must be an absolute path");
    }
    if path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
    {
        anyhow::bail!("{label} must not contain '..' segments");
    }
    let canonical = canonicalize_with_existing_parent(&path)
        .with_context(|| format!("failed to canonicalize {label} ({})", path.display()))?;
    if let Some(base) = base {
        let base = canonicalize_with_existing_parent(base)
            .with_context(|| format!("failed to canonicalize base for {label}"))?;
        if !canonical.starts_with(&base) {
            anyhow::bail!("{label} must reside under {}", base.display());
        }
    }
    Ok(canonical)
}

/// Canonicalizes the deepest existing ancestor and re-appends the rest, so
/// directories that will be created later still resolve symlinks above them.
fn canonicalize_with_existing_parent(path: &Path) -> Result<PathBuf> {
    let Some(existing) = path.ancestors().find(|ancestor| ancestor.exists()) else {
        anyhow::bail!("no existing ancestor found for path {}", path.display());
    };
    let base = existing
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {}", existing.display()))?;
    let suffix = path.strip_prefix(existing).unwrap_or(Path::new(""));
    Ok(base.join(suffix))
}

fn normalize_database_url(url: String) -> String {
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg2://") {
        return format!("postgresql://{stripped}");
    }
    if let Some(stripped) = url.strip_prefix("postgresql+psycopg://") {
        return format!("postgresql://{stripped}");
    }
    url
}
