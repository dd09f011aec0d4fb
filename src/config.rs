#![forbid(unsafe_code)]

//! Runtime settings for the fetch binaries.
//!
//! Values are resolved from explicit CLI overrides first, then the process
//! environment, then a dotenv-style file next to the working directory.

use anyhow::{Context, Result};
use std::{
    collections::HashMap,
    env, fmt, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_MEDIA_ROOT: &str = "media";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RESOLVER_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RESOLVER_COMMAND: &str = "python3 -m youtube_transcript_api";

const API_KEY_VAR: &str = "YOUTUBE_KEY";

/// Credential for the comment listing endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("YOUTUBE_KEY not found; create a .env file with YOUTUBE_KEY=your_api_key")]
    MissingApiKey,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub media_root: PathBuf,
    pub api_key: Option<ApiKey>,
    pub http_timeout: Duration,
    pub resolver_command: Vec<String>,
    pub resolver_timeout: Duration,
}

impl Settings {
    /// Comment fetching cannot start without a credential; the other asset
    /// kinds never call this.
    pub fn require_api_key(&self) -> Result<&ApiKey, ConfigError> {
        self.api_key.as_ref().ok_or(ConfigError::MissingApiKey)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub media_root: Option<PathBuf>,
    pub resolver_command: Option<String>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_settings(overrides: SettingsOverrides) -> Result<Settings> {
    let env_path = overrides
        .env_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(&env_path)?;
    Ok(build_settings(&file_vars, env_var_string, overrides))
}

fn build_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> Settings {
    let media_root = overrides
        .media_root
        .or_else(|| lookup_value("MEDIA_ROOT", file_vars, &env_lookup).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT));
    // No command-line override for the credential; flags show up in `ps`.
    let api_key = lookup_value(API_KEY_VAR, file_vars, &env_lookup).map(ApiKey::new);
    let http_timeout = lookup_secs(
        "HTTP_TIMEOUT_SECS",
        file_vars,
        &env_lookup,
        DEFAULT_HTTP_TIMEOUT_SECS,
    );
    let resolver_timeout = lookup_secs(
        "RESOLVER_TIMEOUT_SECS",
        file_vars,
        &env_lookup,
        DEFAULT_RESOLVER_TIMEOUT_SECS,
    );
    let resolver_command = non_blank(overrides.resolver_command)
        .or_else(|| lookup_value("TRANSCRIPT_RESOLVER", file_vars, &env_lookup))
        .map(|value| split_command(&value))
        .filter(|parts| !parts.is_empty())
        .unwrap_or_else(|| split_command(DEFAULT_RESOLVER_COMMAND));

    Settings {
        media_root,
        api_key,
        http_timeout,
        resolver_command,
        resolver_timeout,
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn split_command(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

fn lookup_secs(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
    default: u64,
) -> Duration {
    let secs = lookup_value(key, file_vars, env_lookup)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(default);
    Duration::from_secs(secs)
}

fn env_var_string(key: &str) -> Option<String> {
    non_blank(env::var(key).ok())
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| non_blank(file_vars.get(key).cloned()))
}

/// Parses `KEY=value` lines. A missing file is not an error; it simply
/// contributes no values.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), unquote(raw.trim()).to_string());
    }
    Ok(vars)
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|quote| {
            value
                .strip_prefix(*quote)
                .and_then(|inner| inner.strip_suffix(*quote))
        })
        .unwrap_or(value)
}
