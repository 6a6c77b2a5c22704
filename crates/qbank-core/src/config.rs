//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_ENGINE__PAGE_SIZE`). Missing sections
//! fall back to their defaults.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::filter::FilterChain;

pub struct Config {
    figment: Figment,
}

/// `[engine]` section: filter levels and paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub page_size: u32,
    pub max_page_size: u32,
    pub levels: Vec<String>,
    /// Leading levels that must be set before fetching; all of them when absent.
    pub required_levels: Option<usize>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_page_size: 100,
            levels: vec!["exam".to_string(), "subject".to_string(), "topic".to_string()],
            required_levels: None,
        }
    }
}

impl EngineSettings {
    pub fn required(&self) -> usize { self.required_levels.unwrap_or(self.levels.len()) }

    /// Empty chain shaped by these settings.
    pub fn chain(&self) -> FilterChain { FilterChain::new(self.levels.iter().cloned(), self.required()) }

    pub fn validate(&self) -> crate::Result<()> {
        if self.levels.is_empty() {
            return Err(Error::InvalidConfig("engine.levels must name at least one level".into()));
        }
        if self.required() == 0 {
            return Err(Error::InvalidConfig("engine.required_levels must be at least 1".into()));
        }
        if self.required() > self.levels.len() {
            return Err(Error::InvalidConfig(format!(
                "engine.required_levels ({}) exceeds the number of levels ({})",
                self.required(),
                self.levels.len()
            )));
        }
        if self.max_page_size == 0 || self.page_size == 0 || self.page_size > self.max_page_size {
            return Err(Error::InvalidConfig(format!(
                "engine.page_size must be within 1..={} (got {})",
                self.max_page_size, self.page_size
            )));
        }
        Ok(())
    }
}

/// `[source]` section: where pages come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub fixture_path: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl SourceSettings {
    pub fn fixture_path(&self, base: &Path) -> Option<PathBuf> {
        self.fixture_path.as_deref().map(|p| resolve_with_base(base, p))
    }

    pub fn timeout(&self) -> Option<Duration> { self.timeout_ms.map(Duration::from_millis) }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> { Self::load_from(Path::new(".")) }

    /// Load `config.toml` + `config.<RUST_ENV>.toml` from `dir`, then `APP_*` env vars.
    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_for_env(dir, &env_name)
    }

    pub fn load_for_env(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.engine()?.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn engine(&self) -> anyhow::Result<EngineSettings> { self.section("engine") }

    pub fn source(&self) -> anyhow::Result<SourceSettings> { self.section("source") }

    fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
