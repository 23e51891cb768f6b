use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::limits::{LimitKind, LimitTable};
use crate::parsing::{parse_limit, parse_selector, parse_threshold, split_entries};
use crate::types::{CheckMode, Config};

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let mode = match env.get_var("CHECK_MODE").as_deref().map(str::trim) {
        None | Some("") | Some("object-stats") => CheckMode::ObjectStats,
        Some("pv-avail") => CheckMode::PvAvail,
        Some(other) => bail!("CHECK_MODE must be object-stats or pv-avail, got {:?}", other),
    };

    let namespaces: Vec<String> = env
        .get_var("NAMESPACES")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let snapshot_file = env
        .get_var("SNAPSHOT_FILE")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from);

    let verbose = env
        .get_var("VERBOSE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false);

    let limits = load_limits(env)?;

    let selectors = env
        .get_var("PV_SELECTORS")
        .unwrap_or_default()
        .split_whitespace()
        .map(parse_selector)
        .collect::<Result<Vec<_>>>()
        .context("Invalid PV_SELECTORS")?;

    let default_warn = optional_threshold(env, "WARN")?;
    let default_crit = optional_threshold(env, "CRIT")?;

    Ok(Config {
        mode,
        namespaces,
        snapshot_file,
        verbose,
        limits,
        selectors,
        default_warn,
        default_crit,
    })
}

fn load_limits<E: EnvironmentProvider>(env: &E) -> Result<LimitTable> {
    let mut limits = LimitTable::new();

    for (var, kind) in [("LIMIT_WARN", LimitKind::Warn), ("LIMIT_CRIT", LimitKind::Crit)] {
        for decl in split_entries(&env.get_var(var).unwrap_or_default()) {
            let (name, value) = parse_limit(decl).with_context(|| format!("Invalid {}", var))?;
            limits.set_exact(name, kind, value);
        }
    }

    for (var, kind) in [("LIMIT_WARN_REGEX", LimitKind::Warn), ("LIMIT_CRIT_REGEX", LimitKind::Crit)] {
        for decl in split_entries(&env.get_var(var).unwrap_or_default()) {
            let (pattern, value) = parse_limit(decl).with_context(|| format!("Invalid {}", var))?;
            limits
                .prepend_regex(&pattern, kind, value)
                .with_context(|| format!("Invalid {} pattern {:?}", var, pattern))?;
        }
    }

    for name in split_entries(&env.get_var("ALWAYS_SHOW").unwrap_or_default()) {
        limits.always_show(name);
    }
    for pattern in split_entries(&env.get_var("ALWAYS_SHOW_REGEX").unwrap_or_default()) {
        limits
            .always_show_regex(pattern)
            .map_err(|e| anyhow!("Invalid ALWAYS_SHOW_REGEX pattern {:?}: {}", pattern, e))?;
    }

    Ok(limits)
}

fn optional_threshold<E: EnvironmentProvider>(env: &E, key: &str) -> Result<Option<f64>> {
    env.get_var(key)
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_threshold(&v).with_context(|| format!("Invalid {}", key)))
        .transpose()
}
