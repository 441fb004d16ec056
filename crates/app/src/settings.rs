use anyhow::{Context, Result};
use pesa_import::CategoryRuleEngine;
use std::fs;
use std::path::{Path, PathBuf};

/// Rules written to the data directory on first use.
pub const DEFAULT_RULES: &str = include_str!("../assets/default_rules.json");

const RULES_FILE: &str = "rules.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

pub fn data_dir() -> Result<PathBuf> {
    let project_dirs = directories::ProjectDirs::from("", "", "pesa")
        .context("could not determine a data directory for this user")?;
    Ok(project_dirs.data_dir().to_path_buf())
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(RULES_FILE))
}

/// Writes the bundled rules to `path` unless a file is already there.
/// Returns whether it wrote.
pub fn ensure_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_RULES)
        .with_context(|| format!("writing default rules to {}", path.display()))?;
    tracing::info!("Created default rules file: {}", path.display());
    Ok(true)
}

/// An explicit path is used as given. Otherwise the per-user rules file,
/// created from the bundled defaults if missing.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => {
            let path = default_config_path()?;
            ensure_default_config(&path)?;
            Ok(path)
        }
    }
}

pub fn load_engine(path: &Path) -> Result<CategoryRuleEngine> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading rules file {}", path.display()))?;
    let engine = match ConfigFormat::from_path(path) {
        ConfigFormat::Json => CategoryRuleEngine::from_json(&content),
        ConfigFormat::Toml => CategoryRuleEngine::from_toml(&content),
    }
    .with_context(|| format!("invalid rules file {}", path.display()))?;
    Ok(engine)
}

pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("dat")
}
