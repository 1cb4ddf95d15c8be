use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracklight_core::level::LevelRegistry;
use tracklight_core::models::HighlightLevel;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub highlighting: HighlightingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HighlightingConfig {
    #[serde(default = "default_level")]
    pub default_level: String,
    #[serde(default)]
    pub line_limit: Option<i64>,
    /// Tool name to level (`none`, `html`, `database`).
    #[serde(default)]
    pub importers: HashMap<String, String>,
}

impl Default for HighlightingConfig {
    fn default() -> Self {
        Self {
            default_level: default_level(),
            line_limit: None,
            importers: HashMap::new(),
        }
    }
}

fn default_level() -> String {
    "html".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_include_key")]
    pub include_key: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            include_key: default_include_key(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./highlighted")
}
fn default_include_key() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    pub filesystem: Option<FilesystemSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemSourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.rep".to_string(),
        "**/*.txt".to_string(),
        "**/*.gpx".to_string(),
        "**/*.xml".to_string(),
    ]
}

impl Config {
    /// Defaults for commands that run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/tracklight.sqlite"),
            },
            highlighting: HighlightingConfig::default(),
            output: OutputConfig::default(),
            sources: SourcesConfig::default(),
        }
    }

    /// Per-tool levels as a lookup table. Call after [`load_config`] has
    /// validated the level names.
    pub fn level_registry(&self) -> Result<LevelRegistry> {
        let default = parse_level("highlighting.default_level", &self.highlighting.default_level)?;
        let mut registry = LevelRegistry::new(default);
        for (tool, level) in &self.highlighting.importers {
            let key = format!("highlighting.importers.\"{}\"", tool);
            registry.set(tool.clone(), parse_level(&key, level)?);
        }
        Ok(registry)
    }
}

fn parse_level(key: &str, value: &str) -> Result<HighlightLevel> {
    value.parse::<HighlightLevel>().map_err(|_| {
        anyhow::anyhow!(
            "{} must be one of none, html, database (got '{}')",
            key,
            value
        )
    })
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate highlighting
    if let Some(limit) = config.highlighting.line_limit {
        if limit <= 0 {
            bail!("highlighting.line_limit must be > 0");
        }
    }
    config.level_registry()?;

    // Validate output
    if config.output.dir.as_os_str().is_empty() {
        bail!("output.dir must not be empty");
    }

    Ok(config)
}
