use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::PathBuf;
use walkdir::WalkDir;

use crate::config::Config;

/// A track file selected for highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFile {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated on every platform.
    pub relative: String,
}

pub fn scan_filesystem(config: &Config) -> Result<Vec<TrackFile>> {
    let fs_config = config
        .sources
        .filesystem
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Filesystem source not configured"))?;

    let root = &fs_config.root;
    if !root.exists() {
        bail!("Filesystem source root does not exist: {}", root.display());
    }

    let include_set = build_globset(&fs_config.include_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ];
    default_excludes.extend(fs_config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut files = Vec::new();

    let walker = WalkDir::new(root).follow_links(fs_config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) {
            continue;
        }
        if !include_set.is_match(&rel_str) {
            continue;
        }

        files.push(TrackFile {
            path: path.to_path_buf(),
            relative: rel_str,
        });
    }

    // Sort for deterministic ordering
    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    tracing::debug!(root = %root.display(), matched = files.len(), "scanned filesystem source");

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesystemSourceConfig;

    fn config_for(root: PathBuf, exclude: Vec<String>) -> Config {
        let mut config = Config::minimal();
        config.sources.filesystem = Some(FilesystemSourceConfig {
            root,
            include_globs: vec!["**/*.rep".to_string(), "**/*.gpx".to_string()],
            exclude_globs: exclude,
            follow_symlinks: false,
        });
        config
    }

    #[test]
    fn test_scan_applies_globs_and_default_excludes() {
        let dir = tempfile::TempDir::new().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("b")).unwrap();
        std::fs::create_dir_all(root.join(".git")).unwrap();
        std::fs::create_dir_all(root.join("old")).unwrap();
        std::fs::write(root.join("a.rep"), "x").unwrap();
        std::fs::write(root.join("b").join("c.gpx"), "<gpx/>").unwrap();
        std::fs::write(root.join("notes.md"), "x").unwrap();
        std::fs::write(root.join(".git").join("d.rep"), "x").unwrap();
        std::fs::write(root.join("old").join("e.rep"), "x").unwrap();

        let config = config_for(root.to_path_buf(), vec!["old/**".to_string()]);
        let files = scan_filesystem(&config).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(names, vec!["a.rep", "b/c.gpx"]);
    }

    #[test]
    fn test_scan_requires_configured_root() {
        assert!(scan_filesystem(&Config::minimal()).is_err());
        let config = config_for(PathBuf::from("/no/such/root"), vec![]);
        assert!(scan_filesystem(&config).is_err());
    }
}
