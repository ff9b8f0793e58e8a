//! Filesystem loader — resolves places to JSON/TOML documents.
//!
//! A place resolves to either the single file `<root>/<place>.{json,toml}`
//! (the file wins when both exist) or the directory `<root>/<place>/`.
//! Directory scans honor the rule's recursion and include/exclude controls
//! and enumerate case-insensitively in lexical path order, so execution
//! over the results is reproducible.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use atelier_core::error::LoadError;
use atelier_core::loader::{LoadedValue, Loader, ScanSpec};
use atelier_core::naming::normalize_path;
use serde_json::Value;
use tracing::debug;

/// File extensions recognized as value documents.
const EXTENSIONS: &[&str] = &["json", "toml"];

/// Loader rooted at one configuration directory.
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsLoader { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the single value file for a place, if any.
    fn place_file(&self, place: &str) -> Option<PathBuf> {
        EXTENSIONS
            .iter()
            .map(|ext| self.root.join(format!("{place}.{ext}")))
            .find(|path| path.is_file())
    }

    /// Collect relative paths of value files under `dir`.
    fn scan_dir(
        dir: &Path,
        prefix: &str,
        spec: &ScanSpec<'_>,
        found: &mut Vec<String>,
    ) -> Result<(), LoadError> {
        let entries = fs::read_dir(dir).map_err(|e| LoadError::Io {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| LoadError::Io {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };

            let file_type = entry.file_type().map_err(|e| LoadError::Io {
                path: entry.path(),
                reason: e.to_string(),
            })?;

            if file_type.is_dir() {
                if spec.recursive && spec.admits(&relative) {
                    Self::scan_dir(&entry.path(), &relative, spec, found)?;
                }
                continue;
            }

            let recognized = Path::new(&name)
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if recognized && spec.admits(&relative) {
                found.push(relative);
            }
        }

        Ok(())
    }

    /// Parse one value document.
    fn read_value(path: &Path) -> Result<Value, LoadError> {
        let text = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Io {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "toml");

        if is_toml {
            let value: toml::Value = toml::from_str(&text).map_err(|e| LoadError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
            serde_json::to_value(value).map_err(|e| LoadError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        } else {
            serde_json::from_str(&text).map_err(|e| LoadError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }

    fn loaded(&self, absolute: PathBuf, relative: &str) -> Result<LoadedValue, LoadError> {
        let value = Self::read_value(&absolute)?;
        let relative_stripped = strip_extension(relative);
        Ok(LoadedValue {
            filename: normalize_path(relative),
            relative_path: relative_stripped,
            path: absolute,
            value,
        })
    }
}

/// Drop the final extension from a relative path.
fn strip_extension(relative: &str) -> String {
    match relative.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => stem.to_string(),
        _ => relative.to_string(),
    }
}

impl Loader for FsLoader {
    fn resolve(&self, place: &str, spec: &ScanSpec<'_>) -> Result<Vec<LoadedValue>, LoadError> {
        if let Some(file) = self.place_file(place) {
            debug!(place, path = %file.display(), "Resolved place to single file");
            let basename = place.rsplit('/').next().unwrap_or(place);
            return Ok(vec![self.loaded(file, basename)?]);
        }

        let dir = self.root.join(place);
        if !dir.is_dir() {
            debug!(place, "No value backing place");
            return Ok(Vec::new());
        }

        let mut relatives = Vec::new();
        Self::scan_dir(&dir, "", spec, &mut relatives)?;
        relatives.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });

        debug!(place, files = relatives.len(), "Scanned place directory");

        relatives
            .into_iter()
            .map(|relative| self.loaded(dir.join(&relative), &relative))
            .collect()
    }
}
