//! Where config layers live and how one is read.

use super::{
    ConfigLayer, ConfigLayerSource, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILE, SYSTEM_CONFIG_PATH,
    SYSTEM_REQUIREMENTS_PATH, schema,
};
use crate::ConfigError;
use directories::UserDirs;
use log::debug;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A layer file parsed and checked against the key schema.
#[derive(Debug, Clone)]
pub(super) struct LoadedLayer {
    pub(super) meta: ConfigLayer,
    pub(super) value: Value,
}

impl LoadedLayer {
    /// Read the layer at `path`; `Ok(None)` when the file does not exist.
    pub(super) fn read(source: ConfigLayerSource, path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no {} layer at {}", source.label(), path.display());
                return Ok(None);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let origin = format!("{} layer {}", source.label(), path.display());
        let value = parse_json5(&contents, &origin)?;
        schema::validate_layer_schema(&value, &origin)?;
        debug!("read {origin}");
        Ok(Some(Self {
            meta: ConfigLayer {
                source,
                path: path.to_path_buf(),
            },
            value,
        }))
    }
}

pub(super) fn parse_json5(contents: &str, origin: &str) -> Result<Value, ConfigError> {
    json5::from_str(contents).map_err(|source| ConfigError::Parse {
        origin: origin.to_string(),
        source,
    })
}

/// Default system, user and requirements locations, in that order.
pub(super) fn default_locations() -> (Option<PathBuf>, Option<PathBuf>, Option<PathBuf>) {
    let user = UserDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(DEFAULT_CONFIG_DIR)
            .join(DEFAULT_CONFIG_FILE)
    });
    (
        Some(PathBuf::from(SYSTEM_CONFIG_PATH)),
        user,
        Some(PathBuf::from(SYSTEM_REQUIREMENTS_PATH)),
    )
}

/// Absolute form of `cwd`, left untouched when it cannot be resolved.
pub(super) fn resolve_cwd(cwd: &Path) -> Result<PathBuf, ConfigError> {
    match cwd.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(cwd.to_path_buf()),
        Err(source) => Err(ConfigError::Read {
            path: cwd.to_path_buf(),
            source,
        }),
    }
}

/// Closest directory at or above `cwd` holding any of `markers`.
pub(super) fn project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}

/// Layer files in precedence order (lowest first), with duplicates reached
/// through different candidates removed.
pub(super) fn local_candidates(
    system: Option<&Path>,
    user: Option<&Path>,
    cwd: &Path,
    root: Option<&Path>,
) -> Vec<(ConfigLayerSource, PathBuf)> {
    let mut candidates = Vec::new();
    candidates.extend(system.map(|path| (ConfigLayerSource::System, path.to_path_buf())));
    candidates.extend(user.map(|path| (ConfigLayerSource::User, path.to_path_buf())));
    candidates.extend(root.map(|root| (ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE))));
    candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));
    candidates.extend(root.map(|root| {
        (
            ConfigLayerSource::Repo,
            root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
        )
    }));

    let mut seen = Vec::new();
    candidates.retain(|(source, path)| {
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if seen.contains(&key) {
            debug!("{} layer {} already listed", source.label(), path.display());
            return false;
        }
        seen.push(key);
        true
    });
    candidates
}
