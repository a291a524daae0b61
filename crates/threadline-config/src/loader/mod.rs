//! `threadline.json5` loading.
//!
//! A layered load reads every layer that exists, checks each one's keys, and
//! overlays them in precedence order. Keys set in the requirements layer win
//! over everything else.

mod discovery;
mod merge;
mod schema;


use crate::{ConfigError, ThreadlineConfig};
use discovery::LoadedLayer;
use log::{debug, info};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Config filename looked up in local layers.
const DEFAULT_CONFIG_FILE: &str = "threadline.json5";
/// Config directory under the home directory or a repo root.
const DEFAULT_CONFIG_DIR: &str = ".threadline";
const PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

#[cfg(unix)]
const SYSTEM_CONFIG_PATH: &str = "/etc/threadline/threadline.json5";
#[cfg(unix)]
const SYSTEM_REQUIREMENTS_PATH: &str = "/etc/threadline/requirements.json5";
#[cfg(windows)]
const SYSTEM_CONFIG_PATH: &str = "C:\\ProgramData\\threadline\\threadline.json5";
#[cfg(windows)]
const SYSTEM_REQUIREMENTS_PATH: &str = "C:\\ProgramData\\threadline\\requirements.json5";

/// Result of [`ThreadlineConfig::load_layered`].
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub config: ThreadlineConfig,
    /// Layers that existed on disk, requirements first.
    pub layers: Vec<ConfigLayer>,
}

/// Where a layer came from. Later variants override earlier ones, except
/// `Requirements`, whose keys are locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigLayerSource {
    Requirements,
    System,
    User,
    /// `threadline.json5` at the project root.
    Project,
    Cwd,
    /// `.threadline/threadline.json5` at the project root.
    Repo,
    Runtime,
}

impl ConfigLayerSource {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::System => "system",
            Self::User => "user",
            Self::Project => "project",
            Self::Cwd => "cwd",
            Self::Repo => "repo",
            Self::Runtime => "runtime",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Layer locations for [`ThreadlineConfig::load_layered_with_options`].
/// `None` skips that layer.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    pub cwd: PathBuf,
    pub system_config_path: Option<PathBuf>,
    pub user_config_path: Option<PathBuf>,
    pub requirements_path: Option<PathBuf>,
    /// Applied last, in order. A missing file is an error.
    pub runtime_paths: Vec<PathBuf>,
    /// Entries whose presence marks the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        let (system_config_path, user_config_path, requirements_path) =
            discovery::default_locations();
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            system_config_path,
            user_config_path,
            requirements_path,
            runtime_paths: vec![],
            project_root_markers: PROJECT_ROOT_MARKERS.iter().copied().map(String::from).collect(),
        }
    }

    pub fn with_runtime_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.runtime_paths.push(path.into());
        self
    }
}

impl ThreadlineConfig {
    /// Read one file, ignoring every other layer.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("reading single config file {}", path.display());
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_from_str(&contents)
    }

    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        let value = discovery::parse_json5(contents, "config")?;
        schema::validate_layer_schema(&value, "config")?;
        config_from_value(value)
    }

    /// Layered load from the default locations around `cwd`.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations.
    ///
    /// Precedence (low -> high): system, user, project, cwd, repo, runtime.
    /// Any key present in the requirements layer is locked to its value.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = discovery::resolve_cwd(&options.cwd)?;
        let project_root = discovery::project_root(&cwd, &options.project_root_markers);
        debug!(
            "resolving config layers (cwd={}, project_root={:?})",
            cwd.display(),
            project_root
        );

        let requirements = match &options.requirements_path {
            Some(path) => LoadedLayer::read(ConfigLayerSource::Requirements, path)?,
            None => None,
        };

        let candidates = discovery::local_candidates(
            options.system_config_path.as_deref(),
            options.user_config_path.as_deref(),
            &cwd,
            project_root.as_deref(),
        );
        let mut loaded = Vec::new();
        for (source, path) in candidates {
            loaded.extend(LoadedLayer::read(source, &path)?);
        }
        for path in &options.runtime_paths {
            let layer = LoadedLayer::read(ConfigLayerSource::Runtime, path)?
                .ok_or_else(|| ConfigError::MissingRuntimeLayer(path.clone()))?;
            loaded.push(layer);
        }

        let constraints = requirements.as_ref().map(|layer| &layer.value);
        let mut merged = Value::Object(Default::default());
        if let Some(constraints) = constraints {
            merge::overlay(&mut merged, constraints);
        }
        for layer in &loaded {
            merge::overlay_constrained(&mut merged, &layer.value, constraints);
        }

        let mut layers: Vec<ConfigLayer> = requirements.iter().map(|l| l.meta.clone()).collect();
        layers.extend(loaded.into_iter().map(|layer| layer.meta));

        schema::validate_layer_schema(&merged, "effective")?;
        let config = config_from_value(merged)?;
        info!(
            "config resolved from {} layer(s): {}",
            layers.len(),
            layers
                .iter()
                .map(|layer| layer.source.label())
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(LayeredConfig { config, layers })
    }

    /// Validate invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.migration.page_size == 0 {
            return Err(ConfigError::invalid(
                "migration.page_size",
                "must be greater than zero",
            ));
        }
        if self.completion.max_continuation_steps == 0 {
            return Err(ConfigError::invalid(
                "completion.max_continuation_steps",
                "must be at least one",
            ));
        }
        Ok(())
    }
}

fn config_from_value(value: Value) -> Result<ThreadlineConfig, ConfigError> {
    let config: ThreadlineConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
