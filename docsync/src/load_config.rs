/// `load_config` module: loads the optional YAML settings file and turns it, plus the
/// CLI root argument, into the core `SynchroniseConfig`.
///
/// # Responsibilities
/// - Locate the settings file (`DOCSYNC_CONFIG`, else `docsync.yaml` in the working directory)
/// - Parse it into [`Settings`]; every key is optional and falls back to a default
/// - Map loosely-typed YAML values (mode names, extension presets) onto core enums
///
/// Credentials are not part of the file: the service clients read them from the
/// environment when they are constructed.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{bail, Context, Result};
use docsync_core::config::{SynchroniseConfig, DEFAULT_COOLDOWN};
use docsync_core::render::DEFAULT_DIAGRAM_BASE_URL;
use docsync_core::request::{RequestSettings, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use docsync_core::scan::ExtensionSet;
use docsync_core::units::{SizeLimits, UnitMode, DEFAULT_MAX_FILE_BYTES};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Settings file looked up in the working directory when `DOCSYNC_CONFIG` is unset.
pub const DEFAULT_SETTINGS_FILE: &str = "docsync.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
    PerFile,
    Feature,
}

/// Either a preset name (`general`, `frontend`) or an explicit list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtensionsSetting {
    Preset(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub mode: ModeSetting,
    /// Feature mode unit key; defaults to the root directory's name.
    pub feature_name: Option<String>,
    pub extensions: ExtensionsSetting,
    pub max_file_bytes: u64,
    pub max_feature_bytes: Option<u64>,
    pub cooldown_ms: u64,
    pub model: String,
    pub max_tokens: u32,
    pub diagram_base_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: ModeSetting::PerFile,
            feature_name: None,
            extensions: ExtensionsSetting::Preset("general".to_string()),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_feature_bytes: None,
            cooldown_ms: DEFAULT_COOLDOWN.as_millis() as u64,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            diagram_base_url: DEFAULT_DIAGRAM_BASE_URL.to_string(),
        }
    }
}

fn extension_set(setting: ExtensionsSetting) -> Result<ExtensionSet> {
    match setting {
        ExtensionsSetting::Preset(name) => match name.as_str() {
            "general" => Ok(ExtensionSet::General),
            "frontend" => Ok(ExtensionSet::Frontend),
            other => {
                error!(extensions = %other, "Unsupported extensions preset in settings");
                bail!("Unsupported extensions preset: {other} (expected general, frontend or a list)")
            }
        },
        ExtensionsSetting::List(list) if list.is_empty() => {
            bail!("extensions list must not be empty")
        }
        ExtensionsSetting::List(list) => Ok(ExtensionSet::Custom(list)),
    }
}

fn default_feature_name(root: &Path) -> String {
    let resolved = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feature".to_string())
}

impl Settings {
    /// Combine with the scan root into the core run configuration.
    pub fn into_config(self, root: PathBuf) -> Result<SynchroniseConfig> {
        let mode = match self.mode {
            ModeSetting::PerFile => UnitMode::PerFile,
            ModeSetting::Feature => UnitMode::Feature {
                name: self
                    .feature_name
                    .clone()
                    .unwrap_or_else(|| default_feature_name(&root)),
            },
        };
        let config = SynchroniseConfig {
            mode,
            extensions: extension_set(self.extensions)?,
            limits: SizeLimits {
                per_file: self.max_file_bytes,
                feature: self.max_feature_bytes,
            },
            request: RequestSettings {
                model: self.model,
                max_tokens: self.max_tokens,
            },
            cooldown: Duration::from_millis(self.cooldown_ms),
            diagram_base_url: self.diagram_base_url,
            root,
        };
        config.trace_loaded();
        Ok(config)
    }
}

/// Parse settings from an explicit file. Missing, unreadable or invalid files are errors.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    info!(settings_path = ?path_ref, "Loading settings from file");

    let content = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read settings file {:?}", path_ref))?;
    if content.trim().is_empty() {
        info!(settings_path = ?path_ref, "Settings file is empty; using defaults");
        return Ok(Settings::default());
    }

    let settings: Settings = match serde_yaml::from_str(&content) {
        Ok(settings) => {
            info!(settings_path = ?path_ref, "Parsed settings YAML successfully");
            settings
        }
        Err(e) => {
            error!(error = ?e, settings_path = ?path_ref, "Failed to parse settings YAML");
            return Err(anyhow::anyhow!("Failed to parse settings YAML: {e}"));
        }
    };
    Ok(settings)
}

/// Settings for this run: `DOCSYNC_CONFIG` if set, else `docsync.yaml` if present, else defaults.
pub fn resolve_settings() -> Result<Settings> {
    if let Ok(explicit) = std::env::var("DOCSYNC_CONFIG") {
        return load_settings(explicit);
    }
    let default_path = Path::new(DEFAULT_SETTINGS_FILE);
    if default_path.is_file() {
        return load_settings(default_path);
    }
    info!("No settings file found; using defaults");
    Ok(Settings::default())
}
