use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use synthdb_generate::{CacheSettings, GeneratorSettings, LlmSettings, SampleSize};

use super::WorkspaceResult;
use super::atomic::write_bytes_atomic;

pub const DEFAULT_SETTINGS_FILE: &str = "synthdb.toml";

/// Contents of `synthdb.toml`. Every section may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthSettings {
    pub run_dir: PathBuf,
    pub sample_size: SampleSize,
    pub llm: LlmSettings,
    pub generator: GeneratorSettings,
    pub cache: CacheSettings,
}

impl Default for SynthSettings {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from("runs"),
            sample_size: SampleSize::default(),
            llm: LlmSettings::default(),
            generator: GeneratorSettings::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl SynthSettings {
    /// Prefer a key given on the command line or in the environment.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.llm.api_key = Some(key);
        }
        self
    }
}

pub fn load_or_create_settings(path: &Path) -> WorkspaceResult<SynthSettings> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let settings: SynthSettings = toml::from_str(&content)?;
        return Ok(settings);
    }

    let settings = SynthSettings::default();
    save_settings(path, &settings)?;
    Ok(settings)
}

/// Persist settings without the API key.
pub fn save_settings(path: &Path, settings: &SynthSettings) -> WorkspaceResult<()> {
    let mut stored = settings.clone();
    stored.llm.api_key = None;
    let encoded = toml::to_string_pretty(&stored)?;
    write_bytes_atomic(path, encoded.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_settings_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("synthdb-settings-{}", uuid::Uuid::new_v4()))
            .join(DEFAULT_SETTINGS_FILE)
    }

    #[test]
    fn creates_defaults_when_missing() {
        let path = temp_settings_path();
        let settings = load_or_create_settings(&path).unwrap();
        assert_eq!(settings, SynthSettings::default());
        assert!(path.exists());

        let reloaded = load_or_create_settings(&path).unwrap();
        assert_eq!(reloaded.generator.validation_threshold, 0.8);
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings: SynthSettings = toml::from_str(
            "sample_size = \"large\"\n[generator]\nretry_passes = 2\n[llm]\nmodel = \"local-model\"\n",
        )
        .unwrap();
        assert_eq!(settings.sample_size, SampleSize::Large);
        assert_eq!(settings.generator.retry_passes, 2);
        assert_eq!(settings.generator.reference_sample_size, 10);
        assert_eq!(settings.llm.model, "local-model");
        assert_eq!(settings.llm.timeout_secs, 120);
        assert_eq!(settings.run_dir, PathBuf::from("runs"));
    }

    #[test]
    fn api_key_override_and_save_strips_key() {
        let settings = SynthSettings::default().with_api_key(Some("sk-test".to_string()));
        assert_eq!(settings.llm.api_key.as_deref(), Some("sk-test"));
        let unchanged = settings.clone().with_api_key(Some("  ".to_string()));
        assert_eq!(unchanged.llm.api_key.as_deref(), Some("sk-test"));

        let path = temp_settings_path();
        save_settings(&path, &settings).unwrap();
        let stored = std::fs::read_to_string(&path).unwrap();
        assert!(!stored.contains("sk-test"));
        std::fs::remove_dir_all(path.parent().unwrap()).ok();
    }
}
