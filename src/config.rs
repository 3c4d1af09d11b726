//! Workbench settings, stored as JSON in the user's config directory.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{collaborators::Language, logging, slots::DEFAULT_SLOT_COUNT};

const SETTINGS_ENV: &str = "CP_WORKBENCH_SETTINGS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub compile_command: String,
    /// Interpreter or launcher for Java and Python. Empty picks `java` / `python3`.
    pub run_command: String,
    /// Prefix for every run, e.g. `time` or `valgrind`.
    pub prepend_run_command: String,
    pub format_command: String,
    pub template_path: Option<PathBuf>,
    pub save_tests: bool,
    pub language: Language,
    pub slot_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compile_command: "g++ -Wall".to_string(),
            run_command: String::new(),
            prepend_run_command: String::new(),
            format_command: "clang-format".to_string(),
            template_path: None,
            save_tests: true,
            language: Language::Cpp,
            slot_count: DEFAULT_SLOT_COUNT,
        }
    }
}

impl Settings {
    /// Reads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings {path:?}"))?;
        let mut settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings {path:?}"))?;
        settings.slot_count = settings.slot_count.max(1);

        logging::with_workbench_subscriber(|| {
            tracing::info!(
                target: "workbench.config",
                path = %path.display(),
                slots = settings.slot_count,
                "Settings loaded"
            );
        });
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings dir {parent:?}"))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write settings {path:?}"))?;
        Ok(())
    }

    /// Loads from [`default_settings_path`].
    pub fn load_or_default() -> Result<Self> {
        Self::load(&default_settings_path())
    }
}

pub fn default_settings_path() -> PathBuf {
    if let Ok(path) = std::env::var(SETTINGS_ENV) {
        return PathBuf::from(path);
    }

    directories::ProjectDirs::from("dev", "cp-workbench", "cp-workbench")
        .map(|dirs| dirs.config_dir().join("settings.json"))
        .unwrap_or_else(|| PathBuf::from("settings.json"))
}
