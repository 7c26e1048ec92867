use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::emotion::ClassifierConfig;
use crate::materials::{DEFAULT_MAX_MATERIAL_BYTES, DEFAULT_MAX_SHELF_BYTES};
use crate::rewards::RewardUrls;
use crate::session::TargetSkill;

const MAX_STUDENT_NAME_CHARS: usize = 100;

/// Settings exposed to the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub default_student_name: String,
    pub default_target_skill: TargetSkill,
    pub strict_face_detection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("default_student_name must not be blank")]
    BlankStudentName,

    #[error("default_student_name must be at most {max} characters")]
    StudentNameTooLong { max: usize },
}

impl Settings {
    /// Every problem with these settings; empty when they can be saved
    pub fn validate(&self) -> Vec<SettingsError> {
        let mut errors = Vec::new();
        let name = self.default_student_name.trim();
        if name.is_empty() {
            errors.push(SettingsError::BlankStudentName);
        } else if name.chars().count() > MAX_STUDENT_NAME_CHARS {
            errors.push(SettingsError::StudentNameTooLong {
                max: MAX_STUDENT_NAME_CHARS,
            });
        }
        errors
    }
}

/// Internal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,
    /// Address the HTTP surface binds to
    pub bind_addr: String,
    /// Base URL of the DeepFace-compatible classifier service
    pub classifier_url: String,
    pub classifier_timeout_secs: u64,
    pub strict_face_detection: bool,
    pub default_student_name: String,
    pub default_target_skill: TargetSkill,
    pub reward_urls: RewardUrls,
    /// `None` waits indefinitely for the asset host
    pub asset_fetch_timeout_secs: Option<u64>,
    pub max_material_bytes: usize,
    /// Cap on all materials held by one session
    pub max_shelf_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            bind_addr: "127.0.0.1:8501".to_string(),
            classifier_url: "http://127.0.0.1:5005".to_string(),
            classifier_timeout_secs: 60,
            strict_face_detection: false,
            default_student_name: "Student A".to_string(),
            default_target_skill: TargetSkill::EmotionRecognition,
            reward_urls: RewardUrls::default(),
            asset_fetch_timeout_secs: None,
            max_material_bytes: DEFAULT_MAX_MATERIAL_BYTES,
            max_shelf_bytes: DEFAULT_MAX_SHELF_BYTES,
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".supporthub"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the log directory
    pub fn logs_dir() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("logs"))
    }

    /// Load config from file or return default
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                debug!("Failed to load config, using default: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load config from a specific file, defaulting when it does not exist
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_addr
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.bind_addr))
    }

    pub fn classifier_timeout(&self) -> Duration {
        Duration::from_secs(self.classifier_timeout_secs)
    }

    pub fn asset_fetch_timeout(&self) -> Option<Duration> {
        self.asset_fetch_timeout_secs.map(Duration::from_secs)
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            strict_face_detection: self.strict_face_detection,
        }
    }

    /// Convert to frontend Settings
    pub fn to_settings(&self) -> Settings {
        Settings {
            default_student_name: self.default_student_name.clone(),
            default_target_skill: self.default_target_skill,
            strict_face_detection: self.strict_face_detection,
        }
    }

    /// Update from frontend Settings
    pub fn update_from_settings(&mut self, settings: &Settings) {
        self.default_student_name = settings.default_student_name.trim().to_string();
        self.default_target_skill = settings.default_target_skill;
        self.strict_face_detection = settings.strict_face_detection;
    }
}
