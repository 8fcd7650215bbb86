use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::schema::Difficulty;

pub const MIN_QUESTIONS: u32 = 1;
pub const MAX_QUESTIONS: u32 = 20;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Used for notes, flashcards and answer evaluation.
    #[serde(default = "default_fast_model")]
    pub fast_model: String,
    /// Used for question-paper analysis and mock-test generation.
    #[serde(default = "default_reasoning_model")]
    pub reasoning_model: String,
    #[serde(default = "default_notes_temperature")]
    pub notes_temperature: f64,
    #[serde(default = "default_question_count")]
    pub default_question_count: u32,
    #[serde(default)]
    pub default_difficulty: Difficulty,
    /// Directory whose files override the bundled syllabus.
    #[serde(default)]
    pub syllabus_dir: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_api_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}
fn default_api_key_env() -> String {
    "API_KEY".to_string()
}
fn default_fast_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_reasoning_model() -> String {
    "gemini-2.5-pro".to_string()
}
fn default_notes_temperature() -> f64 {
    crate::gateway::prompts::NOTES_TEMPERATURE
}
fn default_question_count() -> u32 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            api_base_url: default_api_base_url(),
            api_key_env: default_api_key_env(),
            fast_model: default_fast_model(),
            reasoning_model: default_reasoning_model(),
            notes_temperature: default_notes_temperature(),
            default_question_count: default_question_count(),
            default_difficulty: Difficulty::default(),
            syllabus_dir: None,
            log_level: default_log_level(),
        }
    }
}

fn restore_blank(value: &mut String, default: fn() -> String) {
    if value.trim().is_empty() {
        *value = default();
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("examprep")
            .join("config.toml")
    }

    /// Clamp out-of-range values and restore blank strings to their defaults.
    pub fn validate(&mut self) {
        self.default_question_count = self
            .default_question_count
            .clamp(MIN_QUESTIONS, MAX_QUESTIONS);
        if !(0.0..=2.0).contains(&self.notes_temperature) {
            self.notes_temperature = default_notes_temperature();
        }
        restore_blank(&mut self.api_base_url, default_api_base_url);
        restore_blank(&mut self.api_key_env, default_api_key_env);
        restore_blank(&mut self.fast_model, default_fast_model);
        restore_blank(&mut self.reasoning_model, default_reasoning_model);
    }

    /// Read the API key once: the configured variable first, then `GEMINI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        [self.api_key_env.as_str(), "GEMINI_API_KEY"]
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.trim().is_empty())
    }
}
