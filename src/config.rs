use anyhow::{Context, Result};
use std::collections::BTreeMap;
#[cfg(test)]
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::translator::TranslationError;

pub const KEY_API_KEY: &str = "openrouterApiKey";
pub const KEY_MODEL: &str = "selectedModel";
pub const KEY_CUSTOM_MODEL: &str = "customModel";
pub const KEY_THEME: &str = "theme";
pub const KEY_TIMEOUT: &str = "requestTimeoutSecs";

pub const CUSTOM_MODEL: &str = "custom";

/// Models offered in the selector, in display order. The first entry is the default.
pub const MODEL_PRESETS: &[&str] = &[
    "openai/gpt-4o-mini",
    "anthropic/claude-3.5-sonnet",
    "google/gemini-flash-1.5",
    "deepseek/deepseek-chat",
    "meta-llama/llama-3.1-70b-instruct",
    CUSTOM_MODEL,
];

/// String key/value persistence. Anything that can remember a few strings will do.
pub trait PreferenceStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat JSON object on disk; rewritten on every `set`.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn default_path() -> PathBuf {
        crate::logger::exe_dir().join("config.json")
    }

    /// A file that is not a JSON object is moved aside to `<name>.bak` so the
    /// next `set` cannot overwrite what the user had.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<BTreeMap<String, serde_json::Value>>(&s) {
                Ok(raw) => flatten_values(raw),
                Err(e) => {
                    let backup = backup_path(&path);
                    match fs::rename(&path, &backup) {
                        Ok(()) => tracing::warn!(
                            "unreadable {} ({}), moved to {}",
                            path.display(),
                            e,
                            backup.display()
                        ),
                        Err(re) => tracing::warn!(
                            "unreadable {} ({}), backup failed: {}",
                            path.display(),
                            e,
                            re
                        ),
                    }
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, values }
    }

    fn save(&self) -> Result<()> {
        let s = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, s).with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}

/// Hand-edited files may hold numbers or booleans; keep those as their JSON text.
fn flatten_values(raw: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    raw.into_iter()
        .filter_map(|(key, value)| match value {
            serde_json::Value::String(s) => Some((key, s)),
            serde_json::Value::Number(_) | serde_json::Value::Bool(_) => {
                Some((key, value.to_string()))
            }
            other => {
                tracing::warn!("ignoring non-scalar preference {} = {}", key, other);
                None
            }
        })
        .collect()
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.save()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(s: &str) -> Self {
        if s == "dark" {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelChoice {
    Preset(String),
    Custom,
}

impl ModelChoice {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" => ModelChoice::Preset(MODEL_PRESETS[0].to_string()),
            CUSTOM_MODEL => ModelChoice::Custom,
            id => ModelChoice::Preset(id.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ModelChoice::Preset(id) => id,
            ModelChoice::Custom => CUSTOM_MODEL,
        }
    }
}

impl Default for ModelChoice {
    fn default() -> Self {
        ModelChoice::Preset(MODEL_PRESETS[0].to_string())
    }
}

impl fmt::Display for ModelChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view over a [`PreferenceStore`]. Setters write through immediately.
pub struct Preferences {
    store: Box<dyn PreferenceStore>,
    api_key: String,
    model: ModelChoice,
    custom_model: String,
    theme: Theme,
    timeout: Option<Duration>,
}

impl Preferences {
    pub fn load(store: Box<dyn PreferenceStore>) -> Self {
        let api_key = store.get(KEY_API_KEY).unwrap_or_default();
        let model = store
            .get(KEY_MODEL)
            .map(|s| ModelChoice::parse(&s))
            .unwrap_or_default();
        let custom_model = store.get(KEY_CUSTOM_MODEL).unwrap_or_default();
        let theme = store
            .get(KEY_THEME)
            .map(|s| Theme::parse(&s))
            .unwrap_or_default();
        let timeout = store.get(KEY_TIMEOUT).and_then(|s| parse_timeout(&s));
        Self { store, api_key, model, custom_model, theme, timeout }
    }

    /// Environment values win over the stored ones for this run only.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(v) = present("OPENROUTER_API_KEY") {
            self.api_key = v.trim().to_string();
        }
        if let Some(v) = present("OPENROUTER_MODEL") {
            self.model = ModelChoice::parse(&v);
        }
        if let Some(t) = present("OPENROUTER_TIMEOUT_SECS").and_then(|v| parse_timeout(&v)) {
            self.timeout = Some(t);
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn model(&self) -> &ModelChoice {
        &self.model
    }

    pub fn custom_model(&self) -> &str {
        &self.custom_model
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Returns `false` (and stores nothing) when the trimmed key is empty.
    pub fn save_api_key(&mut self, raw: &str) -> Result<bool> {
        let key = raw.trim();
        if key.is_empty() {
            return Ok(false);
        }
        self.store.set(KEY_API_KEY, key)?;
        self.api_key = key.to_string();
        Ok(true)
    }

    pub fn select_model(&mut self, id: &str) -> Result<()> {
        let choice = ModelChoice::parse(id);
        self.store.set(KEY_MODEL, choice.as_str())?;
        self.model = choice;
        Ok(())
    }

    pub fn set_custom_model(&mut self, raw: &str) -> Result<()> {
        let name = raw.trim();
        self.store.set(KEY_CUSTOM_MODEL, name)?;
        self.custom_model = name.to_string();
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let next = self.theme.toggle();
        self.store.set(KEY_THEME, next.as_str())?;
        self.theme = next;
        Ok(next)
    }

    pub fn resolved_model(&self) -> Result<String, TranslationError> {
        match &self.model {
            ModelChoice::Preset(id) => Ok(id.clone()),
            ModelChoice::Custom => {
                let name = self.custom_model.trim();
                if name.is_empty() {
                    Err(TranslationError::MissingCustomModel)
                } else {
                    Ok(name.to_string())
                }
            }
        }
    }
}

fn parse_timeout(s: &str) -> Option<Duration> {
    s.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}
