use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

pub const CONFIG_FILENAME: &str = ".adr";
pub const DEFAULT_RECORDS_DIR: &str = "docs/adr";

pub const SETTING_RECORDS_DIR: &str = "records-dir";
pub const SETTING_ADR_ONLY_REPO: &str = "adr-only-repo";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Setting '{0}' is not supported")]
    SettingNotSupported(String),
    #[error("Config file {} contains unsupported setting(s): {}", .path.display(), .settings.join(", "))]
    FileSettingsNotSupported { path: PathBuf, settings: Vec<String> },
    #[error("Setting '{key}' expects 'true' or 'false', got '{value}'")]
    InvalidValue { key: String, value: String },
}

/// A supported setting: the section it lives in and its default value.
#[derive(Debug, Clone, Copy)]
pub struct Setting {
    pub key: &'static str,
    pub section: &'static str,
    pub default: &'static str,
}

pub const SETTINGS: [Setting; 2] = [
    Setting {
        key: SETTING_ADR_ONLY_REPO,
        section: "git",
        default: "false",
    },
    Setting {
        key: SETTING_RECORDS_DIR,
        section: "adr",
        default: DEFAULT_RECORDS_DIR,
    },
];

pub fn setting(key: &str) -> Result<&'static Setting, ConfigError> {
    SETTINGS
        .iter()
        .find(|setting| setting.key == key)
        .ok_or_else(|| ConfigError::SettingNotSupported(key.to_string()))
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILENAME)
}

/// Closest ancestor of `start` holding a config file.
pub fn find_config_root(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start
        .ancestors()
        .find(|candidate| config_path(candidate).is_file())
        .map(Path::to_path_buf)
}

/// Settings resolved for one invocation. Values that were never set fall back to
/// their defaults and are not written back to the file.
#[derive(Debug, Clone)]
pub struct AdrConfig {
    root: PathBuf,
    values: BTreeMap<String, String>,
    other_sections: Table,
}

impl AdrConfig {
    pub fn with_root(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            values: BTreeMap::new(),
            other_sections: Table::new(),
        }
    }

    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::with_root(root);
        let path = config_path(root);
        if !path.is_file() {
            return Ok(config);
        }
        let text = fs::read_to_string(&path)?;
        let table: Table = toml::from_str(&text)?;

        let mut unsupported = Vec::new();
        for (section_name, section) in table {
            let is_known_section = SETTINGS.iter().any(|s| s.section == section_name);
            let entries = match section {
                Value::Table(entries) => entries,
                other => {
                    if is_known_section {
                        unsupported.push(section_name);
                    } else {
                        config.other_sections.insert(section_name, other);
                    }
                    continue;
                }
            };
            if !is_known_section {
                config
                    .other_sections
                    .insert(section_name, Value::Table(entries));
                continue;
            }
            for (key, value) in entries {
                let supported = SETTINGS
                    .iter()
                    .any(|s| s.section == section_name && s.key == key);
                if !supported {
                    unsupported.push(format!("{}.{}", section_name, key));
                    continue;
                }
                config.values.insert(key, value_to_string(&value));
            }
        }
        if !unsupported.is_empty() {
            unsupported.sort();
            return Err(ConfigError::FileSettingsNotSupported {
                path,
                settings: unsupported,
            });
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self) -> PathBuf {
        config_path(&self.root)
    }

    pub fn get(&self, key: &str) -> Result<String, ConfigError> {
        let setting = setting(key)?;
        Ok(self
            .values
            .get(key)
            .cloned()
            .unwrap_or_else(|| setting.default.to_string()))
    }

    /// Sets a value in memory; call [`AdrConfig::persist`] to write it.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        setting(key)?;
        if key == SETTING_ADR_ONLY_REPO && value != "true" && value != "false" {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: value.to_string(),
            });
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), ConfigError> {
        setting(key)?;
        self.values.remove(key);
        Ok(())
    }

    /// Effective value of every supported setting, sorted by key.
    pub fn list(&self) -> BTreeMap<String, String> {
        SETTINGS
            .iter()
            .map(|setting| {
                let value = self
                    .values
                    .get(setting.key)
                    .cloned()
                    .unwrap_or_else(|| setting.default.to_string());
                (setting.key.to_string(), value)
            })
            .collect()
    }

    pub fn records_dir(&self) -> PathBuf {
        let value = self
            .values
            .get(SETTING_RECORDS_DIR)
            .map(String::as_str)
            .unwrap_or(DEFAULT_RECORDS_DIR);
        self.root.join(value)
    }

    pub fn adr_only_repo(&self) -> bool {
        self.values
            .get(SETTING_ADR_ONLY_REPO)
            .map(|value| value == "true")
            .unwrap_or(false)
    }

    pub fn persist(&self) -> Result<PathBuf, ConfigError> {
        let mut table = Table::new();
        for setting in SETTINGS.iter() {
            let section = table
                .entry(setting.section.to_string())
                .or_insert(Value::Table(Table::new()));
            if let (Value::Table(entries), Some(value)) = (section, self.values.get(setting.key)) {
                entries.insert(setting.key.to_string(), Value::String(value.clone()));
            }
        }
        for (name, value) in &self.other_sections {
            table.insert(name.clone(), value.clone());
        }
        let path = self.path();
        let body = toml::to_string_pretty(&table)?;
        fs::write(&path, body)?;
        Ok(path)
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
