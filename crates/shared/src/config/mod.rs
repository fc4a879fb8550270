// Configuration module
// Reads INI-style configuration files with environment variable overrides

use configparser::ini::Ini;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;

/// Section name configparser uses for keys outside any [Section]
const DEFAULT_SECTION: &str = "default";

/// Global configuration singleton
static CONFIG: once_cell::sync::Lazy<Mutex<Config>> =
    once_cell::sync::Lazy::new(|| Mutex::new(Config::new()));

/// Get a reference to the global config instance
pub fn get_config() -> &'static Mutex<Config> {
    &CONFIG
}

/// Configuration file parser
/// Keys in the default section are stored as `Key`, keys inside a
/// `[Section]` as `Section.Key`.
pub struct Config {
    values: HashMap<String, String>,
    filename: String,
    env_prefix: String,
}

impl Config {
    pub fn new() -> Self {
        Config {
            values: HashMap::new(),
            filename: String::new(),
            env_prefix: String::new(),
        }
    }

    /// Load configuration from a file
    /// env_prefix is used to check environment variables (e.g., "ChunkNav_")
    pub fn set_source(&mut self, filename: &str, env_prefix: &str) -> bool {
        self.filename = filename.to_string();
        self.env_prefix = env_prefix.to_string();
        self.reload()
    }

    /// Reload the configuration file
    pub fn reload(&mut self) -> bool {
        self.values.clear();

        let mut ini = Ini::new_cs();
        match ini.load(Path::new(&self.filename)) {
            Ok(map) => {
                self.absorb(map);
                true
            }
            Err(e) => {
                tracing::debug!("Config: cannot load '{}': {}", self.filename, e);
                false
            }
        }
    }

    /// Parse configuration text directly (no file involved)
    pub fn load_from_str(&mut self, content: &str, env_prefix: &str) -> bool {
        self.values.clear();
        self.env_prefix = env_prefix.to_string();

        let mut ini = Ini::new_cs();
        match ini.read(content.to_string()) {
            Ok(map) => {
                self.absorb(map);
                true
            }
            Err(e) => {
                tracing::error!("Config: parse error: {}", e);
                false
            }
        }
    }

    fn absorb(&mut self, map: HashMap<String, HashMap<String, Option<String>>>) {
        for (section, entries) in map {
            for (key, value) in entries {
                let Some(mut value) = value else { continue };

                // Strip quotes
                if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
                    value = value[1..value.len() - 1].to_string();
                }

                let full_key = if section == DEFAULT_SECTION {
                    key
                } else {
                    format!("{}.{}", section, key)
                };
                self.values.insert(full_key, value);
            }
        }
    }

    /// Check if a key is set
    pub fn is_set(&self, key: &str) -> bool {
        self.get_env_or_config(key).is_some()
    }

    /// Get a string value with a default
    pub fn get_string_default(&self, key: &str, default: &str) -> String {
        self.get_env_or_config(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Get a string value (empty string default)
    pub fn get_string(&self, key: &str) -> String {
        self.get_string_default(key, "")
    }

    /// Get a boolean value with a default
    pub fn get_bool_default(&self, key: &str, default: bool) -> bool {
        match self.get_env_or_config(key) {
            Some(val) => {
                let lower = val.to_lowercase();
                matches!(lower.as_str(), "1" | "true" | "yes")
            }
            None => default,
        }
    }

    /// Get an integer value with a default
    pub fn get_int_default(&self, key: &str, default: i32) -> i32 {
        match self.get_env_or_config(key) {
            Some(val) => val.parse().unwrap_or(default),
            None => default,
        }
    }

    /// Get a float value with a default
    pub fn get_float_default(&self, key: &str, default: f32) -> f32 {
        match self.get_env_or_config(key) {
            Some(val) => val.parse().unwrap_or(default),
            None => default,
        }
    }

    /// Try environment variable first, then config file
    fn get_env_or_config(&self, key: &str) -> Option<String> {
        // Convert key to env var name: replace '.' with '_', add prefix
        if !self.env_prefix.is_empty() {
            let env_key = format!("{}{}", self.env_prefix, key.replace('.', "_"));
            if let Ok(val) = std::env::var(&env_key) {
                return Some(val);
            }
        }

        self.values.get(key).cloned()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.get_int_default("nonexistent", 42), 42);
        assert_eq!(config.get_string_default("nonexistent", "hello"), "hello");
        assert!(config.get_bool_default("nonexistent", true));
    }

    #[test]
    fn test_sections_and_quotes() {
        let mut config = Config::new();
        let text = "LogsDir = \"logs\"\nLogLevel = 3\n\n[Navigation]\nUseGirthGrids = 0\nDefaultGirth = 2.5\n";
        assert!(config.load_from_str(text, ""));
        assert_eq!(config.get_string("LogsDir"), "logs");
        assert_eq!(config.get_int_default("LogLevel", 0), 3);
        assert!(!config.get_bool_default("Navigation.UseGirthGrids", true));
        assert_eq!(config.get_float_default("Navigation.DefaultGirth", 0.5), 2.5);
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::new();
        assert!(config.load_from_str("[Navigation]\nUseGirthGrids = 1\n", "ChunkNavTest_"));
        // SAFETY: the variable name is unique to this test
        unsafe { std::env::set_var("ChunkNavTest_Navigation_UseGirthGrids", "no") };
        assert!(!config.get_bool_default("Navigation.UseGirthGrids", true));
        unsafe { std::env::remove_var("ChunkNavTest_Navigation_UseGirthGrids") };
        assert!(config.get_bool_default("Navigation.UseGirthGrids", false));
    }
}
