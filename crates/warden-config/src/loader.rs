//! Layered configuration loading.
//!
//! Layers apply in order, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML or JSON file
//! 3. A `.env` file, merged into the process environment
//! 4. `PREFIX__SECTION__KEY` environment variables

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{ConfigError, WardenConfig};

/// Builds a [`WardenConfig`] from layered sources.
///
/// # Example
///
/// ```no_run
/// use warden_config::ConfigLoader;
///
/// # fn main() -> Result<(), warden_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("warden.toml")?
///     .with_dotenv()?
///     .with_env_prefix("WARDEN")
///     .load()?;
///
/// println!("api listening on {}", config.web.api_host);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: WardenConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a TOML or JSON file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, or invalid.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        self.config = Self::parse_file(&content, path)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn with_optional_file(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in the given format.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    ///
    /// # Example
    ///
    /// ```
    /// use warden_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [web]
    ///     api_host = "127.0.0.1:3000"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.web.api_host, "127.0.0.1:3000");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => {
                return Err(ConfigError::validation_error(format!(
                    "unsupported configuration format: {format}"
                )))
            }
        };
        Ok(self)
    }

    /// Loads `.env` from the working directory into the environment.
    ///
    /// A missing `.env` is not an error. Variables already set win.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file exists but is malformed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(e.into()),
        }
    }

    /// Loads a specific env file into the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Dotenv` if the file is missing or malformed.
    pub fn with_dotenv_file(self, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.into())?;
        Ok(self)
    }

    /// Enables `PREFIX__SECTION__KEY` overrides, e.g.
    /// `WARDEN__WEB__API_HOST=0.0.0.0:8000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override cannot be parsed or validation
    /// fails.
    pub fn load(mut self) -> Result<WardenConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: HashMap<String, String> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            self.apply_env_vars(&prefix, &vars)?;
        }

        self.config.validate()?;
        Ok(self.config)
    }

    fn parse_file(content: &str, path: &Path) -> Result<WardenConfig, ConfigError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match extension.as_deref() {
            Some("toml") => Ok(toml::from_str(content)?),
            Some("json") => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            ))),
        }
    }

    fn apply_env_vars(
        &mut self,
        prefix: &str,
        vars: &HashMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (key, value) in vars {
            self.apply_env_var(key, value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(rest) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            // Shares the prefix but not the separator, e.g. WARDEN_HOME.
            return Ok(());
        };

        let parts: Vec<&str> = rest.split("__").collect();
        let web = &mut self.config.web;
        let auth = &mut self.config.auth;
        let telemetry = &mut self.config.telemetry;

        match parts.as_slice() {
            ["WEB", "API_HOST"] => web.api_host = value.to_string(),
            ["WEB", "DEBUG_HOST"] => web.debug_host = value.to_string(),
            ["WEB", "READ_TIMEOUT_SECS"] => web.read_timeout_secs = parse_secs(key, value)?,
            ["WEB", "WRITE_TIMEOUT_SECS"] => web.write_timeout_secs = parse_secs(key, value)?,
            ["WEB", "IDLE_TIMEOUT_SECS"] => web.idle_timeout_secs = parse_secs(key, value)?,
            ["WEB", "MAX_BODY_BYTES"] => {
                web.max_body_bytes = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer bytes"))?;
            }
            ["WEB", "SHUTDOWN_TIMEOUT_SECS"] => {
                web.shutdown_timeout_secs = parse_secs(key, value)?;
            }

            ["AUTH", "KEYS_FOLDER"] => auth.keys_folder = PathBuf::from(value),
            ["AUTH", "ACTIVE_KID"] => auth.active_kid = value.to_string(),
            ["AUTH", "ISSUER"] => auth.issuer = value.to_string(),

            ["TELEMETRY", "PROMETHEUS"] => telemetry.prometheus = parse_flag(key, value)?,
            ["TELEMETRY", "BUILD"] => telemetry.build = value.to_string(),
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                telemetry.logging.enabled = parse_flag(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => telemetry.logging.level = value.to_string(),
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                telemetry.logging.json_format = match value.to_lowercase().as_str() {
                    "json" => true,
                    "pretty" => false,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }

            _ => return Err(ConfigError::env_parse_error(key, "unknown configuration key")),
        }

        Ok(())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer seconds"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
