use crate::core::ConfigProvider;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{validate_one_of, validate_positive_number, validate_url, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const LOG_FORMATS: [&str; 2] = ["compact", "json"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Refetch the whole graph after every confirmed mutation instead of
    /// only broadcasting an invalidation.
    pub refetch_after_confirm: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub verbose: Option<bool>,
    /// `compact` or `json`
    pub format: Option<String>,
}

impl TomlConfig {
    /// Loads and parses a config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables stay
    /// as written.
    fn substitute_env_vars(content: &str) -> String {
        static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
        let re = PLACEHOLDER.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn verbose(&self) -> bool {
        self.logging.verbose.unwrap_or(false)
    }

    pub fn log_format(&self) -> &str {
        self.logging.format.as_deref().unwrap_or("compact")
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("api.base_url", &self.api.base_url)?;
        if let Some(timeout) = self.api.timeout_seconds {
            validate_positive_number("api.timeout_seconds", timeout, 1)?;
        }
        validate_one_of("logging.format", self.log_format(), &LOG_FORMATS)?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn api_base_url(&self) -> &str {
        &self.api.base_url
    }

    fn request_timeout_secs(&self) -> u64 {
        self.api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    fn refetch_after_confirm(&self) -> bool {
        self.sync.refetch_after_confirm.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_config() {
        let config = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "https://admin.example.com/api"
timeout_seconds = 10

[sync]
refetch_after_confirm = true

[logging]
verbose = true
format = "json"
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.api_base_url(), "https://admin.example.com/api");
        assert_eq!(config.request_timeout_secs(), 10);
        assert!(config.refetch_after_confirm());
        assert!(config.verbose());
        assert_eq!(config.log_format(), "json");
    }

    #[test]
    fn test_defaults_for_missing_sections() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.api_base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout_secs(), DEFAULT_TIMEOUT_SECONDS);
        assert!(!config.refetch_after_confirm());
        assert_eq!(config.log_format(), "compact");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("COURSE_SYNC_TEST_HOST", "cms.internal");
        let config = TomlConfig::from_toml_str(
            r#"
[api]
base_url = "https://${COURSE_SYNC_TEST_HOST}/api"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://cms.internal/api");

        let untouched = TomlConfig::substitute_env_vars("x = \"${COURSE_SYNC_UNSET_VARIABLE}\"");
        assert_eq!(untouched, "x = \"${COURSE_SYNC_UNSET_VARIABLE}\"");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = TomlConfig::default();
        config.api.timeout_seconds = Some(0);
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.logging.format = Some("xml".to_string());
        assert!(matches!(
            config.validate(),
            Err(SyncError::InvalidConfigValueError { .. })
        ));

        assert!(matches!(
            TomlConfig::from_toml_str("[api\nbase_url = 1"),
            Err(SyncError::ConfigError { .. })
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nbase_url = \"http://127.0.0.1:9000\"").unwrap();

        let config = TomlConfig::from_file(file.path()).unwrap();
        assert_eq!(config.api_base_url(), "http://127.0.0.1:9000");

        assert!(matches!(
            TomlConfig::from_file("/nonexistent/course-sync.toml"),
            Err(SyncError::Io(_))
        ));
    }
}
