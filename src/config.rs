use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::session::{Project, default_projects};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "qapad.toml";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;
pub const DEFAULT_SESSION_SECONDS: u64 = 3600;

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub api_base: Option<String>,
    pub request_timeout: Option<u64>,
    pub session_seconds: Option<u64>,
    pub export_dir: Option<String>,
    pub projects: Option<Vec<Project>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model: String,
    pub api_key_env: String,
    pub api_base: String,
    pub request_timeout: u64,
    pub session_seconds: u64,
    pub export_dir: String,
    pub projects: Vec<Project>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_seconds: DEFAULT_SESSION_SECONDS,
            export_dir: ".".to_string(),
            projects: default_projects(),
        }
    }
}

impl Config {
    /// Load the config file (explicit path must exist, default path is optional)
    /// and apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match cli.config.as_deref() {
            Some(path) => {
                let path = Path::new(path);
                if !path.exists() {
                    return Err(Error::ConfigNotFound(path.to_path_buf()));
                }
                parse_config(&std::fs::read_to_string(path)?)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    parse_config(&std::fs::read_to_string(path)?)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let config = merge(file_config, cli);
        if config.request_timeout == 0 {
            return Err(Error::Configuration(
                "request_timeout must be > 0".to_string(),
            ));
        }
        if config.session_seconds == 0 {
            return Err(Error::Configuration(
                "session_seconds must be > 0".to_string(),
            ));
        }
        Ok(config)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    if let Some(timeout) = config.request_timeout
        && timeout == 0
    {
        return Err(Error::Configuration(
            "request_timeout must be > 0".to_string(),
        ));
    }
    if let Some(seconds) = config.session_seconds
        && seconds == 0
    {
        return Err(Error::Configuration(
            "session_seconds must be > 0".to_string(),
        ));
    }
    if let Some(ref env) = config.api_key_env
        && env.trim().is_empty()
    {
        return Err(Error::Configuration(
            "api_key_env must not be empty".to_string(),
        ));
    }
    if let Some(ref projects) = config.projects {
        if projects.is_empty() {
            return Err(Error::Configuration(
                "projects must list at least one project".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for project in projects {
            if project.id.trim().is_empty() {
                return Err(Error::Configuration(
                    "project id must not be empty".to_string(),
                ));
            }
            if !seen.insert(project.id.as_str()) {
                return Err(Error::Configuration(format!(
                    "duplicate project id: {}",
                    project.id
                )));
            }
        }
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Config {
    let defaults = Config::default();
    Config {
        model: cli.model.clone().or(file.model).unwrap_or(defaults.model),
        api_key_env: cli
            .api_key_env
            .clone()
            .or(file.api_key_env)
            .unwrap_or(defaults.api_key_env),
        api_base: file.api_base.unwrap_or(defaults.api_base),
        request_timeout: cli
            .request_timeout
            .or(file.request_timeout)
            .unwrap_or(defaults.request_timeout),
        session_seconds: cli
            .session_seconds
            .or(file.session_seconds)
            .unwrap_or(defaults.session_seconds),
        export_dir: cli
            .export_dir
            .clone()
            .or(file.export_dir)
            .unwrap_or(defaults.export_dir),
        projects: file.projects.unwrap_or(defaults.projects),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
model = "gemini-2.0-flash"
api_key_env = "GEMINI_API_KEY"
request_timeout = 15
session_seconds = 1800
export_dir = "/tmp/reports"

[[projects]]
id = "shop"
name = "Demo Shop"
url = "https://shop.example.com"
"#;
        let config = parse_config(toml).unwrap();
        assert_eq!(config.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(config.request_timeout, Some(15));
        let projects = config.projects.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "shop");
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_zero_timeout() {
        let err = parse_config("request_timeout = 0").unwrap_err();
        assert!(err.to_string().contains("request_timeout must be > 0"));
    }

    #[test]
    fn test_parse_zero_session_seconds() {
        let err = parse_config("session_seconds = 0").unwrap_err();
        assert!(err.to_string().contains("session_seconds must be > 0"));
    }

    #[test]
    fn test_parse_blank_api_key_env() {
        let err = parse_config(r#"api_key_env = " ""#).unwrap_err();
        assert!(err.to_string().contains("api_key_env"));
    }

    #[test]
    fn test_parse_unknown_field() {
        let err = parse_config(r#"api_key = "secret""#).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_parse_duplicate_project_ids() {
        let toml = r#"
[[projects]]
id = "a"
name = "A"
url = "https://a.example.com"

[[projects]]
id = "a"
name = "A again"
url = "https://a2.example.com"
"#;
        let err = parse_config(toml).unwrap_err();
        assert!(err.to_string().contains("duplicate project id: a"));
    }

    #[test]
    fn test_parse_empty_project_list() {
        let err = parse_config("projects = []").unwrap_err();
        assert!(err.to_string().contains("at least one project"));
    }

    #[test]
    fn test_cli_overrides_config() {
        let file = ConfigFile {
            model: Some("file-model".to_string()),
            request_timeout: Some(60),
            export_dir: Some("/file/dir".to_string()),
            ..Default::default()
        };
        let cli = Cli::parse_from(["qapad", "--model", "cli-model", "--export-dir", "/cli/dir"]);
        let config = merge(file, &cli);
        assert_eq!(config.model, "cli-model"); // CLI wins
        assert_eq!(config.export_dir, "/cli/dir"); // CLI wins
        assert_eq!(config.request_timeout, 60); // file value kept
    }

    #[test]
    fn test_defaults_applied() {
        let cli = Cli::parse_from(["qapad"]);
        let config = merge(ConfigFile::default(), &cli);
        assert_eq!(config, Config::default());
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.api_key_env, "API_KEY");
        assert_eq!(config.session_seconds, 3600);
        assert_eq!(config.projects.len(), 2);
        assert_eq!(config.projects[0].id, "angelone");
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let cli = Cli::parse_from(["qapad", "--config", path.to_str().unwrap()]);
        let err = Config::load(&cli).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.toml");
        std::fs::write(&path, "session_seconds = 600\n").unwrap();
        let cli = Cli::parse_from(["qapad", "--config", path.to_str().unwrap()]);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.session_seconds, 600);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn test_load_rejects_zero_cli_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa.toml");
        std::fs::write(&path, "").unwrap();
        let cli = Cli::parse_from([
            "qapad",
            "--config",
            path.to_str().unwrap(),
            "--request-timeout",
            "0",
        ]);
        let err = Config::load(&cli).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
