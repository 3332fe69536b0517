use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const SERVICE_NAME: &str = "lambda";
pub const PORT_VAR: &str = "LAMBDA_PORT";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Writable root used when running inside the serverless sandbox.
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Storage root on a persistent host. Relative paths resolve against the
    /// working directory.
    #[serde(default = "default_storage_root")]
    pub default_storage_root: PathBuf,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Whether the configuration repository is bound before providers
    /// register. When false every invocation applies its overrides from the
    /// fallback hook.
    #[serde(default = "default_early_config")]
    pub early_config: bool,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("scratch_root must be absolute: {}", .0.display())]
    RelativeScratchRoot(PathBuf),
    #[error("log_file must be a plain file name: {0}")]
    InvalidLogFile(String),
}

fn default_port() -> u16 {
    8080
}

fn default_scratch_root() -> PathBuf {
    PathBuf::from("/tmp/storage")
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("storage")
}

fn default_early_config() -> bool {
    true
}

fn default_log_file() -> String {
    runtime_core::storage::DEFAULT_LOG_FILE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            scratch_root: default_scratch_root(),
            default_storage_root: default_storage_root(),
            log_file: default_log_file(),
            early_config: default_early_config(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigLoadError> {
        let mut config = Self::load_from(&config_search_paths())?;
        config.apply_env_with(&|key: &str| std::env::var(key).ok())?;
        Ok(config)
    }

    /// First existing file wins; no file at all means built-in defaults.
    pub fn load_from(paths: &[PathBuf]) -> Result<Self, ConfigLoadError> {
        for path in paths {
            if !path.exists() {
                continue;
            }
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Read {
                path: path.clone(),
                source,
            })?;
            let config = Self::from_toml_str(&contents).map_err(|source| ConfigLoadError::Parse {
                path: path.clone(),
                source,
            })?;
            config.validate()?;
            tracing::info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        tracing::warn!(
            "No config file found for {}; using built-in defaults",
            SERVICE_NAME
        );
        Ok(Self::default())
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn apply_env_with<F>(&mut self, env_get: &F) -> Result<(), ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env_get(PORT_VAR) {
            self.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigLoadError::InvalidEnv {
                    var: PORT_VAR,
                    value,
                })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if !self.scratch_root.is_absolute() {
            return Err(ConfigLoadError::RelativeScratchRoot(
                self.scratch_root.clone(),
            ));
        }
        runtime_core::storage::validate_log_file(&self.log_file)
            .map_err(|_| ConfigLoadError::InvalidLogFile(self.log_file.clone()))?;
        Ok(())
    }

    pub fn default_storage_root_in(&self, cwd: &Path) -> PathBuf {
        if self.default_storage_root.is_absolute() {
            self.default_storage_root.clone()
        } else {
            cwd.join(&self.default_storage_root)
        }
    }
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(format!("./{}.toml", SERVICE_NAME))];

    if let Ok(home) = std::env::var("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config")
                .join(SERVICE_NAME)
                .join("config.toml"),
        );
    }

    paths.push(PathBuf::from(format!("/etc/{}/config.toml", SERVICE_NAME)));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.scratch_root, PathBuf::from("/tmp/storage"));
        assert_eq!(config.log_file, "app.log");
        assert!(config.early_config);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let config = Config::from_toml_str("port = 9000\nlog_file = \"edge.log\"\nearly_config = false\n")
            .expect("parse");
        assert!(!config.early_config);
        assert_eq!(config.port, 9000);
        assert_eq!(config.log_file, "edge.log");
        assert_eq!(config.scratch_root, default_scratch_root());
    }

    #[test]
    fn load_from_prefers_first_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("lambda.toml");
        std::fs::write(&present, "scratch_root = \"/var/scratch\"\n").expect("write");

        let config = Config::load_from(&[missing, present]).expect("load");
        assert_eq!(config.scratch_root, PathBuf::from("/var/scratch"));
    }

    #[test]
    fn load_from_without_files_returns_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::load_from(&[dir.path().join("none.toml")]).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lambda.toml");
        std::fs::write(&path, "port = \"not a number\"").expect("write");
        let err = Config::load_from(&[path.clone()]).expect_err("parse error");
        assert!(matches!(err, ConfigLoadError::Parse { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn relative_scratch_root_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lambda.toml");
        std::fs::write(&path, "scratch_root = \"tmp\"").expect("write");
        let err = Config::load_from(&[path]).expect_err("relative");
        assert!(matches!(err, ConfigLoadError::RelativeScratchRoot(_)));
    }

    #[test]
    fn log_file_outside_logs_dir_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lambda.toml");
        for name in ["/var/log/app.log", "../../etc/app.log", "nested/app.log"] {
            std::fs::write(&path, format!("log_file = \"{name}\"\n")).expect("write");
            let err = Config::load_from(&[path.clone()]).expect_err(name);
            assert!(matches!(err, ConfigLoadError::InvalidLogFile(_)), "{name}");
        }
    }

    #[test]
    fn port_env_override() {
        let mut config = Config::default();
        config
            .apply_env_with(&|key: &str| (key == PORT_VAR).then(|| "3001".to_string()))
            .expect("override");
        assert_eq!(config.port, 3001);

        let err = config
            .apply_env_with(&|_: &str| Some("nope".to_string()))
            .expect_err("invalid");
        assert!(matches!(err, ConfigLoadError::InvalidEnv { .. }));
    }

    #[test]
    fn default_storage_root_resolves_against_cwd() {
        let config = Config::default();
        assert_eq!(
            config.default_storage_root_in(Path::new("/srv/app")),
            PathBuf::from("/srv/app/storage")
        );
    }
}
