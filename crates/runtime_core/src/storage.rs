use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_LOG_FILE: &str = "app.log";

/// A storage location the hosted application resolves once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageRole {
    ViewCache,
    FileCacheData,
    FileCacheLock,
    Sessions,
    LogFile,
}

impl StorageRole {
    pub const ALL: [StorageRole; 5] = [
        StorageRole::ViewCache,
        StorageRole::FileCacheData,
        StorageRole::FileCacheLock,
        StorageRole::Sessions,
        StorageRole::LogFile,
    ];

    pub fn config_key(self) -> &'static str {
        match self {
            StorageRole::ViewCache => "view.compiled",
            StorageRole::FileCacheData => "cache.stores.file.path",
            StorageRole::FileCacheLock => "cache.stores.file.lock_path",
            StorageRole::Sessions => "session.files",
            StorageRole::LogFile => "logging.channels.single.path",
        }
    }

    /// Location relative to the storage root. The file cache keeps its locks
    /// next to its data.
    pub fn relative_path(self, log_file: &str) -> PathBuf {
        match self {
            StorageRole::ViewCache => PathBuf::from("framework/views"),
            StorageRole::FileCacheData | StorageRole::FileCacheLock => {
                PathBuf::from("framework/cache/data")
            }
            StorageRole::Sessions => PathBuf::from("framework/sessions"),
            StorageRole::LogFile => Path::new("logs").join(log_file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("configuration store is not bound yet")]
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedirectError {
    #[error("storage root must be absolute: {}", .0.display())]
    RelativeRoot(PathBuf),
    #[error("log file must be a plain file name: {0}")]
    InvalidLogFile(String),
    #[error("failed to set {key}: {source}")]
    Config {
        key: &'static str,
        #[source]
        source: ConfigError,
    },
}

/// The host application's configuration repository, as seen by the redirector.
pub trait ConfigStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// The log file sits directly in `logs/`, so the name must be a single
/// normal path component.
pub fn validate_log_file(log_file: &str) -> Result<(), RedirectError> {
    let mut components = Path::new(log_file).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(RedirectError::InvalidLogFile(log_file.to_string())),
    }
}

/// Absolute path for each storage role, all derived from one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathOverrideTable {
    root: PathBuf,
    paths: BTreeMap<StorageRole, PathBuf>,
}

impl PathOverrideTable {
    pub fn rooted_at(root: &Path) -> Result<Self, RedirectError> {
        Self::rooted_at_with_log(root, DEFAULT_LOG_FILE)
    }

    pub fn rooted_at_with_log(root: &Path, log_file: &str) -> Result<Self, RedirectError> {
        if !root.is_absolute() {
            return Err(RedirectError::RelativeRoot(root.to_path_buf()));
        }
        validate_log_file(log_file)?;
        let paths = StorageRole::ALL
            .iter()
            .map(|role| (*role, root.join(role.relative_path(log_file))))
            .collect();
        Ok(Self {
            root: root.to_path_buf(),
            paths,
        })
    }

    pub fn path(&self, role: StorageRole) -> &Path {
        // Every role is inserted by the constructor.
        self.paths[&role].as_path()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StorageRole, &Path)> {
        self.paths.iter().map(|(role, path)| (*role, path.as_path()))
    }

    pub fn is_rooted_under(&self, root: &Path) -> bool {
        self.paths.values().all(|path| {
            path.starts_with(root)
                && !path
                    .components()
                    .any(|component| matches!(component, Component::ParentDir))
        })
    }
}

/// Write every entry of `table` into `store`. Stops at the first failure.
pub fn apply_table(
    store: &mut dyn ConfigStore,
    table: &PathOverrideTable,
) -> Result<(), RedirectError> {
    for (role, path) in table.iter() {
        let key = role.config_key();
        store
            .set(key, &path.to_string_lossy())
            .map_err(|source| RedirectError::Config { key, source })?;
    }
    Ok(())
}

/// Point every storage role at `base_root`. Calling it again with the same
/// root leaves the store unchanged.
pub fn apply_overrides(
    store: &mut dyn ConfigStore,
    base_root: &Path,
) -> Result<PathOverrideTable, RedirectError> {
    let table = PathOverrideTable::rooted_at(base_root)?;
    apply_table(store, &table)?;
    Ok(table)
}
