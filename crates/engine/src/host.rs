//! Bootstrap lifecycle of the hosted application.
//!
//! The host walks through its phases in a fixed order:
//!
//! ```text
//! early (storage root) -> register -> bind config + after_create -> boot
//! ```
//!
//! A host built with [`Host::with_early_config`] is already bound when
//! `register` runs; otherwise the repository rejects writes until after it.
//!
//! Subsystems read their configured path once during `boot` and keep it, so
//! any override written afterwards never reaches them. [`Host::stale_roles`]
//! reports exactly those roles.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use runtime_core::storage::{
    ConfigError, ConfigStore, PathOverrideTable, RedirectError, StorageRole, apply_table,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Created,
    Registered,
    ConfigBound,
    Booted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("storage root must be absolute: {}", .0.display())]
    RelativeStorageRoot(PathBuf),
    #[error("cannot {action} once the host is {phase:?}")]
    OutOfOrder { action: &'static str, phase: Phase },
    #[error(transparent)]
    Redirect(#[from] RedirectError),
}

/// In-memory configuration repository. Writes fail until it is bound.
#[derive(Debug, Clone, Default)]
pub struct ConfigRepository {
    bound: bool,
    values: BTreeMap<String, String>,
}

impl ConfigRepository {
    pub fn seeded(defaults: &PathOverrideTable) -> Self {
        let values = defaults
            .iter()
            .map(|(role, path)| {
                (
                    role.config_key().to_string(),
                    path.to_string_lossy().to_string(),
                )
            })
            .collect();
        Self {
            bound: false,
            values,
        }
    }

    pub fn bind(&mut self) {
        self.bound = true;
    }
}

impl ConfigStore for ConfigRepository {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        if !self.bound {
            return Err(ConfigError::Unavailable);
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Components that latch one or more storage paths when the host boots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    ViewCompiler,
    CacheStore,
    SessionHandler,
    Logger,
}

impl Subsystem {
    pub const ALL: [Subsystem; 4] = [
        Subsystem::ViewCompiler,
        Subsystem::CacheStore,
        Subsystem::SessionHandler,
        Subsystem::Logger,
    ];

    pub fn roles(self) -> &'static [StorageRole] {
        match self {
            Subsystem::ViewCompiler => &[StorageRole::ViewCache],
            Subsystem::CacheStore => &[StorageRole::FileCacheData, StorageRole::FileCacheLock],
            Subsystem::SessionHandler => &[StorageRole::Sessions],
            Subsystem::Logger => &[StorageRole::LogFile],
        }
    }
}

/// Hooks a provider can attach to the bootstrap sequence.
pub trait Provider {
    /// Runs before configuration is loaded.
    fn early(&self, _host: &mut Host) -> Result<(), HostError> {
        Ok(())
    }

    fn register(&self, _host: &mut Host) -> Result<(), HostError> {
        Ok(())
    }

    /// Runs once the configuration repository is bound.
    fn after_create(&self, _host: &mut Host) -> Result<(), HostError> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct Host {
    phase: Phase,
    storage_root: PathBuf,
    config: ConfigRepository,
    log_file: String,
    latched: BTreeMap<StorageRole, String>,
}

impl Host {
    pub fn new(default_storage_root: &Path, log_file: &str) -> Result<Self, HostError> {
        if !default_storage_root.is_absolute() {
            return Err(HostError::RelativeStorageRoot(
                default_storage_root.to_path_buf(),
            ));
        }
        let defaults = PathOverrideTable::rooted_at_with_log(default_storage_root, log_file)?;
        Ok(Self {
            phase: Phase::Created,
            storage_root: default_storage_root.to_path_buf(),
            config: ConfigRepository::seeded(&defaults),
            log_file: log_file.to_string(),
            latched: BTreeMap::new(),
        })
    }

    /// Bind the configuration repository before providers register, the way
    /// a host that loads its configuration first starts up. Without it the
    /// repository only becomes writable after registration.
    pub fn with_early_config(mut self) -> Self {
        self.config.bind();
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Override the storage root itself. Only valid before boot, since
    /// storage-relative lookups may already have happened afterwards.
    pub fn use_storage_path(&mut self, root: &Path) -> Result<(), HostError> {
        if self.phase >= Phase::Booted {
            return Err(HostError::OutOfOrder {
                action: "change the storage root",
                phase: self.phase,
            });
        }
        if !root.is_absolute() {
            return Err(HostError::RelativeStorageRoot(root.to_path_buf()));
        }
        self.storage_root = root.to_path_buf();
        Ok(())
    }

    pub fn bind_config(&mut self) {
        self.config.bind();
        if self.phase < Phase::ConfigBound {
            self.phase = Phase::ConfigBound;
        }
    }

    /// Write the overrides rooted at `root`. Allowed at any phase; writes
    /// after boot show up in [`Host::stale_roles`].
    pub fn apply_overrides(&mut self, root: &Path) -> Result<PathOverrideTable, HostError> {
        let table = PathOverrideTable::rooted_at_with_log(root, &self.log_file)?;
        apply_table(&mut self.config, &table)?;
        Ok(table)
    }

    pub fn configured_path(&self, role: StorageRole) -> Option<String> {
        self.config.get(role.config_key())
    }

    pub fn configured_paths(&self) -> BTreeMap<StorageRole, String> {
        StorageRole::ALL
            .iter()
            .filter_map(|role| self.configured_path(*role).map(|path| (*role, path)))
            .collect()
    }

    pub fn latched_path(&self, role: StorageRole) -> Option<&str> {
        self.latched.get(&role).map(String::as_str)
    }

    /// Roles whose subsystem latched a different path than the one now
    /// configured.
    pub fn stale_roles(&self) -> Vec<StorageRole> {
        StorageRole::ALL
            .into_iter()
            .filter(|role| match self.latched_path(*role) {
                Some(latched) => self.configured_path(*role).as_deref() != Some(latched),
                None => false,
            })
            .collect()
    }

    /// Drive the full sequence with the given providers.
    pub fn bootstrap(&mut self, providers: &[&dyn Provider]) -> Result<(), HostError> {
        if self.phase != Phase::Created {
            return Err(HostError::OutOfOrder {
                action: "bootstrap",
                phase: self.phase,
            });
        }
        for provider in providers {
            provider.early(self)?;
        }
        for provider in providers {
            provider.register(self)?;
        }
        self.phase = Phase::Registered;

        self.bind_config();
        for provider in providers {
            provider.after_create(self)?;
        }

        self.boot()
    }

    pub fn boot(&mut self) -> Result<(), HostError> {
        if self.phase == Phase::Booted {
            return Err(HostError::OutOfOrder {
                action: "boot",
                phase: self.phase,
            });
        }
        for subsystem in Subsystem::ALL {
            for role in subsystem.roles() {
                if let Some(path) = self.configured_path(*role) {
                    tracing::trace!(?subsystem, ?role, %path, "latched storage path");
                    self.latched.insert(*role, path);
                }
            }
        }
        self.phase = Phase::Booted;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Host {
        Host::new(Path::new("/srv/app/storage"), "app.log").expect("host")
    }

    #[test]
    fn repository_rejects_writes_until_bound() {
        let mut host = host();
        let err = host
            .apply_overrides(Path::new("/tmp/storage"))
            .expect_err("unbound");
        assert!(matches!(
            err,
            HostError::Redirect(RedirectError::Config {
                source: ConfigError::Unavailable,
                ..
            })
        ));
        host.bind_config();
        host.apply_overrides(Path::new("/tmp/storage")).expect("bound");
    }

    #[test]
    fn defaults_are_rooted_at_default_storage() {
        let host = host();
        assert_eq!(
            host.configured_path(StorageRole::ViewCache).as_deref(),
            Some("/srv/app/storage/framework/views")
        );
        assert_eq!(host.storage_root(), Path::new("/srv/app/storage"));
    }

    #[test]
    fn boot_without_overrides_latches_defaults() {
        let mut host = host();
        host.bootstrap(&[]).expect("bootstrap");
        assert_eq!(host.phase(), Phase::Booted);
        assert_eq!(
            host.latched_path(StorageRole::Sessions),
            Some("/srv/app/storage/framework/sessions")
        );
        assert!(host.stale_roles().is_empty());
    }

    #[test]
    fn overrides_after_boot_are_reported_stale() {
        let mut host = host();
        host.bootstrap(&[]).expect("bootstrap");
        host.apply_overrides(Path::new("/tmp/storage")).expect("late apply");
        assert_eq!(host.stale_roles(), StorageRole::ALL.to_vec());
    }

    #[test]
    fn overrides_before_boot_are_not_stale() {
        let mut host = host();
        host.bind_config();
        host.apply_overrides(Path::new("/tmp/storage")).expect("apply");
        host.boot().expect("boot");
        assert!(host.stale_roles().is_empty());
        assert_eq!(
            host.latched_path(StorageRole::LogFile),
            Some("/tmp/storage/logs/app.log")
        );
    }

    #[test]
    fn storage_root_is_fixed_after_boot() {
        let mut host = host();
        host.use_storage_path(Path::new("/tmp/storage")).expect("before boot");
        assert_eq!(host.storage_root(), Path::new("/tmp/storage"));
        host.boot().expect("boot");
        let err = host
            .use_storage_path(Path::new("/var/other"))
            .expect_err("after boot");
        assert!(matches!(err, HostError::OutOfOrder { .. }));
        assert!(host.boot().is_err());
    }

    #[test]
    fn early_config_accepts_writes_before_registration() {
        let mut host = host().with_early_config();
        host.apply_overrides(Path::new("/tmp/storage")).expect("bound early");
        assert_eq!(host.phase(), Phase::Created);
        host.bootstrap(&[]).expect("bootstrap");
        assert!(host.stale_roles().is_empty());
    }

    #[test]
    fn log_file_outside_logs_dir_is_rejected() {
        let err = Host::new(Path::new("/srv/app/storage"), "/var/log/app.log").expect_err("absolute");
        assert_eq!(
            err,
            HostError::Redirect(RedirectError::InvalidLogFile("/var/log/app.log".to_string()))
        );
        assert!(Host::new(Path::new("/srv/app/storage"), "../app.log").is_err());
    }

    #[test]
    fn relative_roots_are_rejected() {
        assert!(matches!(
            Host::new(Path::new("storage"), "app.log"),
            Err(HostError::RelativeStorageRoot(_))
        ));
        let mut host = host();
        assert!(matches!(
            host.use_storage_path(Path::new("tmp")),
            Err(HostError::RelativeStorageRoot(_))
        ));
    }
}
