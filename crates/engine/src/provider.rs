use std::cell::Cell;
use std::path::PathBuf;

use serde::Serialize;

use crate::host::{Host, HostError, Provider};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectStatus {
    /// Not running in the sandbox; defaults stay.
    NotNeeded,
    /// Running in the sandbox, but no hook has run yet.
    Pending,
    /// The register hook could not write; waiting for `after_create`.
    Deferred,
    AppliedAtRegister,
    AppliedAfterCreate,
}

/// Moves every storage location under the scratch root when the invocation
/// runs in the ephemeral sandbox.
///
/// The overrides are written from two hooks: `register`, where the
/// configuration repository may not be bound yet, and `after_create`, where
/// it always is. Both write the same values.
#[derive(Debug)]
pub struct StorageProvider {
    ephemeral: bool,
    scratch_root: PathBuf,
    status: Cell<RedirectStatus>,
}

impl StorageProvider {
    pub fn new(ephemeral: bool, scratch_root: impl Into<PathBuf>) -> Self {
        let status = if ephemeral {
            RedirectStatus::Pending
        } else {
            RedirectStatus::NotNeeded
        };
        Self {
            ephemeral,
            scratch_root: scratch_root.into(),
            status: Cell::new(status),
        }
    }

    pub fn status(&self) -> RedirectStatus {
        self.status.get()
    }
}

impl Provider for StorageProvider {
    fn early(&self, host: &mut Host) -> Result<(), HostError> {
        if !self.ephemeral {
            return Ok(());
        }
        host.use_storage_path(&self.scratch_root)
    }

    fn register(&self, host: &mut Host) -> Result<(), HostError> {
        if !self.ephemeral {
            return Ok(());
        }
        match host.apply_overrides(&self.scratch_root) {
            Ok(_) => self.status.set(RedirectStatus::AppliedAtRegister),
            Err(err) => {
                tracing::debug!("storage overrides deferred: {}", err);
                self.status.set(RedirectStatus::Deferred);
            }
        }
        Ok(())
    }

    fn after_create(&self, host: &mut Host) -> Result<(), HostError> {
        if !self.ephemeral {
            return Ok(());
        }
        host.apply_overrides(&self.scratch_root)?;
        if self.status() == RedirectStatus::Deferred {
            self.status.set(RedirectStatus::AppliedAfterCreate);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtime_core::StorageRole;
    use std::path::Path;

    fn host() -> Host {
        Host::new(Path::new("/srv/app/storage"), "app.log").expect("host")
    }

    #[test]
    fn persistent_host_keeps_defaults() {
        let provider = StorageProvider::new(false, "/tmp/storage");
        let mut host = host();
        host.bootstrap(&[&provider]).expect("bootstrap");

        assert_eq!(provider.status(), RedirectStatus::NotNeeded);
        assert_eq!(host.storage_root(), Path::new("/srv/app/storage"));
        assert_eq!(
            host.latched_path(StorageRole::ViewCache),
            Some("/srv/app/storage/framework/views")
        );
    }

    #[test]
    fn unbound_config_at_register_is_retried_after_create() {
        let provider = StorageProvider::new(true, "/tmp/storage");
        let mut host = host();
        host.bootstrap(&[&provider]).expect("bootstrap");

        assert_eq!(provider.status(), RedirectStatus::AppliedAfterCreate);
        assert_eq!(host.storage_root(), Path::new("/tmp/storage"));
        for role in StorageRole::ALL {
            let latched = host.latched_path(role).expect("latched");
            assert!(Path::new(latched).starts_with("/tmp/storage"), "{latched}");
        }
        assert!(host.stale_roles().is_empty());
    }

    #[test]
    fn bound_config_applies_at_register() {
        let provider = StorageProvider::new(true, "/tmp/storage");
        let mut host = host().with_early_config();
        host.bootstrap(&[&provider]).expect("bootstrap");

        assert_eq!(provider.status(), RedirectStatus::AppliedAtRegister);
        assert_eq!(
            host.latched_path(StorageRole::ViewCache),
            Some("/tmp/storage/framework/views")
        );
    }
}
