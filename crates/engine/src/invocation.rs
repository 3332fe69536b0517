use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use platform::Platform;
use runtime_core::StorageRole;
use runtime_core::env::{self, EnvSources};
use runtime_core::maintenance::{in_maintenance, maintenance_path};
use serde::Serialize;

use crate::config::Config;
use crate::host::{Host, HostError};
use crate::provider::{RedirectStatus, StorageProvider};

/// Everything an invocation needs from outside. Built once per process.
#[derive(Debug, Clone)]
pub struct InvocationSettings {
    pub scratch_root: PathBuf,
    pub default_storage_root: PathBuf,
    pub log_file: String,
    pub early_config: bool,
}

impl InvocationSettings {
    pub fn from_config(config: &Config, cwd: &Path) -> Self {
        Self {
            scratch_root: config.scratch_root.clone(),
            default_storage_root: config.default_storage_root_in(cwd),
            log_file: config.log_file.clone(),
            early_config: config.early_config,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationReport {
    pub ephemeral: bool,
    pub tier: Option<String>,
    pub normalized: bool,
    pub storage_root: PathBuf,
    pub paths: BTreeMap<StorageRole, String>,
    pub redirect: RedirectStatus,
    pub stale_roles: Vec<StorageRole>,
    pub elapsed_ms: u128,
}

#[derive(Debug)]
pub enum Invocation {
    Maintenance { marker: PathBuf },
    Ready { host: Host, report: InvocationReport },
}

/// Run the bootstrap sequence for one request, reading the environment
/// through `platform`.
pub fn invoke(platform: &dyn Platform, settings: &InvocationSettings) -> Result<Invocation, HostError> {
    let started = Instant::now();
    let sources = EnvSources::capture(platform.env());
    invoke_with_sources(platform, settings, sources, started)
}

pub fn invoke_with_sources(
    platform: &dyn Platform,
    settings: &InvocationSettings,
    mut sources: EnvSources,
    started: Instant,
) -> Result<Invocation, HostError> {
    let normalized = env::normalize(&mut sources);
    let ephemeral = env::classify(&sources);
    let tier = env::tier(&sources);
    if ephemeral {
        tracing::debug!(tier = tier.as_deref().unwrap_or("unknown"), "serverless environment detected");
    }

    let marker = maintenance_path(
        ephemeral,
        &settings.default_storage_root,
        &settings.scratch_root,
    );
    if in_maintenance(platform.fs(), &marker) {
        tracing::info!("maintenance marker present at {}", marker.display());
        return Ok(Invocation::Maintenance { marker });
    }

    let provider = StorageProvider::new(ephemeral, settings.scratch_root.clone());
    let mut host = Host::new(&settings.default_storage_root, &settings.log_file)?;
    if settings.early_config {
        host = host.with_early_config();
    }
    host.bootstrap(&[&provider])?;

    let report = InvocationReport {
        ephemeral,
        tier,
        normalized,
        storage_root: host.storage_root().to_path_buf(),
        paths: host.configured_paths(),
        redirect: provider.status(),
        stale_roles: host.stale_roles(),
        elapsed_ms: started.elapsed().as_millis(),
    };
    Ok(Invocation::Ready { host, report })
}
