pub mod env;
pub mod maintenance;
pub mod storage;

pub use env::{EnvSources, classify, normalize};
pub use storage::{
    ConfigError, ConfigStore, PathOverrideTable, RedirectError, StorageRole, apply_overrides,
    apply_table,
};
