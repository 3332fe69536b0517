pub mod config;
pub mod host;
pub mod invocation;
pub mod provider;

pub use config::{Config, ConfigLoadError};
pub use host::{ConfigRepository, Host, HostError, Phase, Provider, Subsystem};
pub use invocation::{Invocation, InvocationReport, InvocationSettings, invoke};
pub use provider::{RedirectStatus, StorageProvider};
