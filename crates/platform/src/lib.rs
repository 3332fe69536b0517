use std::collections::HashMap;
use std::path::Path;

/// Host services an invocation is allowed to touch.
pub trait Platform: Send + Sync {
    fn fs(&self) -> &dyn Fs;
    fn env(&self) -> &dyn Env;
}

pub trait Fs: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

pub trait Env: Send + Sync {
    /// `None` when the variable is unset or not valid UTF-8.
    fn get(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HostFs;

impl Fs for HostFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Env for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed set of variables, used when the environment is injected.
#[derive(Debug, Default, Clone)]
pub struct MemoryEnv {
    vars: HashMap<String, String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }
}

impl Env for MemoryEnv {
    fn get(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HostPlatform {
    fs: HostFs,
    env: ProcessEnv,
}

impl Platform for HostPlatform {
    fn fs(&self) -> &dyn Fs {
        &self.fs
    }

    fn env(&self) -> &dyn Env {
        &self.env
    }
}
