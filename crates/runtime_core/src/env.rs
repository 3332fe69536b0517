use std::collections::HashMap;

use platform::Env;

/// Set by the platform on every deployment.
pub const PLATFORM_VAR: &str = "VERCEL";
/// Which tier of the platform is running (`production`, `preview`, `development`).
pub const TIER_VAR: &str = "VERCEL_ENV";

pub const SIGNALS: [&str; 2] = [PLATFORM_VAR, TIER_VAR];

/// Snapshot of the two places a signal can be looked up.
///
/// `ambient` is the per-invocation runtime environment; it starts empty and is
/// only filled by [`normalize`]. `process` is the process environment captured
/// once when the invocation starts; only the recognized signals are read.
#[derive(Debug, Default, Clone)]
pub struct EnvSources {
    pub ambient: HashMap<String, String>,
    pub process: HashMap<String, String>,
}

impl EnvSources {
    pub fn capture(env: &dyn Env) -> Self {
        Self {
            ambient: HashMap::new(),
            process: SIGNALS
                .iter()
                .filter_map(|var| env.get(var).map(|value| (var.to_string(), value)))
                .collect(),
        }
    }

    pub fn with_ambient(mut self, key: &str, value: &str) -> Self {
        self.ambient.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_process(mut self, key: &str, value: &str) -> Self {
        self.process.insert(key.to_string(), value.to_string());
        self
    }

    pub fn ambient_get(&self, key: &str) -> Option<String> {
        self.ambient.get(key).cloned()
    }

    pub fn process_get(&self, key: &str) -> Option<String> {
        self.process.get(key).cloned()
    }
}

/// Process lookups treat `""` and `"0"` as unset; ambient lookups only check
/// that the key exists.
pub fn is_present_value(value: &str) -> bool {
    !value.is_empty() && value != "0"
}

pub fn signal_present_with<Ambient, Process>(
    var: &str,
    ambient_get: &Ambient,
    process_get: &Process,
) -> bool
where
    Ambient: Fn(&str) -> Option<String>,
    Process: Fn(&str) -> Option<String>,
{
    if ambient_get(var).is_some() {
        return true;
    }
    process_get(var)
        .map(|value| is_present_value(&value))
        .unwrap_or(false)
}

pub fn classify_with<Ambient, Process>(ambient_get: &Ambient, process_get: &Process) -> bool
where
    Ambient: Fn(&str) -> Option<String>,
    Process: Fn(&str) -> Option<String>,
{
    SIGNALS
        .iter()
        .any(|var| signal_present_with(var, ambient_get, process_get))
}

/// True when the invocation runs inside the ephemeral serverless sandbox.
pub fn classify(sources: &EnvSources) -> bool {
    classify_with(&|k: &str| sources.ambient_get(k), &|k: &str| sources.process_get(k))
}

/// Copy the process-level signals into the ambient map when the ambient map
/// has none of them. Returns whether anything was copied.
pub fn normalize(sources: &mut EnvSources) -> bool {
    if SIGNALS.iter().any(|var| sources.ambient.contains_key(*var)) {
        return false;
    }
    let detected = SIGNALS.iter().any(|var| {
        sources
            .process
            .get(*var)
            .is_some_and(|value| is_present_value(value))
    });
    if !detected {
        return false;
    }

    let mut copied = false;
    for var in SIGNALS {
        if let Some(value) = sources.process.get(var).cloned() {
            sources.ambient.insert(var.to_string(), value);
            copied = true;
        }
    }
    copied
}

pub fn tier(sources: &EnvSources) -> Option<String> {
    sources
        .ambient_get(TIER_VAR)
        .or_else(|| sources.process_get(TIER_VAR))
        .filter(|value| !value.is_empty())
}
