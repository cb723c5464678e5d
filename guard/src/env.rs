//! Environment provider.
//!
//! Guards never read the process environment directly. They hold an
//! [`EnvProvider`] chosen at construction time, so tests can substitute a
//! fixed [`MapEnv`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Variable that turns off runtime checks for every guard built while it is
/// set to `1`, `true` or `yes`.
pub const DISABLE_RUNTIME_CHECKS_VAR: &str = "QUICKSCRIPT_DISABLE_RUNTIME_TYPECHECKING";

static DISABLED_BY_SETTINGS: AtomicBool = AtomicBool::new(false);

/// Turns runtime checks off, or back on, for every guard in the process,
/// including guards built before the call. The script entrypoint sets this
/// from its loaded settings.
pub fn set_runtime_checks_disabled(disabled: bool) {
    DISABLED_BY_SETTINGS.store(disabled, Ordering::Relaxed);
}

/// Returns `true` if settings turned runtime checks off process-wide.
pub fn runtime_checks_disabled_globally() -> bool {
    DISABLED_BY_SETTINGS.load(Ordering::Relaxed)
}

/// Read-only view of environment variables.
pub trait EnvProvider: Send + Sync {
    /// Value of `name`, or `None` when unset or not valid unicode.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvProvider for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// A fixed mapping, for tests and embedding.
///
/// # Examples
///
/// ```
/// use quickscript_guard::{EnvProvider, MapEnv};
///
/// let env = MapEnv::new().with("API_TOKEN", "secret");
/// assert_eq!(env.var("API_TOKEN").as_deref(), Some("secret"));
/// assert_eq!(env.var("HOME"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    /// An empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Sets or replaces a variable.
    pub fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    /// Removes a variable.
    pub fn remove(&mut self, name: &str) {
        self.vars.remove(name);
    }
}

impl EnvProvider for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Returns `true` if `env` switches runtime checks off.
pub fn runtime_checks_disabled(env: &dyn EnvProvider) -> bool {
    env.var(DISABLE_RUNTIME_CHECKS_VAR)
        .map(|value| is_truthy(&value))
        .unwrap_or(false)
}

/// `1`, `true` and `yes`, case-insensitively.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disable_switch_spellings() {
        for value in ["1", "true", "TRUE", "yes", " Yes "] {
            let env = MapEnv::new().with(DISABLE_RUNTIME_CHECKS_VAR, value);
            assert!(runtime_checks_disabled(&env), "{value} should disable");
        }
        for value in ["0", "false", "", "off"] {
            let env = MapEnv::new().with(DISABLE_RUNTIME_CHECKS_VAR, value);
            assert!(!runtime_checks_disabled(&env), "{value} should not disable");
        }
        assert!(!runtime_checks_disabled(&MapEnv::new()));
    }

    #[test]
    fn test_map_env_from_iter_and_mutation() {
        let mut env: MapEnv = [("A", "1"), ("B", "2")].into_iter().collect();
        env.set("A", "3");
        env.remove("B");

        assert_eq!(env.var("A").as_deref(), Some("3"));
        assert_eq!(env.var("B"), None);
    }
}
