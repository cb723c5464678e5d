//! Dependency declarations.
//!
//! A [`Dependency`] is fixed when a guard is built and evaluated fresh on
//! every call. Nothing read during evaluation is cached.

use std::fmt;

use quickscript_core::{FieldType, coerce_value};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{CallLedger, EnvProvider};

/// A named requirement a guarded function needs before it may run.
///
/// # Examples
///
/// ```
/// use quickscript_core::FieldType;
/// use quickscript_guard::{Dependency, MapEnv};
///
/// let env = MapEnv::new().with("RETRIES", "three");
///
/// assert!(Dependency::env_var("RETRIES").check(&env, None).is_ok());
///
/// let typed = Dependency::typed_env_var("RETRIES", FieldType::Integer);
/// let unmet = typed.check(&env, None).unwrap_err();
/// assert_eq!(unmet.to_string(), "env var `RETRIES`: expected an integer, got `three`");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Dependency {
    /// Environment variable that must be set, optionally to a value that
    /// parses as `value_type`.
    EnvVar {
        /// Variable name.
        name: String,
        /// Expected value type, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value_type: Option<FieldType>,
    },
    /// Executable that must be found on the environment's `PATH`.
    Program {
        /// Program name.
        name: String,
    },
    /// Guarded function that must already have succeeded in the attached
    /// [`CallLedger`].
    PriorCall {
        /// Function name.
        name: String,
    },
}

impl Dependency {
    /// Requires `name` to be set.
    pub fn env_var(name: &str) -> Self {
        Dependency::EnvVar {
            name: name.to_string(),
            value_type: None,
        }
    }

    /// Requires `name` to be set to a value of `value_type`.
    pub fn typed_env_var(name: &str, value_type: FieldType) -> Self {
        Dependency::EnvVar {
            name: name.to_string(),
            value_type: Some(value_type),
        }
    }

    /// Requires `name` to be on `PATH`.
    pub fn program(name: &str) -> Self {
        Dependency::Program {
            name: name.to_string(),
        }
    }

    /// Requires the guarded function `name` to have succeeded already.
    pub fn prior_call(name: &str) -> Self {
        Dependency::PriorCall {
            name: name.to_string(),
        }
    }

    /// Evaluates the requirement against `env` and `ledger`.
    ///
    /// # Errors
    ///
    /// Returns [`UnmetDependency`] describing why the requirement fails.
    pub fn check(
        &self,
        env: &dyn EnvProvider,
        ledger: Option<&CallLedger>,
    ) -> Result<(), UnmetDependency> {
        match self {
            Dependency::EnvVar { name, value_type } => {
                let value = env.var(name).ok_or_else(|| self.unmet("not set"))?;
                if let Some(value_type) = value_type {
                    coerce_value(value_type, &Value::String(value))
                        .map_err(|message| self.unmet(&message))?;
                }
                Ok(())
            }
            Dependency::Program { name } => {
                let path = env
                    .var("PATH")
                    .ok_or_else(|| self.unmet("PATH is not set"))?;
                which::which_in(name, Some(path), ".")
                    .map(|_| ())
                    .map_err(|_| self.unmet("not found on PATH"))
            }
            Dependency::PriorCall { name } => match ledger {
                Some(ledger) if ledger.has_succeeded(name) => Ok(()),
                Some(_) => Err(self.unmet("has not completed successfully")),
                None => Err(self.unmet("no call ledger is attached")),
            },
        }
    }

    fn unmet(&self, reason: &str) -> UnmetDependency {
        UnmetDependency {
            dependency: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::EnvVar {
                name,
                value_type: Some(value_type),
            } => write!(f, "env var `{name}` ({})", value_type.name()),
            Dependency::EnvVar { name, .. } => write!(f, "env var `{name}`"),
            Dependency::Program { name } => write!(f, "program `{name}`"),
            Dependency::PriorCall { name } => write!(f, "prior call `{name}`"),
        }
    }
}

/// A dependency that failed its check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmetDependency {
    /// The declaration, as displayed.
    pub dependency: String,
    /// Why it is unmet.
    pub reason: String,
}

impl fmt::Display for UnmetDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.dependency, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MapEnv;

    #[test]
    fn test_env_var_presence() {
        let dep = Dependency::env_var("API_TOKEN");

        assert!(dep.check(&MapEnv::new().with("API_TOKEN", ""), None).is_ok());

        let unmet = dep.check(&MapEnv::new(), None).unwrap_err();
        assert_eq!(unmet.to_string(), "env var `API_TOKEN`: not set");
    }

    #[test]
    fn test_typed_env_var() {
        let dep = Dependency::typed_env_var("VERBOSE", FieldType::Boolean);

        assert!(dep.check(&MapEnv::new().with("VERBOSE", "yes"), None).is_ok());
        let unmet = dep
            .check(&MapEnv::new().with("VERBOSE", "loud"), None)
            .unwrap_err();
        assert_eq!(unmet.dependency, "env var `VERBOSE` (boolean)");
        assert_eq!(unmet.reason, "expected a boolean, got `loud`");
    }

    #[test]
    fn test_prior_call_needs_ledger_entry() {
        let dep = Dependency::prior_call("load_users");
        let ledger = CallLedger::new();
        let env = MapEnv::new();

        assert_eq!(
            dep.check(&env, None).unwrap_err().reason,
            "no call ledger is attached"
        );
        assert_eq!(
            dep.check(&env, Some(&ledger)).unwrap_err().reason,
            "has not completed successfully"
        );

        ledger.record("load_users");
        assert!(dep.check(&env, Some(&ledger)).is_ok());
    }

    #[test]
    fn test_program_without_path() {
        let unmet = Dependency::program("git")
            .check(&MapEnv::new(), None)
            .unwrap_err();
        assert_eq!(unmet.reason, "PATH is not set");
    }

    #[test]
    fn test_program_missing_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let env = MapEnv::new().with("PATH", &dir.path().display().to_string());

        let unmet = Dependency::program("quickscript-no-such-tool")
            .check(&env, None)
            .unwrap_err();
        assert_eq!(
            unmet.to_string(),
            "program `quickscript-no-such-tool`: not found on PATH"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_program_found_on_injected_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("fake-tool");
        std::fs::write(&tool, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

        let env = MapEnv::new().with("PATH", &dir.path().display().to_string());
        assert!(Dependency::program("fake-tool").check(&env, None).is_ok());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let json = serde_json::to_value(Dependency::program("git")).unwrap();
        assert_eq!(json, serde_json::json!({"type": "program", "name": "git"}));
    }
}
