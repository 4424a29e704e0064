//! Severity policy for optional features a dialect cannot express.

use crate::error::{CommandError, CommandResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// How a not-supported condition on an optional feature is reported.
///
/// `Fail` is the default. `Warn` and `Ignore` let the caller skip the
/// offending fragment and keep going.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotSupportedPolicy {
    #[default]
    Fail,
    Warn,
    Ignore,
}

impl NotSupportedPolicy {
    /// Apply the policy to a not-supported condition.
    ///
    /// Returns `Ok(())` when the caller should skip the feature and continue.
    pub fn check(self, message: impl Into<String>) -> CommandResult<()> {
        match self {
            Self::Fail => Err(CommandError::NotSupported(message.into())),
            Self::Warn => {
                warn!(message = %message.into(), "Skipping unsupported feature");
                Ok(())
            }
            Self::Ignore => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_fail_is_default() {
        let err = NotSupportedPolicy::default().check("tree").unwrap_err();
        assert_eq!(err, CommandError::not_supported("tree"));
    }

    #[test]
    #[traced_test]
    fn test_warn_logs_and_continues() {
        NotSupportedPolicy::Warn.check("manual id assignment").unwrap();
        assert!(logs_contain("manual id assignment"));
    }

    #[test]
    fn test_ignore_continues() {
        assert!(NotSupportedPolicy::Ignore.check("anything").is_ok());
    }
}
