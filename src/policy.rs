/// How invariant violations are handled
///
/// Calling an operation before its required setup (for example asking for
/// the next image before any gallery was selected) is a programmer error.
/// During development it should be loud; in a shipped build it is logged
/// and the caller carries on with the "nothing available" result.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Panic on the first violation
    Strict,
    /// Log a warning and continue
    #[default]
    Lenient,
}

impl ErrorPolicy {
    /// Pick the policy for the development flag from the configuration
    pub fn for_development(development: bool) -> Self {
        if development {
            ErrorPolicy::Strict
        } else {
            ErrorPolicy::Lenient
        }
    }

    /// Report a broken invariant according to the policy.
    ///
    /// # Panics
    ///
    /// Panics under [`ErrorPolicy::Strict`].
    pub fn violation(&self, what: &str) {
        match self {
            ErrorPolicy::Strict => panic!("invariant violated: {what}"),
            ErrorPolicy::Lenient => warn!(violation = what, "invariant violated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_flag_selects_strict() {
        assert_eq!(ErrorPolicy::for_development(true), ErrorPolicy::Strict);
        assert_eq!(ErrorPolicy::for_development(false), ErrorPolicy::Lenient);
    }

    #[test]
    fn test_lenient_does_not_panic() {
        ErrorPolicy::Lenient.violation("advance without a gallery");
    }

    #[test]
    #[should_panic(expected = "invariant violated")]
    fn test_strict_panics() {
        ErrorPolicy::Strict.violation("advance without a gallery");
    }
}
