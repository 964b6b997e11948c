//! Rewrite errors.

use thiserror::Error;

/// Rewrite result type.
pub type Result<T> = std::result::Result<T, RewriteError>;

/// Errors caused by the shape of the source expression.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InliningError {
    #[error(
        "recursive invoke not permitted: parameter '{parameter}' is already bound in this scope; introduce an intermediate binding"
    )]
    RecursiveBinding { parameter: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error(transparent)]
    Inlining(#[from] InliningError),

    #[error("invocation target does not resolve to a lambda (found {found})")]
    UnresolvedTarget { found: &'static str },

    #[error("lambda takes {expected} argument(s) but is invoked with {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("unhandled node kind '{kind}'")]
    UnhandledKind { kind: String },

    #[error("marker call '{method}' expects {expected}, found {found} argument(s)")]
    MalformedSentinel {
        method: &'static str,
        expected: &'static str,
        found: usize,
    },

    #[error("expression nesting exceeds the limit of {limit} levels")]
    DepthExceeded { limit: u32 },
}

impl RewriteError {
    /// Fatal errors indicate a malformed tree or an unsupported construct;
    /// everything else is a recoverable property of the source expression.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RewriteError::Inlining(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recursive_binding_message() {
        let err: RewriteError = InliningError::RecursiveBinding {
            parameter: "x".to_string(),
        }
        .into();
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("recursive invoke not permitted"));
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_invariant_violations_are_fatal() {
        assert!(RewriteError::ArityMismatch {
            expected: 2,
            found: 1
        }
        .is_fatal());
        assert!(RewriteError::UnhandledKind {
            kind: "loop".to_string()
        }
        .is_fatal());
        assert!(RewriteError::DepthExceeded { limit: 4 }.is_fatal());
    }
}
