//! Error type shared across the planner crates.
//!
//! The builder never threads `Result` through every recursive helper by hand;
//! instead a single error carrier unwinds the call stack (see the builder's
//! top level `parse` entry point), matching the non-local-exit design called
//! out by the planner itself.

use std::fmt;

/// Coarse classification of a [`PlanError`], used by callers that want to
/// react differently to, say, a cancellation vs. an unsupported-syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unsupported or malformed construct.
    Syntax,
    /// Column/table/database/function not found, ambiguous reference,
    /// duplicate alias or table.
    Resolution,
    /// Wrong argument count, wrong alias arity, mismatched CTE seed width.
    Arity,
    /// Invalid typed value, invalid SRID, invalid collation, charset decode
    /// failure, primary key on nullable column, invalid sort order keyword.
    Type,
    /// Privileged operation against a protected system schema.
    Privilege,
    /// Construct the builder intentionally does not implement.
    FeatureUnsupported,
    /// Context cancellation observed during building.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Syntax => "syntax",
            Self::Resolution => "resolution",
            Self::Arity => "arity",
            Self::Type => "type",
            Self::Privilege => "privilege",
            Self::FeatureUnsupported => "feature-unsupported",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// The single error type returned (and unwound) by the planner.
#[derive(Debug, Clone)]
pub struct PlanError {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<PlanError>>,
}

impl PlanError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        PlanError {
            kind,
            msg: msg.into(),
            source: None,
        }
    }

    pub fn syntax(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, msg)
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, msg)
    }

    pub fn arity(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Arity, msg)
    }

    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, msg)
    }

    pub fn privilege(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Privilege, msg)
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::FeatureUnsupported, msg)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "statement build cancelled")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Wrap `self` as the cause of a new error of the given kind.
    pub fn wrap(self, kind: ErrorKind, msg: impl Into<String>) -> Self {
        PlanError {
            kind,
            msg: msg.into(),
            source: Some(Box::new(self)),
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)?;
        if let Some(source) = &self.source {
            write!(f, "\ncaused by: {source}")?;
        }
        Ok(())
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as _)
    }
}

pub type Result<T, E = PlanError> = std::result::Result<T, E>;

/// Shorthand for building a [`PlanError`] tagged with [`ErrorKind::FeatureUnsupported`]
/// and returning it, mirroring the `not_implemented!` helper callers reach for
/// when a construct is intentionally out of scope.
#[macro_export]
macro_rules! not_implemented {
    ($($arg:tt)*) => {
        return Err($crate::PlanError::unsupported(format!($($arg)*)))
    };
}

/// Shorthand for a resolution failure, the most common error raised while
/// walking the scope chain.
#[macro_export]
macro_rules! resolution_err {
    ($($arg:tt)*) => {
        $crate::PlanError::resolution(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_cause() {
        let inner = PlanError::resolution("column `x` not found");
        let outer = inner.wrap(ErrorKind::Syntax, "failed to build projection");
        let rendered = outer.to_string();
        assert!(rendered.contains("syntax"));
        assert!(rendered.contains("caused by"));
        assert!(rendered.contains("column `x` not found"));
    }
}
