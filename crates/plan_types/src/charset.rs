//! Minimal charset/collation catalog.
//!
//! The expression builder consults this when lowering a `_charset'text'`
//! introducer: the named charset must exist and must expose a byte decoder,
//! otherwise lowering fails (see `SqlType`'s spec-facing callers in
//! `plan_builder::expr::builder`).

use plan_error::{PlanError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    pub name: &'static str,
    pub default_collation: &'static str,
}

impl Charset {
    /// Decode raw bytes using this charset. Only `utf8mb4`/`utf8`/`ascii` are
    /// modeled as valid text charsets here; `binary` has no decoder and
    /// callers must reject it the way the spec requires.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self.name {
            "utf8mb4" | "utf8" | "ascii" => String::from_utf8(bytes.to_vec())
                .map_err(|e| PlanError::type_error(format!("invalid {} bytes: {e}", self.name))),
            other => Err(PlanError::type_error(format!(
                "charset `{other}` has no byte decoder",
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collation {
    pub name: &'static str,
    pub charset: &'static str,
}

const CHARSETS: &[Charset] = &[
    Charset {
        name: "utf8mb4",
        default_collation: "utf8mb4_general_ci",
    },
    Charset {
        name: "utf8",
        default_collation: "utf8_general_ci",
    },
    Charset {
        name: "ascii",
        default_collation: "ascii_general_ci",
    },
    Charset {
        name: "binary",
        default_collation: "binary",
    },
    Charset {
        name: "latin1",
        default_collation: "latin1_swedish_ci",
    },
];

const COLLATIONS: &[Collation] = &[
    Collation {
        name: "utf8mb4_general_ci",
        charset: "utf8mb4",
    },
    Collation {
        name: "utf8mb4_bin",
        charset: "utf8mb4",
    },
    Collation {
        name: "utf8_general_ci",
        charset: "utf8",
    },
    Collation {
        name: "ascii_general_ci",
        charset: "ascii",
    },
    Collation {
        name: "binary",
        charset: "binary",
    },
    Collation {
        name: "latin1_swedish_ci",
        charset: "latin1",
    },
];

/// Look up a charset by (case-insensitive) name.
pub fn lookup_charset(name: &str) -> Result<&'static Charset> {
    let lower = name.to_lowercase();
    CHARSETS
        .iter()
        .find(|c| c.name == lower)
        .ok_or_else(|| PlanError::resolution(format!("unknown character set: {name}")))
}

/// Look up a collation by (case-insensitive) name.
pub fn lookup_collation(name: &str) -> Result<&'static Collation> {
    let lower = name.to_lowercase();
    COLLATIONS
        .iter()
        .find(|c| c.name == lower)
        .ok_or_else(|| PlanError::resolution(format!("unknown collation: {name}")))
}

/// Resolve a collation given optional `CHARACTER SET` / `COLLATE` clauses, a
/// table-level default, and the session's current collation, consulted in
/// that order (first non-`None` source wins).
pub fn resolve_collation(
    explicit_charset: Option<&str>,
    explicit_collation: Option<&str>,
    table_default: Option<&str>,
    session_current: &str,
) -> Result<&'static Collation> {
    if let Some(collation) = explicit_collation {
        let resolved = lookup_collation(collation)?;
        if let Some(charset) = explicit_charset {
            let charset = lookup_charset(charset)?;
            if resolved.charset != charset.name {
                return Err(PlanError::type_error(format!(
                    "collation `{collation}` is not valid for charset `{charset}`",
                    charset = charset.name
                )));
            }
        }
        return Ok(resolved);
    }

    if let Some(charset) = explicit_charset {
        let charset = lookup_charset(charset)?;
        return lookup_collation(charset.default_collation);
    }

    if let Some(table_default) = table_default {
        return lookup_collation(table_default);
    }

    lookup_collation(session_current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_utf8() {
        let cs = lookup_charset("utf8mb4").unwrap();
        assert_eq!(cs.decode(b"hello").unwrap(), "hello");
    }

    #[test]
    fn binary_has_no_decoder() {
        let cs = lookup_charset("binary").unwrap();
        assert!(cs.decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn resolution_order_prefers_explicit_collation() {
        let c = resolve_collation(None, Some("utf8mb4_bin"), Some("latin1_swedish_ci"), "binary")
            .unwrap();
        assert_eq!(c.name, "utf8mb4_bin");
    }

    #[test]
    fn resolution_falls_back_to_session() {
        let c = resolve_collation(None, None, None, "ascii_general_ci").unwrap();
        assert_eq!(c.name, "ascii_general_ci");
    }
}
