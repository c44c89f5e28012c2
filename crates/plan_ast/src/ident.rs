//! Identifiers and object references.
//!
//! The grammar/parser that produces these is an external collaborator (see
//! the crate-level docs); this module only fixes the shape the builder
//! consumes.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(pub String);

impl Ident {
    pub fn new(s: impl Into<String>) -> Self {
        Ident(s.into())
    }

    /// The planner compares/stores all identifiers lowercased (case
    /// insensitivity, invariant 6).
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }
}

impl From<&str> for Ident {
    fn from(s: &str) -> Self {
        Ident(s.to_string())
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dotted object reference, e.g. `db.table` or just `table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectReference(pub Vec<Ident>);

impl ObjectReference {
    pub fn bare(name: impl Into<String>) -> Self {
        ObjectReference(vec![Ident::new(name)])
    }

    pub fn qualified(db: impl Into<String>, name: impl Into<String>) -> Self {
        ObjectReference(vec![Ident::new(db), Ident::new(name)])
    }

    /// Split into `(database, name)`, where `database` is `None` for a bare
    /// single-part reference.
    pub fn split(&self) -> (Option<String>, String) {
        match self.0.len() {
            1 => (None, self.0[0].normalized()),
            _ => {
                let name = self.0.last().unwrap().normalized();
                let db = self.0[self.0.len() - 2].normalized();
                (Some(db), name)
            }
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|i| i.0.clone()).collect();
        write!(f, "{}", parts.join("."))
    }
}
