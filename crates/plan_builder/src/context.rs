//! Session context: the thin state value threaded through a builder run.
//!
//! This is a collaborator described only by its interface (spec §1): current
//! database, active collation/charset, a warnings sink, and a cancellation
//! signal. None of session/transaction/storage semantics live here.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use plan_error::{PlanError, Result};

/// `{read-write, read-only}` transaction characteristic (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCharacteristic {
    ReadWrite,
    ReadOnly,
}

/// System-variable scope tag (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Session,
    Global,
    Persist,
    PersistOnly,
    User,
}

/// Session-scoped configuration, including the two toggles introduced to
/// resolve Open Questions 1 and 3 (see `SPEC_FULL.md`).
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// SQL-92 strict grouping vs. MySQL "any value" semantics. Default
    /// `false` (permissive), matching observed upstream behavior.
    pub strict_group_by: bool,
    /// Names of DDL/SHOW clauses the builder intentionally does not
    /// implement; building one raises `ErrorKind::FeatureUnsupported`
    /// naming it explicitly.
    pub unsupported_ddl_forms: Vec<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            strict_group_by: false,
            unsupported_ddl_forms: vec![
                "FULLTEXT INDEX".to_string(),
                "SHOW COUNT(*) WARNINGS".to_string(),
                "PARTITION BY".to_string(),
            ],
        }
    }
}

/// Append-only warnings sink. Cloning shares the same backing buffer (the
/// session's warnings sink is shared across statements within one session,
/// not per-builder).
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    inner: Arc<std::sync::Mutex<Vec<String>>>,
}

impl Warnings {
    pub fn push(&self, msg: impl Into<String>) {
        self.inner.lock().unwrap().push(msg.into());
    }

    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().unwrap())
    }
}

/// A statement-scoped cancellation signal. Catalog lookups and constant
/// folding (e.g. `AS OF`) must observe this and fail with
/// `ErrorKind::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(PlanError::cancelled())
        } else {
            Ok(())
        }
    }
}

/// Session handle: current database, active collation/charset, warnings
/// sink, and statement cancellation.
#[derive(Debug, Clone)]
pub struct Context {
    pub current_database: Option<String>,
    pub current_charset: String,
    pub current_collation: String,
    pub read_only: TransactionCharacteristic,
    pub warnings: Warnings,
    pub cancellation: CancellationToken,
    pub config: BuilderConfig,
}

impl Default for Context {
    fn default() -> Self {
        Context {
            current_database: None,
            current_charset: "utf8mb4".to_string(),
            current_collation: "utf8mb4_general_ci".to_string(),
            read_only: TransactionCharacteristic::ReadWrite,
            warnings: Warnings::default(),
            cancellation: CancellationToken::default(),
            config: BuilderConfig::default(),
        }
    }
}

impl Context {
    pub fn new(current_database: Option<String>) -> Self {
        Context {
            current_database,
            ..Default::default()
        }
    }
}
