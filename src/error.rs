//! Error taxonomy for the core runtime (§7).
//!
//! Mirrors the split the teacher uses between a catchable, typed exception
//! and a fatal host-side fault: `RuntimeFault` is the enum a script's
//! `try`/`catch` can observe (wrapped in [`Fault::Script`]), while
//! [`Fault::Internal`] carries an [`anyhow::Error`] for invariant
//! violations raised by native code that must never be presented to a
//! script as something it can recover from.

use thiserror::Error;

use crate::value::TypeTag;

/// The catchable half of the error taxonomy (§7's table, minus `Fatal`
/// which lives on [`Fault::Internal`] instead).
#[derive(Error, Debug, Clone)]
pub enum RuntimeFault {
    #[error("UNKNOWN_VARIABLE: no variable named '{0}' in scope")]
    UnknownVariable(String),

    #[error("UNKNOWN_FUNCTION: no function named '{0}' in scope")]
    UnknownFunction(String),

    #[error("UNKNOWN_CLASS: no class named '{0}' registered")]
    UnknownClass(String),

    #[error("UNKNOWN_MEMBER: '{class}' has no member named '{member}'")]
    UnknownMember { class: String, member: String },

    #[error("REDECLARATION: '{0}' is already declared in this scope")]
    Redeclaration(String),

    #[error("TYPE_MISMATCH: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("CAST_ERROR: cannot cast {from} to {to}")]
    CastError { from: TypeTag, to: TypeTag },

    #[error("PARSE_ERROR: could not parse '{text}' as {target}")]
    ParseError { text: String, target: TypeTag },

    #[error("INDEX_OUT_OF_BOUNDS: index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("KEY_NOT_FOUND: no entry for key '{0}'")]
    KeyNotFound(String),

    #[error("ASSIGN_TO_LOCKED: member '{0}' is locked after initialization")]
    AssignToLocked(String),

    #[error("ACCESS_DENIED: member '{member}' on '{class}' is private")]
    AccessDenied { class: String, member: String },

    #[error("INHERITANCE_CONFLICT: could not linearize MRO for '{0}'")]
    InheritanceConflict(String),

    #[error("ALREADY_RUNNING: worker has already been started")]
    AlreadyRunning,

    #[error("NOT_LOCKED: mutex is not held by any thread")]
    NotLocked,

    #[error("NOT_IMPLEMENTED: '{0}' has no concrete override")]
    NotImplemented(String),

    #[error("OVERFLOW: value does not fit in the target type")]
    Overflow,

    #[error("DIVIDE_BY_ZERO: division by zero")]
    DivideByZero,

    /// Raised by a script's `raise`/`throw`-like statement. The payload is
    /// whatever message the script supplied.
    #[error("{0}")]
    ScriptException(String),
}

/// Top-level error type threaded through the evaluator. A native function's
/// signature is `(evaluator, receiver, argv) -> Result<Value, Fault>`
/// (§6); returning `Fault::Script` produces a catchable exception at the
/// call site, while `Fault::Internal` unwinds straight past any
/// guarded block and aborts the top-level evaluation (§4.7, §7).
#[derive(Error, Debug)]
pub enum Fault {
    #[error(transparent)]
    Script(#[from] RuntimeFault),

    /// A fatal invariant violation in native code. Not catchable by script.
    #[error("FATAL: {0}")]
    Internal(#[from] anyhow::Error),
}

impl Fault {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Fault::Internal(_))
    }

    /// The message a guarded block binds to its handler variable. Only
    /// meaningful for non-fatal faults; fatal faults are never caught.
    pub fn script_message(&self) -> Option<String> {
        match self {
            Fault::Script(f) => Some(f.to_string()),
            Fault::Internal(_) => None,
        }
    }
}

/// Convenience alias used throughout the crate, mirroring the teacher's
/// `Result<T, Throwable>` alias.
pub type EvalResult<T> = Result<T, Fault>;

/// Construct a fatal internal fault carrying a formatted message, mirroring
/// the teacher's `internal!` macro.
#[macro_export]
macro_rules! fatal {
    ($msg:literal $(,)?) => {
        $crate::error::Fault::Internal(anyhow::anyhow!($msg))
    };
    ($err:expr $(,)?) => {
        $crate::error::Fault::Internal(anyhow::anyhow!($err))
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::Fault::Internal(anyhow::anyhow!($fmt, $($arg)*))
    };
}
