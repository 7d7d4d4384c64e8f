//! The evaluator: a recursive tree walker over the AST (§4.7).
//!
//! Grounded in the teacher's `VM::interpret` loop
//! (`src/runtime/vm.rs`) and its `Context` (current environment / operand
//! state), generalized from a bytecode dispatch loop to statement/expression
//! recursion per §4.7's explicit "recursive tree walker" requirement, and
//! from a single shared `VM` to the "forked evaluator" §5/§9 calls for:
//! cheap to copy, sharing the class registry and root environment by
//! reference, owning only its own call stack and cancellation flag.

pub mod bound_method;
pub mod construct;
pub mod expr;
pub mod invoke;
pub mod stmt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::trace;

use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::ObjectInstance;
use crate::value::Value;

/// A diagnostic call-stack entry (§4.7: "a call stack (for diagnostics)").
#[derive(Clone, Debug)]
pub struct Frame {
    pub function_name: String,
    pub class_name: Option<String>,
}

/// How a statement block finished, distinguishing the three non-error
/// exits (`break`/`continue`/`return`) from falling off the end (§4.7).
/// Raised exceptions are not represented here — they propagate as `Err`.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// The evaluator (§4.7). `root_env` is shared (via `Arc`) across every
/// fork; `env` is the evaluator's current lexical position and is
/// reassigned as it descends into method bodies and blocks.
pub struct Evaluator {
    pub root_env: Arc<Environment>,
    pub env: Arc<Environment>,
    pub call_stack: Vec<Frame>,
    /// Cooperative cancellation signal (§4.7, §5). Not shared across
    /// forks: each forked evaluator owns an independent flag.
    pub cancel: Arc<AtomicBool>,
    /// The current `self` receiver, bound while executing a method body.
    pub self_receiver: Option<Arc<ObjectInstance>>,
    /// The qualified name of the class whose method body is currently
    /// executing, used for private-member visibility (invariant 5).
    pub self_class: Option<String>,
}

impl Evaluator {
    pub fn new(root_env: Arc<Environment>) -> Self {
        Self {
            env: Arc::clone(&root_env),
            root_env,
            call_stack: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            self_receiver: None,
            self_class: None,
        }
    }

    /// Fork a fresh evaluator for a worker (§5, §9): shares the class
    /// registry and root environment by `Arc` reference, but owns an
    /// independent call stack and cancellation flag.
    pub fn fork(&self) -> Evaluator {
        trace!("forking evaluator for worker");
        Evaluator {
            root_env: Arc::clone(&self.root_env),
            env: Arc::clone(&self.root_env),
            call_stack: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            self_receiver: None,
            self_class: None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Execute a statement block, returning the block's [`Flow`]. Runs
    /// statements strictly in program order (§5: "statements execute in
    /// program order").
    pub fn eval_block(&mut self, stmts: &[crate::ast::Stmt]) -> EvalResult<Flow> {
        for stmt in stmts {
            match self.eval_stmt(stmt)? {
                Flow::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    /// Raise a fatal fault and log it before the caller propagates it
    /// (§4.7: "surface as fatal runtime failures and terminate the current
    /// top-level evaluation").
    pub fn fatal(&self, message: impl Into<String>) -> Fault {
        let message = message.into();
        tracing::error!(%message, "fatal runtime fault");
        crate::fatal!(message)
    }

    pub(crate) fn current_self_class(&self) -> Option<&str> {
        self.self_class.as_deref()
    }
}

/// Raised by native code that wants to signal a script-catchable error
/// without constructing the full `RuntimeFault` enum by hand (§6: "host
/// code may construct exceptions by returning an error carrying a
/// message").
pub fn script_exception(message: impl Into<String>) -> Fault {
    Fault::Script(RuntimeFault::ScriptException(message.into()))
}
