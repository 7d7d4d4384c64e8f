//! Built-in classes (§4.8, §4.9): containers, concurrency primitives, and
//! the native-binding illustration classes.
//!
//! Grounded in the teacher's bootstrap-time native registration in
//! `src/main.rs` (`VM::new` followed by a block of
//! `registerNatives`-style calls before any script runs), generalized from
//! a hardcoded JVM class-table seed into [`install`], which defines every
//! built-in class and the shared `Stdio` instance onto a root environment.

pub mod http;
pub mod io;
pub mod mapping;
pub mod mutex;
pub mod process;
pub mod sequence;
pub mod worker;

use std::sync::Arc;

use tracing::debug;

use crate::env::Environment;
use crate::error::EvalResult;

/// Install every built-in class (and the shared `Stdio` instance) into
/// `env`, by both short name and qualified name, the same way the
/// evaluator registers a script-declared class (§4.3).
pub fn install(env: &Arc<Environment>) -> EvalResult<()> {
    let classes = [
        Arc::clone(&sequence::SEQUENCE_CLASS),
        Arc::clone(&mapping::MAPPING_CLASS),
        Arc::clone(&mutex::MUTEX_CLASS),
        Arc::clone(&worker::WORKER_CLASS),
        Arc::clone(&process::PROCESS_CLASS),
        Arc::clone(&http::HTTP_CLIENT_CLASS),
        Arc::clone(&http::HTTP_RESPONSE_CLASS),
        Arc::clone(&io::STDIO_CLASS),
    ];

    for class in classes {
        debug!(class = %class.qualified_name, "installing built-in class");
        env.define_class(class.qualified_name.clone(), Arc::clone(&class))?;
        env.define_class(class.short_name.clone(), class)?;
    }

    env.define_variable(
        "Stdio",
        crate::env::VariableRecord::new(
            None,
            true,
            true,
            crate::value::Value::Object(Arc::clone(&io::STDIO_INSTANCE)),
        ),
    )?;

    Ok(())
}
