//! The Stdio built-in (§4.9): "a shared-instance (class-level, not
//! per-instance) native class exposing `write_line`/`read_line` against
//! the process's real standard streams, used by tests to avoid depending
//! on a real process/socket in the core test suite."

use std::io::{BufRead, Write};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex as PLMutex;

use crate::class::{Class, ClassDefinition, FunctionDescriptor, Param};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::{TypeTag, Value};

pub const MODULE: &str = "core";
pub const SHORT_NAME: &str = "Stdio";

lazy_static! {
    pub static ref STDIO_CLASS: Arc<Class> = build_class();
    /// The single shared instance, installed into the root environment at
    /// bootstrap (§4.9: "a shared-instance... native class").
    pub static ref STDIO_INSTANCE: Arc<ObjectInstance> = ObjectInstance::new_with_native(
        Arc::clone(&STDIO_CLASS),
        Arc::new(Environment::root()),
        NativeData::None,
    );
    static ref STDIN_LOCK: PLMutex<std::io::BufReader<std::io::Stdin>> =
        PLMutex::new(std::io::BufReader::new(std::io::stdin()));
}

fn build_class() -> Arc<Class> {
    let mut def = ClassDefinition::new(MODULE, SHORT_NAME);

    def = def.with_public_function(FunctionDescriptor::native(
        "write_line",
        vec![Param::new("line", Some(TypeTag::String))],
        true,
        |_, _receiver, args| {
            let line = args[0].to_canonical_string();
            println!("{line}");
            Ok(Value::Nothing)
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "read_line",
        vec![],
        true,
        |_, _receiver, _args| {
            let mut line = String::new();
            let n = STDIN_LOCK
                .lock()
                .read_line(&mut line)
                .map_err(|e| Fault::Script(RuntimeFault::ScriptException(format!("READ_LINE: {e}"))))?;
            if n == 0 {
                Ok(Value::Nothing)
            } else {
                if line.ends_with('\n') {
                    line.pop();
                }
                Ok(Value::string(line))
            }
        },
    ));

    Class::register(def, |_| None).expect("Stdio has no parents to resolve")
}

/// Flush stdout, mirroring the one real side effect `write_line` performs
/// beyond the in-memory model (tests assert against captured output rather
/// than calling this directly).
pub fn flush() -> EvalResult<()> {
    std::io::stdout()
        .flush()
        .map_err(|e| Fault::Script(RuntimeFault::ScriptException(format!("FLUSH: {e}"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_line_does_not_error() {
        let write_line = STDIO_CLASS.public_functions.get("write_line").unwrap();
        let mut ev = crate::eval::Evaluator::new(Arc::new(Environment::root()));
        let result = crate::eval::invoke::invoke(
            &mut ev,
            write_line,
            Some(&STDIO_INSTANCE),
            &[Value::string("hello")],
        );
        assert!(result.is_ok());
    }
}
