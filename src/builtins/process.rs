//! The Process illustration builtin (§4.9, §6).
//!
//! Thin by design: it exists to demonstrate the native-data slot holding a
//! real OS handle and blocking native methods, grounded in the teacher's
//! `BuiltinThread` (`sources/runtime/src/object/builtins.rs`) which also
//! wraps an OS-level handle behind a class-shaped façade.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout};
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::Mutex as PLMutex;

use crate::builtins::{mapping, sequence};
use crate::class::{Class, ClassDefinition, FunctionDescriptor, Param};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::{TypeTag, Value};

pub const MODULE: &str = "core";
pub const SHORT_NAME: &str = "Process";

pub struct ProcessState {
    child: PLMutex<Child>,
    stdin: PLMutex<ChildStdin>,
    stdout: PLMutex<BufReader<ChildStdout>>,
}

lazy_static! {
    pub static ref PROCESS_CLASS: Arc<Class> = build_class();
}

/// Spawn `program` with `argv`/`env` validated against the Sequence and
/// Mapping container classes (§4.9: "reject foreign instances with
/// `TypeMismatch`").
pub fn spawn(program: &str, argv: &Value, env: &Value) -> EvalResult<Arc<ObjectInstance>> {
    let argv_obj = match argv {
        Value::Object(o) if o.class.is_or_inherits(&sequence::SEQUENCE_CLASS.qualified_name) => o,
        other => {
            return Err(Fault::Script(RuntimeFault::TypeMismatch {
                expected: sequence::SHORT_NAME.to_string(),
                got: other.type_tag().to_string(),
            }))
        }
    };
    let env_obj = mapping::require_mapping(env)?;

    let mut command = std::process::Command::new(program);
    if let NativeData::Sequence(items) = &*argv_obj.native.read() {
        for v in items.read().iter() {
            command.arg(v.to_canonical_string());
        }
    }
    if let NativeData::Mapping(entries) = &*env_obj.native.read() {
        for (k, v) in entries.read().iter() {
            command.env(k, v.to_canonical_string());
        }
    }
    command.stdin(std::process::Stdio::piped());
    command.stdout(std::process::Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|e| Fault::Script(RuntimeFault::ScriptException(format!("SPAWN: {e}"))))?;
    let stdin = child.stdin.take().expect("piped stdin");
    let stdout = child.stdout.take().expect("piped stdout");

    Ok(ObjectInstance::new_with_native(
        Arc::clone(&PROCESS_CLASS),
        Arc::new(Environment::root()),
        NativeData::Process(ProcessState {
            child: PLMutex::new(child),
            stdin: PLMutex::new(stdin),
            stdout: PLMutex::new(BufReader::new(stdout)),
        }),
    ))
}

fn require_receiver<'a>(
    receiver: Option<&'a Arc<ObjectInstance>>,
) -> EvalResult<&'a Arc<ObjectInstance>> {
    receiver.ok_or_else(|| Fault::Internal(anyhow::anyhow!("Process method called with no receiver")))
}

fn corrupt() -> Fault {
    Fault::Internal(anyhow::anyhow!(
        "Process instance's native-data slot was not a Process"
    ))
}

fn build_class() -> Arc<Class> {
    let mut def = ClassDefinition::new(MODULE, SHORT_NAME);

    def = def.with_public_function(FunctionDescriptor::native(
        "write",
        vec![Param::new("line", Some(TypeTag::String))],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let line = args[0].to_canonical_string();
            match &*receiver.native.read() {
                NativeData::Process(state) => {
                    let mut stdin = state.stdin.lock();
                    writeln!(stdin, "{line}").map_err(|e| {
                        Fault::Script(RuntimeFault::ScriptException(format!("WRITE: {e}")))
                    })?;
                    Ok(Value::Nothing)
                }
                _ => Err(corrupt()),
            }
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "read_line",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            match &*receiver.native.read() {
                NativeData::Process(state) => {
                    let mut out = state.stdout.lock();
                    let mut line = String::new();
                    let n = out.read_line(&mut line).map_err(|e| {
                        Fault::Script(RuntimeFault::ScriptException(format!("READ_LINE: {e}")))
                    })?;
                    if n == 0 {
                        Ok(Value::Nothing)
                    } else {
                        if line.ends_with('\n') {
                            line.pop();
                        }
                        Ok(Value::string(line))
                    }
                }
                _ => Err(corrupt()),
            }
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "wait",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            match &*receiver.native.read() {
                NativeData::Process(state) => {
                    let status = state.child.lock().wait().map_err(|e| {
                        Fault::Script(RuntimeFault::ScriptException(format!("WAIT: {e}")))
                    })?;
                    Ok(Value::Integer(status.code().unwrap_or(-1) as i64))
                }
                _ => Err(corrupt()),
            }
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "kill",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            match &*receiver.native.read() {
                NativeData::Process(state) => {
                    state.child.lock().kill().map_err(|e| {
                        Fault::Script(RuntimeFault::ScriptException(format!("KILL: {e}")))
                    })?;
                    Ok(Value::Nothing)
                }
                _ => Err(corrupt()),
            }
        },
    ));

    Class::register(def, |_| None).expect("Process has no parents to resolve")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_true_and_wait_returns_zero() {
        let argv = Value::Object(sequence::new_sequence(vec![]));
        let env = Value::Object(mapping::new_mapping(Default::default()));
        let proc = spawn("true", &argv, &env).expect("spawn /bin/true-equivalent");

        let wait = PROCESS_CLASS.public_functions.get("wait").unwrap();
        let mut ev = crate::eval::Evaluator::new(Arc::new(Environment::root()));
        let code = crate::eval::invoke::invoke(&mut ev, wait, Some(&proc), &[]).unwrap();
        assert_eq!(code.as_integer().copied(), Some(0));
    }

    #[test]
    fn spawn_rejects_foreign_argv() {
        let not_a_sequence = Value::Integer(1);
        let env = Value::Object(mapping::new_mapping(Default::default()));
        let result = spawn("true", &not_a_sequence, &env);
        assert!(matches!(result, Err(Fault::Script(RuntimeFault::TypeMismatch { .. }))));
    }
}
