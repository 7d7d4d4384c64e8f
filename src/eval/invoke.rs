//! Function invocation: parameter binding and native/script dispatch
//! (§4.5, §4.6).
//!
//! Grounded in the teacher's `InvokeStatic` bytecode handler
//! (`sources/interpreter_two/src/bytecode/invoke.rs`), which already splits
//! "call the native function directly" from "push a new frame and run the
//! script body" — generalized here from a bytecode frame push to building
//! a child [`Environment`] for the tree-walking evaluator.

use std::sync::Arc;

use crate::class::{Body, FunctionDescriptor};
use crate::env::{Environment, VariableRecord};
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::ObjectInstance;
use crate::value::Value;

use super::{Evaluator, Flow, Frame};

/// Bind `args` against `f`'s declared parameters (§3, §4.5): positional
/// matching, implicit cast to each declared type tag, varargs collected
/// into a trailing Sequence. Fails with `TypeMismatch` on arity mismatch.
pub fn bind_params(f: &FunctionDescriptor, args: &[Value]) -> EvalResult<Vec<(String, Value)>> {
    let mut bound = Vec::with_capacity(f.params.len() + 1);

    if f.varargs {
        for (i, param) in f.params.iter().enumerate() {
            let Some(arg) = args.get(i) else {
                return Err(Fault::Script(RuntimeFault::TypeMismatch {
                    expected: format!("at least {} argument(s)", f.params.len()),
                    got: args.len().to_string(),
                }));
            };
            bound.push((param.name.clone(), cast_param(arg, param)?));
        }
        let rest: Vec<Value> = args[f.params.len().min(args.len())..].to_vec();
        bound.push((
            "varargs".to_string(),
            Value::Object(crate::builtins::sequence::new_sequence(rest)),
        ));
        return Ok(bound);
    }

    if args.len() != f.params.len() {
        return Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: format!("{} argument(s)", f.params.len()),
            got: args.len().to_string(),
        }));
    }

    for (param, arg) in f.params.iter().zip(args.iter()) {
        bound.push((param.name.clone(), cast_param(arg, param)?));
    }
    Ok(bound)
}

fn cast_param(arg: &Value, param: &crate::class::member::Param) -> EvalResult<Value> {
    match &param.type_tag {
        Some(tag) => arg.cast(tag),
        None => Ok(arg.clone()),
    }
}

/// Invoke `f` with `receiver` (`None` for a free function) and `args`
/// (§4.5, §4.6). For a script body this builds a fresh scope chained under
/// the receiver's definition environment (or the evaluator's root
/// environment for a free function), binds parameters and `self`, and
/// evaluates the body; for a native body it calls straight through.
pub fn invoke(
    evaluator: &mut Evaluator,
    f: &Arc<FunctionDescriptor>,
    receiver: Option<&Arc<ObjectInstance>>,
    args: &[Value],
) -> EvalResult<Value> {
    match &f.body {
        Body::Native(native) => native(evaluator, receiver, args),
        Body::Script(stmts) => {
            let bound = bind_params(f, args)?;

            let parent_env = match receiver {
                Some(r) => Arc::clone(&r.definition_env),
                None => Arc::clone(&evaluator.root_env),
            };
            let call_env = Environment::new_child(&parent_env);
            for (name, value) in bound {
                call_env
                    .define_variable(name, VariableRecord::new(None, false, true, value))?;
            }

            let saved_env = std::mem::replace(&mut evaluator.env, call_env);
            let saved_receiver = evaluator.self_receiver.take();
            let saved_class = evaluator.self_class.take();

            evaluator.self_receiver = receiver.cloned();
            evaluator.self_class = receiver.map(|r| r.class.qualified_name.clone());
            evaluator.call_stack.push(Frame {
                function_name: f.name.clone(),
                class_name: evaluator.self_class.clone(),
            });

            let result = evaluator.eval_block(stmts);

            evaluator.call_stack.pop();
            evaluator.env = saved_env;
            evaluator.self_receiver = saved_receiver;
            evaluator.self_class = saved_class;

            match result? {
                Flow::Return(v) => Ok(v),
                Flow::Normal => Ok(Value::Nothing),
                Flow::Break | Flow::Continue => Err(evaluator.fatal(
                    "break/continue escaped a function body without an enclosing loop",
                )),
            }
        }
    }
}
