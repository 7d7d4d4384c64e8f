//! The Sequence container class (§4.8).
//!
//! Grounded in the teacher's `Array<T>`
//! (`sources/runtime/src/object/builtins.rs`), whose flexible-array-member
//! storage is replaced here with a safe `RwLock<Vec<Value>>` behind the
//! native-data slot (§9), since this runtime has no need for the teacher's
//! raw-pointer layout once instances are heap-allocated `Arc`s.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::class::{Class, ClassDefinition, FunctionDescriptor, MemberVariableDescriptor, Param};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::{TypeTag, Value};

pub const MODULE: &str = "core";
pub const SHORT_NAME: &str = "Sequence";

lazy_static! {
    pub static ref SEQUENCE_CLASS: Arc<Class> = build_class();
}

/// Build a new Sequence instance wrapping `items`, independent of any
/// evaluator (used by varargs binding, which has no evaluator handle).
pub fn new_sequence(items: Vec<Value>) -> Arc<ObjectInstance> {
    ObjectInstance::new_with_native(
        Arc::clone(&SEQUENCE_CLASS),
        Arc::new(Environment::root()),
        NativeData::Sequence(RwLock::new(items)),
    )
}

/// Run `f` against the backing vector, after checking `receiver` really is
/// a Sequence instance (§4.8, §6: "reject instances of unrelated classes
/// with TypeMismatch").
fn with_items<R>(
    receiver: &Arc<ObjectInstance>,
    f: impl FnOnce(&Vec<Value>) -> EvalResult<R>,
) -> EvalResult<R> {
    if !receiver.class.is_or_inherits(&SEQUENCE_CLASS.qualified_name) {
        return Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: SHORT_NAME.to_string(),
            got: receiver.class.short_name.clone(),
        }));
    }
    match &*receiver.native.read() {
        NativeData::Sequence(items) => f(&items.read()),
        _ => Err(receiver_corrupt()),
    }
}

fn with_items_mut<R>(
    receiver: &Arc<ObjectInstance>,
    f: impl FnOnce(&mut Vec<Value>) -> EvalResult<R>,
) -> EvalResult<R> {
    if !receiver.class.is_or_inherits(&SEQUENCE_CLASS.qualified_name) {
        return Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: SHORT_NAME.to_string(),
            got: receiver.class.short_name.clone(),
        }));
    }
    match &*receiver.native.read() {
        NativeData::Sequence(items) => f(&mut items.write()),
        _ => Err(receiver_corrupt()),
    }
}

fn receiver_corrupt() -> Fault {
    Fault::Internal(anyhow::anyhow!(
        "Sequence instance's native-data slot was not a Sequence"
    ))
}

fn require_receiver<'a>(
    receiver: Option<&'a Arc<ObjectInstance>>,
) -> EvalResult<&'a Arc<ObjectInstance>> {
    receiver.ok_or_else(|| Fault::Internal(anyhow::anyhow!("Sequence method called with no receiver")))
}

/// Resolve a negative-capable index against `len`, per §4.8's slice rule:
/// negative indices wrap from the end, then bounds are checked.
fn wrap_index(index: i64, len: usize) -> Option<usize> {
    let idx = if index < 0 {
        index + len as i64
    } else {
        index
    };
    if idx < 0 || idx as usize > len {
        None
    } else {
        Some(idx as usize)
    }
}

fn build_class() -> Arc<Class> {
    let mut def = ClassDefinition::new(MODULE, SHORT_NAME);

    def = def.with_public_variable(MemberVariableDescriptor::get_only(
        "size",
        Some(TypeTag::Integer),
        true,
        |receiver| with_items(receiver, |v| Ok(Value::Integer(v.len() as i64))),
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "get",
        vec![Param::new("index", Some(TypeTag::Integer))],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let index = *args[0].as_integer().ok_or_else(|| index_type_error())?;
            with_items(receiver, |items| {
                let len = items.len();
                let i = wrap_index(index, len)
                    .filter(|i| *i < len)
                    .ok_or(RuntimeFault::IndexOutOfBounds { index, len })?;
                Ok(items[i].clone())
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "set",
        vec![
            Param::new("index", Some(TypeTag::Integer)),
            Param::new("value", None),
        ],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let index = *args[0].as_integer().ok_or_else(|| index_type_error())?;
            let value = args[1].clone();
            with_items_mut(receiver, |items| {
                let len = items.len();
                let i = wrap_index(index, len)
                    .filter(|i| *i < len)
                    .ok_or(RuntimeFault::IndexOutOfBounds { index, len })?;
                items[i] = value;
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native_varargs(
        "append",
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            with_items_mut(receiver, |items| {
                items.extend_from_slice(args);
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "prepend",
        vec![Param::new("value", None)],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let value = args[0].clone();
            with_items_mut(receiver, |items| {
                items.insert(0, value);
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "pop_last",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_items_mut(receiver, |items| {
                items.pop().ok_or_else(|| {
                    Fault::Script(RuntimeFault::ScriptException(
                        "POP_LAST: sequence is empty".to_string(),
                    ))
                })
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "pop_first",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_items_mut(receiver, |items| {
                if items.is_empty() {
                    Err(Fault::Script(RuntimeFault::ScriptException(
                        "POP_FIRST: sequence is empty".to_string(),
                    )))
                } else {
                    Ok(items.remove(0))
                }
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "clear",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_items_mut(receiver, |items| {
                items.clear();
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "reverse",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_items_mut(receiver, |items| {
                items.reverse();
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "sort",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_items_mut(receiver, |items| {
                items.sort_by(compare_for_sort);
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native_varargs(
        "join",
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let sep = args
                .first()
                .map(|v| v.to_canonical_string())
                .unwrap_or_default();
            with_items(receiver, |items| {
                let parts: Vec<String> = items.iter().map(Value::to_canonical_string).collect();
                Ok(Value::string(parts.join(&sep)))
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "slice",
        vec![
            Param::new("start", Some(TypeTag::Integer)),
            Param::new("end", Some(TypeTag::Integer)),
        ],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let start = *args[0].as_integer().ok_or_else(index_type_error)?;
            let end = *args[1].as_integer().ok_or_else(index_type_error)?;
            with_items(receiver, |items| {
                let len = items.len();
                let s = wrap_index(start, len).ok_or(RuntimeFault::IndexOutOfBounds {
                    index: start,
                    len,
                })?;
                let e = wrap_index(end, len).ok_or(RuntimeFault::IndexOutOfBounds { index: end, len })?;
                let slice = if s <= e {
                    items[s..e].to_vec()
                } else {
                    Vec::new()
                };
                Ok(Value::Object(new_sequence(slice)))
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "find",
        vec![Param::new("value", None)],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let needle = args[0].clone();
            with_items(receiver, |items| {
                for (i, v) in items.iter().enumerate() {
                    if v.equals(&needle)? {
                        return Ok(Value::Integer(i as i64));
                    }
                }
                Ok(Value::Integer(-1))
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "contains",
        vec![Param::new("value", None)],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let needle = args[0].clone();
            with_items(receiver, |items| {
                for v in items {
                    if v.equals(&needle)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Ok(Value::Bool(false))
            })
        },
    ));

    Class::register(def, |_| None).expect("Sequence has no parents to resolve")
}

fn index_type_error() -> Fault {
    Fault::Script(RuntimeFault::TypeMismatch {
        expected: "INTEGER".to_string(),
        got: "non-integer index".to_string(),
    })
}

/// Numeric-aware ordering with String fallback by canonical rendering
/// (§4.8); a mixed-type pair falls back to string order.
fn compare_for_sort(a: &Value, b: &Value) -> CmpOrdering {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => x.cmp(y),
        (Value::Double(x), Value::Double(y)) => x.partial_cmp(y).unwrap_or(CmpOrdering::Equal),
        (Value::Integer(x), Value::Double(y)) => {
            (*x as f64).partial_cmp(y).unwrap_or(CmpOrdering::Equal)
        }
        (Value::Double(x), Value::Integer(y)) => {
            x.partial_cmp(&(*y as f64)).unwrap_or(CmpOrdering::Equal)
        }
        _ => a.to_canonical_string().cmp(&b.to_canonical_string()),
    }
}
