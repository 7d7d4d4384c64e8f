//! The Mapping container class (§4.8).
//!
//! Grounded the same way as [`crate::builtins::sequence`]: a safe
//! `RwLock`-guarded collection behind the native-data slot rather than the
//! teacher's raw-pointer heap layout. Keys are sorted (`BTreeMap`) so
//! `keys`/`values`/`pairs` iterate deterministically without a separate
//! sort step.

use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

use crate::class::{Class, ClassDefinition, FunctionDescriptor, MemberVariableDescriptor, Param};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::{TypeTag, Value};

pub const MODULE: &str = "core";
pub const SHORT_NAME: &str = "Mapping";

lazy_static! {
    pub static ref MAPPING_CLASS: Arc<Class> = build_class();
}

pub fn new_mapping(entries: std::collections::BTreeMap<String, Value>) -> Arc<ObjectInstance> {
    ObjectInstance::new_with_native(
        Arc::clone(&MAPPING_CLASS),
        Arc::new(Environment::root()),
        NativeData::Mapping(RwLock::new(entries)),
    )
}

/// §6: reject a foreign mapping-shaped instance with `TypeMismatch` when a
/// built-in (e.g. HttpClient's `headers`) expects a real Mapping instance.
pub fn require_mapping(value: &Value) -> EvalResult<Arc<ObjectInstance>> {
    match value {
        Value::Object(o) if o.class.is_or_inherits(&MAPPING_CLASS.qualified_name) => Ok(Arc::clone(o)),
        other => Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: SHORT_NAME.to_string(),
            got: other.type_tag().to_string(),
        })),
    }
}

fn with_entries<R>(
    receiver: &Arc<ObjectInstance>,
    f: impl FnOnce(&std::collections::BTreeMap<String, Value>) -> EvalResult<R>,
) -> EvalResult<R> {
    if !receiver.class.is_or_inherits(&MAPPING_CLASS.qualified_name) {
        return Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: SHORT_NAME.to_string(),
            got: receiver.class.short_name.clone(),
        }));
    }
    match &*receiver.native.read() {
        NativeData::Mapping(entries) => f(&entries.read()),
        _ => Err(receiver_corrupt()),
    }
}

fn with_entries_mut<R>(
    receiver: &Arc<ObjectInstance>,
    f: impl FnOnce(&mut std::collections::BTreeMap<String, Value>) -> EvalResult<R>,
) -> EvalResult<R> {
    if !receiver.class.is_or_inherits(&MAPPING_CLASS.qualified_name) {
        return Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: SHORT_NAME.to_string(),
            got: receiver.class.short_name.clone(),
        }));
    }
    match &*receiver.native.read() {
        NativeData::Mapping(entries) => f(&mut entries.write()),
        _ => Err(receiver_corrupt()),
    }
}

fn receiver_corrupt() -> Fault {
    Fault::Internal(anyhow::anyhow!(
        "Mapping instance's native-data slot was not a Mapping"
    ))
}

fn require_receiver<'a>(
    receiver: Option<&'a Arc<ObjectInstance>>,
) -> EvalResult<&'a Arc<ObjectInstance>> {
    receiver.ok_or_else(|| Fault::Internal(anyhow::anyhow!("Mapping method called with no receiver")))
}

fn require_key(v: &Value) -> EvalResult<String> {
    match v {
        Value::String(s) => Ok(s.to_string()),
        other => Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: "STRING".to_string(),
            got: other.type_tag().to_string(),
        })),
    }
}

fn build_class() -> Arc<Class> {
    let mut def = ClassDefinition::new(MODULE, SHORT_NAME);

    def = def.with_public_variable(MemberVariableDescriptor::get_only(
        "size",
        Some(TypeTag::Integer),
        true,
        |receiver| with_entries(receiver, |m| Ok(Value::Integer(m.len() as i64))),
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "put",
        vec![Param::new("key", Some(TypeTag::String)), Param::new("value", None)],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let key = require_key(&args[0])?;
            let value = args[1].clone();
            with_entries_mut(receiver, |m| {
                m.insert(key, value);
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "get",
        vec![Param::new("key", Some(TypeTag::String))],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let key = require_key(&args[0])?;
            with_entries(receiver, |m| {
                m.get(&key).cloned().ok_or_else(|| RuntimeFault::KeyNotFound(key.clone()).into())
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "contains",
        vec![Param::new("key", Some(TypeTag::String))],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let key = require_key(&args[0])?;
            with_entries(receiver, |m| Ok(Value::Bool(m.contains_key(&key))))
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "remove",
        vec![Param::new("key", Some(TypeTag::String))],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let key = require_key(&args[0])?;
            with_entries_mut(receiver, |m| {
                m.remove(&key).ok_or_else(|| RuntimeFault::KeyNotFound(key.clone()).into())
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "clear",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_entries_mut(receiver, |m| {
                m.clear();
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "keys",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_entries(receiver, |m| {
                let keys = m.keys().map(|k| Value::string(k.clone())).collect();
                Ok(Value::Object(crate::builtins::sequence::new_sequence(keys)))
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "values",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_entries(receiver, |m| {
                let values = m.values().cloned().collect();
                Ok(Value::Object(crate::builtins::sequence::new_sequence(values)))
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "pairs",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_entries(receiver, |m| {
                let pairs = m
                    .iter()
                    .map(|(k, v)| {
                        Value::Object(crate::builtins::sequence::new_sequence(vec![
                            Value::string(k.clone()),
                            v.clone(),
                        ]))
                    })
                    .collect();
                Ok(Value::Object(crate::builtins::sequence::new_sequence(pairs)))
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "merge_from",
        vec![Param::new("other", Some(TypeTag::Object(SHORT_NAME.to_string())))],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let other = require_mapping(&args[0])?;
            let snapshot = with_entries(&other, |m| Ok(m.clone()))?;
            with_entries_mut(receiver, |m| {
                m.extend(snapshot);
                Ok(Value::Nothing)
            })
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "copy",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            with_entries(receiver, |m| Ok(Value::Object(new_mapping(m.clone()))))
        },
    ));

    Class::register(def, |_| None).expect("Mapping has no parents to resolve")
}
