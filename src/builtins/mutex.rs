//! The Mutex built-in (§5: "Mutex object").
//!
//! Grounded in the teacher's `VMThread`'s `Mutex`-guarded stacks
//! (`src/runtime/threading/thread.rs`), generalized from an internal VM
//! implementation detail into a script-visible class so guest code can
//! coordinate workers explicitly (§5).

use std::sync::Arc;
use std::thread::ThreadId;

use lazy_static::lazy_static;
use parking_lot::Mutex as PLMutex;

use crate::class::{Class, ClassDefinition, FunctionDescriptor, MemberVariableDescriptor};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::{TypeTag, Value};

pub const MODULE: &str = "core";
pub const SHORT_NAME: &str = "Mutex";

pub struct MutexState {
    holder: PLMutex<Option<ThreadId>>,
}

lazy_static! {
    pub static ref MUTEX_CLASS: Arc<Class> = build_class();
}

pub fn new_mutex() -> Arc<ObjectInstance> {
    ObjectInstance::new_with_native(
        Arc::clone(&MUTEX_CLASS),
        Arc::new(Environment::root()),
        NativeData::Mutex(MutexState {
            holder: PLMutex::new(None),
        }),
    )
}

fn require_receiver<'a>(
    receiver: Option<&'a Arc<ObjectInstance>>,
) -> EvalResult<&'a Arc<ObjectInstance>> {
    receiver.ok_or_else(|| Fault::Internal(anyhow::anyhow!("Mutex method called with no receiver")))
}

fn build_class() -> Arc<Class> {
    let mut def = ClassDefinition::new(MODULE, SHORT_NAME);

    def = def.with_public_variable(MemberVariableDescriptor::get_only(
        "locked",
        Some(TypeTag::Bool),
        true,
        |receiver| {
            let guard = receiver.native.read();
            match &*guard {
                NativeData::Mutex(state) => Ok(Value::Bool(state.holder.lock().is_some())),
                _ => Err(corrupt()),
            }
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "lock",
        vec![],
        true,
        |_, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            let this_thread = std::thread::current().id();
            loop {
                let guard = receiver.native.read();
                let NativeData::Mutex(state) = &*guard else {
                    return Err(corrupt());
                };
                let mut holder = state.holder.lock();
                match *holder {
                    None => {
                        *holder = Some(this_thread);
                        return Ok(Value::Nothing);
                    }
                    Some(_) => {
                        drop(holder);
                        drop(guard);
                        std::thread::yield_now();
                    }
                }
            }
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "unlock",
        vec![],
        true,
        |evaluator, receiver, _args| {
            let receiver = require_receiver(receiver)?;
            let this_thread = std::thread::current().id();
            let guard = receiver.native.read();
            let NativeData::Mutex(state) = &*guard else {
                return Err(corrupt());
            };
            let mut holder = state.holder.lock();
            match *holder {
                None => Err(Fault::Script(RuntimeFault::NotLocked)),
                Some(owner) if owner != this_thread => {
                    Err(evaluator.fatal("unlock called by a thread that does not hold this mutex"))
                }
                Some(_) => {
                    *holder = None;
                    Ok(Value::Nothing)
                }
            }
        },
    ));

    Class::register(def, |_| None).expect("Mutex has no parents to resolve")
}

fn corrupt() -> Fault {
    Fault::Internal(anyhow::anyhow!(
        "Mutex instance's native-data slot was not a Mutex"
    ))
}
