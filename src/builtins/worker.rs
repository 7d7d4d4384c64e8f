//! The Worker built-in (§5: "forked evaluator context... runs in parallel
//! on OS threads").
//!
//! Grounded in the teacher's `ThreadManager`/`VMThread`
//! (`src/runtime/threading/thread_manager.rs`), generalized from the
//! teacher's single interpreter-owned thread pool to script-spawnable
//! `std::thread` workers, each carrying an [`Evaluator::fork`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use lazy_static::lazy_static;
use parking_lot::Mutex as PLMutex;

use crate::class::{Class, ClassDefinition, FunctionDescriptor, MemberVariableDescriptor, Member};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::{TypeTag, Value};

pub const MODULE: &str = "core";
pub const SHORT_NAME: &str = "Worker";

enum Outcome {
    Ok(Value),
    Err { message: String, fatal: bool },
}

pub struct WorkerState {
    running: AtomicBool,
    finished: AtomicBool,
    handle: PLMutex<Option<JoinHandle<()>>>,
    outcome: PLMutex<Option<Outcome>>,
}

lazy_static! {
    pub static ref WORKER_CLASS: Arc<Class> = build_class();
}

pub fn new_worker(class: Arc<Class>, definition_env: Arc<Environment>) -> Arc<ObjectInstance> {
    ObjectInstance::new_with_native(
        class,
        definition_env,
        NativeData::Worker(WorkerState {
            running: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            handle: PLMutex::new(None),
            outcome: PLMutex::new(None),
        }),
    )
}

fn require_receiver<'a>(
    receiver: Option<&'a Arc<ObjectInstance>>,
) -> EvalResult<&'a Arc<ObjectInstance>> {
    receiver.ok_or_else(|| Fault::Internal(anyhow::anyhow!("Worker method called with no receiver")))
}

fn corrupt() -> Fault {
    Fault::Internal(anyhow::anyhow!(
        "Worker instance's native-data slot was not a Worker"
    ))
}

fn build_class() -> Arc<Class> {
    let mut def = ClassDefinition::new(MODULE, SHORT_NAME);

    def = def.with_public_variable(MemberVariableDescriptor::get_only(
        "running",
        Some(TypeTag::Bool),
        true,
        |receiver| match &*receiver.native.read() {
            NativeData::Worker(state) => Ok(Value::Bool(state.running.load(Ordering::SeqCst))),
            _ => Err(corrupt()),
        },
    ));

    def = def.with_public_variable(MemberVariableDescriptor::get_only(
        "finished",
        Some(TypeTag::Bool),
        true,
        |receiver| match &*receiver.native.read() {
            NativeData::Worker(state) => Ok(Value::Bool(state.finished.load(Ordering::SeqCst))),
            _ => Err(corrupt()),
        },
    ));

    // Base case (§5): "the base raises NotImplemented". A subclass
    // overrides `spin` with its own public function of the same name,
    // which shadows this one per §4.3's MRO lookup order.
    def = def.with_public_function(FunctionDescriptor::native(
        "spin",
        vec![],
        true,
        |_, _receiver, _args| Err(Fault::Script(RuntimeFault::NotImplemented("spin".to_string()))),
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "start",
        vec![],
        true,
        |evaluator, receiver, _args| {
            let receiver = require_receiver(receiver)?;

            {
                let guard = receiver.native.read();
                let NativeData::Worker(state) = &*guard else {
                    return Err(corrupt());
                };
                if state.running.swap(true, Ordering::SeqCst) {
                    return Err(Fault::Script(RuntimeFault::AlreadyRunning));
                }
                state.finished.store(false, Ordering::SeqCst);
            }

            let mut forked = evaluator.fork();
            let receiver_for_thread = Arc::clone(receiver);

            let handle = std::thread::spawn(move || {
                let spin_result = match receiver_for_thread
                    .class
                    .lookup("spin", Some(receiver_for_thread.class.qualified_name.as_str()))
                {
                    Some(Member::Function(f)) => {
                        crate::eval::invoke::invoke(&mut forked, &f, Some(&receiver_for_thread), &[])
                    }
                    _ => Err(Fault::Script(RuntimeFault::NotImplemented("spin".to_string()))),
                };

                let outcome = match spin_result {
                    Ok(v) => Outcome::Ok(v),
                    Err(fault) => Outcome::Err {
                        fatal: fault.is_fatal(),
                        message: fault.script_message().unwrap_or_else(|| fault.to_string()),
                    },
                };

                if let NativeData::Worker(state) = &*receiver_for_thread.native.read() {
                    *state.outcome.lock() = Some(outcome);
                    state.finished.store(true, Ordering::SeqCst);
                    state.running.store(false, Ordering::SeqCst);
                }
            });

            if let NativeData::Worker(state) = &*receiver.native.read() {
                *state.handle.lock() = Some(handle);
            }

            Ok(Value::Nothing)
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "join",
        vec![],
        true,
        |evaluator, receiver, _args| {
            let receiver = require_receiver(receiver)?;

            let handle = {
                let guard = receiver.native.read();
                let NativeData::Worker(state) = &*guard else {
                    return Err(corrupt());
                };
                state.handle.lock().take()
            };

            if let Some(handle) = handle {
                handle
                    .join()
                    .map_err(|_| evaluator.fatal("worker thread panicked"))?;
            }

            let outcome = {
                let guard = receiver.native.read();
                let NativeData::Worker(state) = &*guard else {
                    return Err(corrupt());
                };
                state.outcome.lock().take()
            };

            match outcome {
                Some(Outcome::Ok(v)) => Ok(v),
                Some(Outcome::Err { message, fatal: true }) => Err(evaluator.fatal(message)),
                Some(Outcome::Err { message, fatal: false }) => {
                    Err(Fault::Script(RuntimeFault::ScriptException(message)))
                }
                None => Err(evaluator.fatal("join called on a worker that never ran")),
            }
        },
    ));

    Class::register(def, |_| None).expect("Worker has no parents to resolve")
}
