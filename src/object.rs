//! Object Instances (§3, §4.4) and the native-data slot (§9).
//!
//! Grounded in the teacher's `RuntimeObject` (instance fields map) and
//! `Object` header (`sources/runtime/src/object/builtins.rs`, which backs
//! every heap value with a `class` pointer and an interior lock). Here the
//! per-instance lock is narrowed to just the member table, and the
//! teacher's raw type-erased native handle becomes a safe discriminated
//! union per §9's "single polymorphic slot" recommendation, generalized to
//! `Send + Sync` since workers (§5) run instances across real OS threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::class::{Accessor, Class, FunctionDescriptor, MemberVariableDescriptor};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::value::Value;

/// A single instance member-variable slot: the governing descriptor plus,
/// for value-cell slots only, a lazily-locked value cell (invariant 3:
/// native-accessor slots never have a stored value read or written
/// directly).
pub struct MemberSlot {
    pub descriptor: Arc<MemberVariableDescriptor>,
    cell: Option<ValueCell>,
}

/// A write-once-after-initialization value cell (§3, §4.4, invariant 2).
pub struct ValueCell {
    value: RwLock<Value>,
    initialized: AtomicBool,
}

impl ValueCell {
    fn new(default: Value) -> Self {
        Self {
            value: RwLock::new(default),
            initialized: AtomicBool::new(false),
        }
    }

    pub fn get(&self) -> Value {
        self.value.read().clone()
    }

    /// Store `v`. If `locked` and the cell was already initialized once,
    /// fails with `AssignToLocked`.
    pub fn set(&self, name: &str, v: Value, locked: bool) -> EvalResult<()> {
        if locked && self.initialized.load(Ordering::SeqCst) {
            return Err(Fault::Script(RuntimeFault::AssignToLocked(name.to_string())));
        }
        *self.value.write() = v;
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl MemberSlot {
    fn new(descriptor: Arc<MemberVariableDescriptor>) -> Self {
        let cell = match descriptor.accessor {
            Accessor::ValueCell => Some(ValueCell::new(descriptor.default.clone())),
            Accessor::GetOnly(_) | Accessor::GetSet(_, _) => None,
        };
        Self { descriptor, cell }
    }
}

/// The opaque per-instance native state (§3, §9). A discriminated union
/// over the known built-in state kinds, per §9's recommendation, rather
/// than a raw type-erased pointer — idiomatic Rust has no need for the
/// teacher's `unsafe` handle once the state kinds are enumerable.
pub enum NativeData {
    None,
    Sequence(RwLock<Vec<Value>>),
    Mapping(RwLock<std::collections::BTreeMap<String, Value>>),
    Mutex(crate::builtins::mutex::MutexState),
    Worker(crate::builtins::worker::WorkerState),
    Process(crate::builtins::process::ProcessState),
    HttpClient(crate::builtins::http::HttpClientState),
    /// A bound method (§4.6, GLOSSARY): a function descriptor paired with
    /// the receiver it was resolved against (`None` for a free function).
    /// Represented as an instance of a hidden internal class rather than a
    /// seventh `Value` variant, keeping the value model's closed 6-variant
    /// table (§3) intact.
    BoundMethod(Arc<FunctionDescriptor>, Option<Arc<ObjectInstance>>),
}

impl fmt::Debug for NativeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            NativeData::None => "None",
            NativeData::Sequence(_) => "Sequence",
            NativeData::Mapping(_) => "Mapping",
            NativeData::Mutex(_) => "Mutex",
            NativeData::Worker(_) => "Worker",
            NativeData::Process(_) => "Process",
            NativeData::HttpClient(_) => "HttpClient",
            NativeData::BoundMethod(_, _) => "BoundMethod",
        };
        write!(f, "NativeData::{tag}")
    }
}

/// An Object Instance (§3).
pub struct ObjectInstance {
    pub class: Arc<Class>,
    members: RwLock<HashMap<String, MemberSlot>>,
    pub native: RwLock<NativeData>,
    pub definition_env: Arc<Environment>,
}

impl fmt::Debug for ObjectInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectInstance")
            .field("class", &self.class.qualified_name)
            .finish_non_exhaustive()
    }
}

impl ObjectInstance {
    /// Synthesize the member table for a new instance of `class` (§4.4):
    /// walk the MRO from most distant ancestor toward `class`, inserting
    /// each declared member variable not yet present and initializing
    /// value-cell slots to their default.
    pub fn new(class: Arc<Class>, definition_env: Arc<Environment>) -> Arc<Self> {
        let mut members = HashMap::new();
        for descriptor in class.instance_variables_ancestor_first() {
            members
                .entry(descriptor.name.clone())
                .or_insert_with(|| MemberSlot::new(descriptor));
        }

        Arc::new(Self {
            class,
            members: RwLock::new(members),
            native: RwLock::new(NativeData::None),
            definition_env,
        })
    }

    /// Construct an instance with the native-data slot already populated,
    /// for built-in classes that are entirely native-backed (§4.8, §4.9).
    pub fn new_with_native(
        class: Arc<Class>,
        definition_env: Arc<Environment>,
        native: NativeData,
    ) -> Arc<Self> {
        let instance = Self::new(class, definition_env);
        *instance.native.write() = native;
        instance
    }

    /// Invariant 1: the member table's keys equal exactly the union of
    /// declared member variables across the MRO.
    pub fn member_names(&self) -> Vec<String> {
        self.members.read().keys().cloned().collect()
    }

    pub fn has_member_variable(&self, name: &str) -> bool {
        self.members.read().contains_key(name)
    }

    /// Read `obj.member` where `member` is known to be a variable slot
    /// (§4.6). Does not perform the method/private-access fallback; that
    /// lives in the evaluator's member-access expression handling, which
    /// also knows the caller's static `self` class.
    pub fn read_variable(self: &Arc<Self>, name: &str) -> EvalResult<Value> {
        let slot_descriptor = {
            let members = self.members.read();
            let slot = members
                .get(name)
                .ok_or_else(|| RuntimeFault::UnknownMember {
                    class: self.class.qualified_name.clone(),
                    member: name.to_string(),
                })?;
            slot.descriptor.clone()
        };

        match slot_descriptor.accessor {
            Accessor::ValueCell => {
                let members = self.members.read();
                let slot = members.get(name).unwrap();
                Ok(slot.cell.as_ref().unwrap().get())
            }
            Accessor::GetOnly(getter) | Accessor::GetSet(getter, _) => getter(self),
        }
    }

    /// Write `obj.member = v` where `member` is known to be a variable
    /// slot (§4.6). Type-tag casting is performed by the caller before
    /// invoking this, since it needs the evaluator's cast machinery.
    pub fn write_variable(self: &Arc<Self>, name: &str, v: Value) -> EvalResult<()> {
        let descriptor = {
            let members = self.members.read();
            let slot = members
                .get(name)
                .ok_or_else(|| RuntimeFault::UnknownMember {
                    class: self.class.qualified_name.clone(),
                    member: name.to_string(),
                })?;
            slot.descriptor.clone()
        };

        match descriptor.accessor {
            Accessor::ValueCell => {
                let members = self.members.read();
                let slot = members.get(name).unwrap();
                slot.cell.as_ref().unwrap().set(name, v, descriptor.is_locked)
            }
            Accessor::GetOnly(_) => Err(Fault::Script(RuntimeFault::AssignToLocked(
                name.to_string(),
            ))),
            Accessor::GetSet(_, setter) => setter(self, v),
        }
    }

    pub fn descriptor_for(&self, name: &str) -> Option<Arc<MemberVariableDescriptor>> {
        self.members.read().get(name).map(|s| s.descriptor.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ClassDefinition, FunctionDescriptor};

    fn empty_env() -> Arc<Environment> {
        Arc::new(Environment::root())
    }

    #[test]
    fn member_table_matches_mro_union() {
        let a = Class::register(
            ClassDefinition::new("m", "A").with_public_variable(
                MemberVariableDescriptor::value_cell("x", None, Value::Integer(1), false, true),
            ),
            |_| None,
        )
        .unwrap();

        let registry = vec![Arc::clone(&a)];
        let b = Class::register(
            ClassDefinition::new("m", "B")
                .with_parent(a.qualified_name.clone())
                .with_public_variable(MemberVariableDescriptor::value_cell(
                    "y",
                    None,
                    Value::Integer(2),
                    false,
                    true,
                )),
            |n| registry.iter().find(|c| c.qualified_name == n).cloned(),
        )
        .unwrap();

        let instance = ObjectInstance::new(Arc::clone(&b), empty_env());
        let mut names = instance.member_names();
        names.sort();
        assert_eq!(names, vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn locked_member_rejects_second_write() {
        let a = Class::register(
            ClassDefinition::new("m", "A").with_public_variable(
                MemberVariableDescriptor::value_cell("id", None, Value::Nothing, true, true),
            ),
            |_| None,
        )
        .unwrap();
        let instance = ObjectInstance::new(a, empty_env());

        instance.write_variable("id", Value::Integer(1)).unwrap();
        let second = instance.write_variable("id", Value::Integer(2));
        assert!(matches!(
            second,
            Err(Fault::Script(RuntimeFault::AssignToLocked(_)))
        ));
    }

    #[test]
    fn most_derived_descriptor_wins_for_shared_name() {
        let a = Class::register(
            ClassDefinition::new("m", "A").with_public_variable(
                MemberVariableDescriptor::value_cell(
                    "tag",
                    None,
                    Value::string("from-a"),
                    false,
                    true,
                ),
            ),
            |_| None,
        )
        .unwrap();

        let registry = vec![Arc::clone(&a)];
        let b = Class::register(
            ClassDefinition::new("m", "B")
                .with_parent(a.qualified_name.clone())
                .with_public_variable(MemberVariableDescriptor::value_cell(
                    "tag",
                    None,
                    Value::string("from-b"),
                    false,
                    true,
                )),
            |n| registry.iter().find(|c| c.qualified_name == n).cloned(),
        )
        .unwrap();

        let instance = ObjectInstance::new(b, empty_env());
        let v = instance.read_variable("tag").unwrap();
        assert_eq!(v.to_canonical_string(), "from-b");
    }

    #[allow(dead_code)]
    fn _unused(_: Arc<FunctionDescriptor>) {}
}
