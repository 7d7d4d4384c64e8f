//! Member Variable Descriptors and Function Descriptors (§3).
//!
//! Grounded in the teacher's accessor-less `NativeFunction` split
//! (`Static`/`Instance`, `sources/interpreter_two/src/native/mod.rs`) and
//! its `NameAndDescriptor` keying scheme, generalized with the
//! accessor sum type §9 calls for: `{ValueCell, GetOnly(fn), GetSet(fn,fn)}`.

use std::fmt;
use std::sync::Arc;

use crate::ast::Stmt;
use crate::error::EvalResult;
use crate::eval::Evaluator;
use crate::object::ObjectInstance;
use crate::value::{TypeTag, Value};

/// A native function receives the evaluator (so it can invoke further
/// script callbacks, spawn workers, etc.), an optional receiver (`None`
/// for a free function / class-level shared function), and the argument
/// vector, and returns a value or an error (§6).
pub type NativeFn = fn(&mut Evaluator, Option<&Arc<ObjectInstance>>, &[Value]) -> EvalResult<Value>;

/// One declared parameter (§3: "each with name and optional type tag").
#[derive(Clone, Debug)]
pub struct Param {
    pub name: String,
    pub type_tag: Option<TypeTag>,
}

impl Param {
    pub fn new(name: impl Into<String>, type_tag: Option<TypeTag>) -> Self {
        Self {
            name: name.into(),
            type_tag,
        }
    }
}

/// The callable body: exactly a script AST body or a native
/// implementation (§3).
#[derive(Clone)]
pub enum Body {
    Script(Arc<Vec<Stmt>>),
    Native(NativeFn),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Script(stmts) => f.debug_tuple("Script").field(&stmts.len()).finish(),
            Body::Native(_) => write!(f, "Native(..)"),
        }
    }
}

/// A Function Descriptor (§3).
#[derive(Clone, Debug)]
pub struct FunctionDescriptor {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeTag>,
    pub varargs: bool,
    pub is_public: bool,
    pub body: Body,
}

impl FunctionDescriptor {
    pub fn native(
        name: impl Into<String>,
        params: Vec<Param>,
        is_public: bool,
        f: NativeFn,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            params,
            return_type: None,
            varargs: false,
            is_public,
            body: Body::Native(f),
        })
    }

    pub fn native_varargs(name: impl Into<String>, is_public: bool, f: NativeFn) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            params: vec![],
            return_type: None,
            varargs: true,
            is_public,
            body: Body::Native(f),
        })
    }

    pub fn script(
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: Option<TypeTag>,
        varargs: bool,
        is_public: bool,
        body: Vec<Stmt>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            params,
            return_type,
            varargs,
            is_public,
            body: Body::Script(Arc::new(body)),
        })
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, Body::Native(_))
    }
}

/// Native getter/setter accessors for a member-variable slot (§3, §9).
pub type NativeGetter = fn(&Arc<ObjectInstance>) -> EvalResult<Value>;
pub type NativeSetter = fn(&Arc<ObjectInstance>, Value) -> EvalResult<()>;

/// How a member-variable slot is physically backed (§9's resolved sum
/// type).
#[derive(Clone, Copy)]
pub enum Accessor {
    /// An ordinary value cell; the default is materialized at instance
    /// creation time (§4.4).
    ValueCell,
    /// Read-only, computed by a native getter. The stored default (if any)
    /// is never consulted.
    GetOnly(NativeGetter),
    /// Fully native-backed; both reads and writes route through the
    /// accessors and the slot never holds a value cell.
    GetSet(NativeGetter, NativeSetter),
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accessor::ValueCell => write!(f, "ValueCell"),
            Accessor::GetOnly(_) => write!(f, "GetOnly(..)"),
            Accessor::GetSet(_, _) => write!(f, "GetSet(..)"),
        }
    }
}

/// A Member Variable Descriptor (§3).
#[derive(Clone, Debug)]
pub struct MemberVariableDescriptor {
    pub name: String,
    pub type_tag: Option<TypeTag>,
    pub default: Value,
    pub is_locked: bool,
    pub is_public: bool,
    pub accessor: Accessor,
}

impl MemberVariableDescriptor {
    pub fn value_cell(
        name: impl Into<String>,
        type_tag: Option<TypeTag>,
        default: Value,
        is_locked: bool,
        is_public: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            type_tag,
            default,
            is_locked,
            is_public,
            accessor: Accessor::ValueCell,
        })
    }

    pub fn get_only(
        name: impl Into<String>,
        type_tag: Option<TypeTag>,
        is_public: bool,
        getter: NativeGetter,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            type_tag,
            default: Value::Nothing,
            is_locked: false,
            is_public,
            accessor: Accessor::GetOnly(getter),
        })
    }

    pub fn get_set(
        name: impl Into<String>,
        type_tag: Option<TypeTag>,
        is_public: bool,
        getter: NativeGetter,
        setter: NativeSetter,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            type_tag,
            default: Value::Nothing,
            is_locked: false,
            is_public,
            accessor: Accessor::GetSet(getter, setter),
        })
    }

    pub fn is_native_backed(&self) -> bool {
        !matches!(self.accessor, Accessor::ValueCell)
    }
}
