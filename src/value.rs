//! The unified value model (§3, §4.1).
//!
//! Mirrors the teacher's `RuntimeValue` (`sources/interpreter_two/src/object/mod.rs`):
//! a small `Clone`-cheap tagged enum, `#[derive(EnumAsInner)]` for
//! ergonomic narrowing in native code, and a `Display` impl that produces
//! the canonical script-visible rendering.

use std::fmt;
use std::sync::Arc;

use enum_as_inner::EnumAsInner;

use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::ObjectInstance;

/// A value is one of the variants in §3's table. `Object` is the only
/// variant that is ever shared rather than copied: cloning a `Value`
/// clones the `Arc`, not the instance it points to.
#[derive(Clone, Debug, EnumAsInner)]
pub enum Value {
    Integer(i64),
    Double(f64),
    String(Arc<str>),
    Bool(bool),
    Nothing,
    Object(Arc<ObjectInstance>),
}

/// The type tag a value reports to script code (§3: "uppercase identifier
/// for script visibility"). `Object`'s tag is the instance's class's short
/// name; `cast`-ing to any ancestor in the MRO is also legal (§4.1) even
/// though the reported tag names only the most-derived class.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Integer,
    Double,
    String,
    Bool,
    Nothing,
    Object(String),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Integer => write!(f, "INTEGER"),
            TypeTag::Double => write!(f, "DOUBLE"),
            TypeTag::String => write!(f, "STRING"),
            TypeTag::Bool => write!(f, "BOOL"),
            TypeTag::Nothing => write!(f, "NOTHING"),
            TypeTag::Object(name) => write!(f, "{name}"),
        }
    }
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Integer(_) => TypeTag::Integer,
            Value::Double(_) => TypeTag::Double,
            Value::String(_) => TypeTag::String,
            Value::Bool(_) => TypeTag::Bool,
            Value::Nothing => TypeTag::Nothing,
            Value::Object(o) => TypeTag::Object(o.class.short_name.clone()),
        }
    }

    /// Truthiness (§3): Bool false; Integer 0; Double 0.0; empty String;
    /// Nothing are false. Everything else, including every Object, is true.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Integer(i) => *i != 0,
            Value::Double(d) => *d != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Bool(b) => *b,
            Value::Nothing => false,
            Value::Object(_) => true,
        }
    }

    /// Canonical string rendering used by `to_string`, string coercion, and
    /// sort's String fallback (§4.8).
    pub fn to_canonical_string(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Double(d) => format_double(*d),
            Value::String(s) => s.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Nothing => "nothing".to_string(),
            Value::Object(o) => format!("<{} instance>", o.class.qualified_name),
        }
    }

    /// Equality (§3, §4.1). Between Object values this is reference
    /// identity unless the class registers an `equals_override` (§9's
    /// resolved extension point); no built-in class in this crate does.
    pub fn equals(&self, other: &Value) -> EvalResult<bool> {
        Ok(match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Integer(a), Value::Double(b)) | (Value::Double(b), Value::Integer(a)) => {
                (*a as f64) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nothing, Value::Nothing) => true,
            (Value::Object(a), Value::Object(b)) => {
                if let Some(over) = a.class.equals_override {
                    return over(a, other);
                }
                Arc::ptr_eq(a, b)
            }
            // differing, incomparable variants: false, never a failure
            _ => false,
        })
    }

    /// `cast(target_tag)` (§4.1).
    pub fn cast(&self, target: &TypeTag) -> EvalResult<Value> {
        if &self.type_tag() == target {
            return Ok(self.clone());
        }

        Ok(match (self, target) {
            (Value::Integer(i), TypeTag::Double) => Value::Double(*i as f64),
            (Value::Double(d), TypeTag::Integer) => {
                if d.is_finite() && *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                    Value::Integer(d.trunc() as i64)
                } else {
                    return Err(Fault::Script(RuntimeFault::Overflow));
                }
            }
            (Value::Integer(i), TypeTag::String) => Value::string(i.to_string()),
            (Value::Double(d), TypeTag::String) => Value::string(format_double(*d)),
            (Value::Bool(b), TypeTag::String) => Value::string(b.to_string()),
            (Value::String(s), TypeTag::Integer) => {
                Value::Integer(parse_integer(s).ok_or_else(|| {
                    Fault::Script(RuntimeFault::ParseError {
                        text: s.to_string(),
                        target: TypeTag::Integer,
                    })
                })?)
            }
            (Value::String(s), TypeTag::Double) => {
                Value::Double(s.trim().parse::<f64>().map_err(|_| {
                    Fault::Script(RuntimeFault::ParseError {
                        text: s.to_string(),
                        target: TypeTag::Double,
                    })
                })?)
            }
            (Value::Bool(b), TypeTag::Integer) => Value::Integer(if *b { 1 } else { 0 }),
            (Value::Object(o), TypeTag::Object(name)) => {
                if o.class.mro.iter().any(|q| class_short_matches(q, name)) {
                    self.clone()
                } else {
                    return Err(Fault::Script(RuntimeFault::CastError {
                        from: self.type_tag(),
                        to: target.clone(),
                    }));
                }
            }
            _ => {
                return Err(Fault::Script(RuntimeFault::CastError {
                    from: self.type_tag(),
                    to: target.clone(),
                }))
            }
        })
    }
}

/// An MRO entry is a qualified name (`module:MODULE.CLASS`); a cast target
/// tag names only the short class name, so match on the segment after the
/// final `.`.
fn class_short_matches(qualified: &str, short: &str) -> bool {
    qualified
        .rsplit('.')
        .next()
        .map(|s| s == short)
        .unwrap_or(false)
        || qualified == short
}

fn parse_integer(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    trimmed.parse::<i64>().ok()
}

const UPPER_SCIENCE_BOUND: f64 = 1_000_000.0;
const LOWER_SCIENCE_BOUND: f64 = 0.000_000_1;

fn format_double(d: f64) -> String {
    if d == 0.0 {
        return "0.0".to_string();
    }
    let mag = d.abs();
    if mag >= UPPER_SCIENCE_BOUND || mag < LOWER_SCIENCE_BOUND {
        format!("{d:e}")
    } else {
        let mut s = format!("{d}");
        if !s.contains('.') {
            s.push_str(".0");
        }
        s
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}
