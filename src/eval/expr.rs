//! Expression evaluation (§4.6, §4.7).

use std::sync::Arc;

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::class::Member;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::value::Value;

use super::{bound_method, construct, invoke, Evaluator};

impl Evaluator {
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),

            Expr::Ident(name) => self
                .env
                .get_variable(name)
                .map(|r| r.get())
                .ok_or_else(|| Fault::Script(RuntimeFault::UnknownVariable(name.clone()))),

            Expr::SelfExpr => self
                .self_receiver
                .clone()
                .map(Value::Object)
                .ok_or_else(|| Fault::Script(RuntimeFault::UnknownVariable("self".to_string()))),

            Expr::Binary(op, lhs, rhs) => {
                let a = self.eval_expr(lhs)?;
                let b = self.eval_expr(rhs)?;
                eval_binary(*op, &a, &b)
            }

            Expr::Unary(op, operand) => {
                let v = self.eval_expr(operand)?;
                eval_unary(*op, &v)
            }

            Expr::Logical(op, lhs, rhs) => {
                let a = self.eval_expr(lhs)?;
                match op {
                    LogicalOp::And if !a.to_bool() => Ok(a),
                    LogicalOp::And => self.eval_expr(rhs),
                    LogicalOp::Or if a.to_bool() => Ok(a),
                    LogicalOp::Or => self.eval_expr(rhs),
                }
            }

            Expr::MemberGet(receiver, name) => {
                let obj = self.eval_object(receiver)?;
                self.member_get(&obj, name)
            }

            Expr::MemberSet(receiver, name, value_expr) => {
                let obj = self.eval_object(receiver)?;
                let value = self.eval_expr(value_expr)?;
                self.member_set(&obj, name, value.clone())?;
                Ok(value)
            }

            Expr::Call { receiver, name, args } => {
                let argv = args
                    .iter()
                    .map(|a| self.eval_expr(a))
                    .collect::<EvalResult<Vec<_>>>()?;

                match receiver {
                    Some(recv_expr) => {
                        let obj = self.eval_object(recv_expr)?;
                        self.invoke_member(&obj, name, &argv)
                    }
                    None => self.invoke_unqualified(name, &argv),
                }
            }

            Expr::New { class_name, args } => {
                let argv = args
                    .iter()
                    .map(|a| self.eval_expr(a))
                    .collect::<EvalResult<Vec<_>>>()?;
                let class = self
                    .env
                    .get_class(class_name)
                    .ok_or_else(|| RuntimeFault::UnknownClass(class_name.clone()))?;
                let instance = construct::construct(self, class, &argv)?;
                Ok(Value::Object(instance))
            }

            Expr::Cast { value, target } => {
                let v = self.eval_expr(value)?;
                v.cast(target)
            }
        }
    }

    /// Evaluate `expr` and require it to produce an `Object` (§4.6 is only
    /// ever defined for `obj.member`).
    fn eval_object(&mut self, expr: &Expr) -> EvalResult<Arc<crate::object::ObjectInstance>> {
        match self.eval_expr(expr)? {
            Value::Object(o) => Ok(o),
            other => Err(Fault::Script(RuntimeFault::TypeMismatch {
                expected: "an object instance".to_string(),
                got: other.type_tag().to_string(),
            })),
        }
    }

    /// Read `obj.member` (§4.6).
    pub fn member_get(
        &mut self,
        obj: &Arc<crate::object::ObjectInstance>,
        name: &str,
    ) -> EvalResult<Value> {
        match obj.class.lookup(name, self.current_self_class()) {
            Some(Member::Variable(_)) => obj.read_variable(name),
            Some(Member::Shared(shared)) => Ok(shared.cell.read().clone()),
            Some(Member::Function(f)) => {
                Ok(bound_method::make_bound_method(self, f, Some(Arc::clone(obj))))
            }
            None => Err(Fault::Script(RuntimeFault::UnknownMember {
                class: obj.class.qualified_name.clone(),
                member: name.to_string(),
            })),
        }
    }

    /// Write `obj.member = v` (§4.6).
    pub fn member_set(
        &mut self,
        obj: &Arc<crate::object::ObjectInstance>,
        name: &str,
        value: Value,
    ) -> EvalResult<()> {
        let descriptor = match obj.class.lookup(name, self.current_self_class()) {
            Some(Member::Variable(d)) => d,
            Some(Member::Shared(shared)) => {
                let cast = match &shared.descriptor.type_tag {
                    Some(tag) => value.cast(tag)?,
                    None => value,
                };
                *shared.cell.write() = cast;
                return Ok(());
            }
            Some(Member::Function(_)) => {
                return Err(Fault::Script(RuntimeFault::AssignToLocked(name.to_string())))
            }
            None => {
                return Err(Fault::Script(RuntimeFault::UnknownMember {
                    class: obj.class.qualified_name.clone(),
                    member: name.to_string(),
                }))
            }
        };

        let cast = match &descriptor.type_tag {
            Some(tag) => value.cast(tag)?,
            None => value,
        };
        obj.write_variable(name, cast)
    }

    /// Invoke `obj.name(argv)`, fusing resolve+invoke without materializing
    /// a bound-method object for the common case (§4.6).
    fn invoke_member(
        &mut self,
        obj: &Arc<crate::object::ObjectInstance>,
        name: &str,
        argv: &[Value],
    ) -> EvalResult<Value> {
        match obj.class.lookup(name, self.current_self_class()) {
            Some(Member::Function(f)) => invoke::invoke(self, &f, Some(obj), argv),
            Some(Member::Variable(_)) => {
                let v = obj.read_variable(name)?;
                bound_method::call_bound_method(self, &v, argv)
            }
            Some(Member::Shared(shared)) => {
                let v = shared.cell.read().clone();
                bound_method::call_bound_method(self, &v, argv)
            }
            None => Err(Fault::Script(RuntimeFault::UnknownMember {
                class: obj.class.qualified_name.clone(),
                member: name.to_string(),
            })),
        }
    }

    /// Invoke a bare `name(argv)` call: an implicit-`self` method call
    /// when inside a method body and `self`'s class declares `name`,
    /// otherwise a free function resolved through the environment chain.
    fn invoke_unqualified(&mut self, name: &str, argv: &[Value]) -> EvalResult<Value> {
        if let Some(receiver) = self.self_receiver.clone() {
            if let Some(Member::Function(f)) = receiver.class.lookup(name, self.current_self_class())
            {
                return invoke::invoke(self, &f, Some(&receiver), argv);
            }
        }

        let f = self
            .env
            .get_function(name)
            .ok_or_else(|| RuntimeFault::UnknownFunction(name.to_string()))?;
        invoke::invoke(self, &f, None, argv)
    }
}

fn eval_unary(op: UnaryOp, v: &Value) -> EvalResult<Value> {
    match (op, v) {
        (UnaryOp::Neg, Value::Integer(i)) => i.checked_neg().map(Value::Integer).ok_or(Fault::Script(RuntimeFault::Overflow)),
        (UnaryOp::Neg, Value::Double(d)) => Ok(Value::Double(-d)),
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.to_bool())),
        (UnaryOp::Neg, other) => Err(Fault::Script(RuntimeFault::TypeMismatch {
            expected: "INTEGER or DOUBLE".to_string(),
            got: other.type_tag().to_string(),
        })),
    }
}

fn eval_binary(op: BinaryOp, a: &Value, b: &Value) -> EvalResult<Value> {
    use BinaryOp::*;

    if matches!(op, Eq) {
        return Ok(Value::Bool(a.equals(b)?));
    }
    if matches!(op, Ne) {
        return Ok(Value::Bool(!a.equals(b)?));
    }

    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => match op {
            Add => x.checked_add(*y).map(Value::Integer).ok_or(Fault::Script(RuntimeFault::Overflow)),
            Sub => x.checked_sub(*y).map(Value::Integer).ok_or(Fault::Script(RuntimeFault::Overflow)),
            Mul => x.checked_mul(*y).map(Value::Integer).ok_or(Fault::Script(RuntimeFault::Overflow)),
            Div => {
                if *y == 0 {
                    Err(Fault::Script(RuntimeFault::DivideByZero))
                } else {
                    x.checked_div(*y).map(Value::Integer).ok_or(Fault::Script(RuntimeFault::Overflow))
                }
            }
            Mod => {
                if *y == 0 {
                    Err(Fault::Script(RuntimeFault::DivideByZero))
                } else {
                    x.checked_rem(*y).map(Value::Integer).ok_or(Fault::Script(RuntimeFault::Overflow))
                }
            }
            Lt => Ok(Value::Bool(x < y)),
            Le => Ok(Value::Bool(x <= y)),
            Gt => Ok(Value::Bool(x > y)),
            Ge => Ok(Value::Bool(x >= y)),
            Eq | Ne => unreachable!("handled above"),
        },
        (Value::String(x), Value::String(y)) if matches!(op, Add) => {
            Ok(Value::string(format!("{x}{y}")))
        }
        (Value::String(x), Value::String(y)) => match op {
            Lt => Ok(Value::Bool(x < y)),
            Le => Ok(Value::Bool(x <= y)),
            Gt => Ok(Value::Bool(x > y)),
            Ge => Ok(Value::Bool(x >= y)),
            _ => Err(type_mismatch_for_binary(a, b)),
        },
        _ if is_numeric(a) && is_numeric(b) => {
            let x = as_f64(a);
            let y = as_f64(b);
            match op {
                Add => Ok(Value::Double(x + y)),
                Sub => Ok(Value::Double(x - y)),
                Mul => Ok(Value::Double(x * y)),
                Div => {
                    if y == 0.0 {
                        Err(Fault::Script(RuntimeFault::DivideByZero))
                    } else {
                        Ok(Value::Double(x / y))
                    }
                }
                Mod => {
                    if y == 0.0 {
                        Err(Fault::Script(RuntimeFault::DivideByZero))
                    } else {
                        Ok(Value::Double(x % y))
                    }
                }
                Lt => Ok(Value::Bool(x < y)),
                Le => Ok(Value::Bool(x <= y)),
                Gt => Ok(Value::Bool(x > y)),
                Ge => Ok(Value::Bool(x >= y)),
                Eq | Ne => unreachable!("handled above"),
            }
        }
        _ => Err(type_mismatch_for_binary(a, b)),
    }
}

fn is_numeric(v: &Value) -> bool {
    matches!(v, Value::Integer(_) | Value::Double(_))
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Integer(i) => *i as f64,
        Value::Double(d) => *d,
        _ => unreachable!("guarded by is_numeric"),
    }
}

fn type_mismatch_for_binary(a: &Value, b: &Value) -> Fault {
    Fault::Script(RuntimeFault::TypeMismatch {
        expected: a.type_tag().to_string(),
        got: b.type_tag().to_string(),
    })
}
