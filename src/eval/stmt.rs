//! Statement execution (§4.7).

use std::sync::Arc;

use crate::ast::{ClassDecl, Stmt};
use crate::class::{Class, ClassDefinition};
use crate::env::{Environment, VariableRecord};
use crate::error::{EvalResult, Fault, RuntimeFault};

use super::{Evaluator, Flow};

impl Evaluator {
    /// Execute a single statement (§4.7), returning how the enclosing
    /// block should continue.
    pub fn eval_stmt(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        match stmt {
            Stmt::Let {
                name,
                type_tag,
                is_locked,
                is_public,
                value,
            } => {
                let v = self.eval_expr(value)?;
                let cast = match type_tag {
                    Some(tag) => v.cast(tag)?,
                    None => v,
                };
                self.env.define_variable(
                    name.clone(),
                    VariableRecord::new(type_tag.clone(), *is_locked, *is_public, cast),
                )?;
                Ok(Flow::Normal)
            }

            Stmt::DefFunction(f) => {
                self.env.define_function(f.name.clone(), Arc::clone(f))?;
                Ok(Flow::Normal)
            }

            Stmt::DefClass(decl) => {
                self.define_class(decl)?;
                Ok(Flow::Normal)
            }

            Stmt::Assign { name, value } => {
                let v = self.eval_expr(value)?;
                self.env.assign_variable(name, v)?;
                Ok(Flow::Normal)
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let branch_env = Environment::new_child(&self.env);
                let saved = std::mem::replace(&mut self.env, branch_env);
                let taken = self.eval_expr(cond);
                let result = match taken {
                    Ok(v) if v.to_bool() => self.eval_block(then_branch),
                    Ok(_) => self.eval_block(else_branch),
                    Err(e) => Err(e),
                };
                self.env = saved;
                result
            }

            Stmt::While { cond, body } => {
                loop {
                    if self.is_cancelled() {
                        return Err(self.fatal("evaluation cancelled"));
                    }
                    if !self.eval_expr(cond)?.to_bool() {
                        break;
                    }

                    let loop_env = Environment::new_child(&self.env);
                    let saved = std::mem::replace(&mut self.env, loop_env);
                    let flow = self.eval_block(body);
                    self.env = saved;

                    match flow? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => continue,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),

            Stmt::Return(expr) => {
                let v = match expr {
                    Some(e) => self.eval_expr(e)?,
                    None => crate::value::Value::Nothing,
                };
                Ok(Flow::Return(v))
            }

            Stmt::Raise(expr) => {
                let v = self.eval_expr(expr)?;
                Err(Fault::Script(RuntimeFault::ScriptException(
                    v.to_canonical_string(),
                )))
            }

            Stmt::TryCatch {
                body,
                catch_var,
                catch_body,
            } => {
                let guarded_env = Environment::new_child(&self.env);
                let saved = std::mem::replace(&mut self.env, guarded_env);
                let outcome = self.eval_block(body);
                self.env = saved;

                match outcome {
                    Ok(flow) => Ok(flow),
                    Err(fault) if !fault.is_fatal() => {
                        let message = fault
                            .script_message()
                            .unwrap_or_else(|| "unknown error".to_string());
                        let catch_env = Environment::new_child(&self.env);
                        catch_env.define_variable(
                            catch_var.clone(),
                            VariableRecord::new(
                                None,
                                false,
                                true,
                                crate::value::Value::string(message),
                            ),
                        )?;
                        let saved = std::mem::replace(&mut self.env, catch_env);
                        let result = self.eval_block(catch_body);
                        self.env = saved;
                        result
                    }
                    // fatal faults are never caught (§4.7, §7)
                    Err(fatal) => Err(fatal),
                }
            }

            Stmt::ExprStmt(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Register a class declaration (§4.3): resolve its declared parents
    /// against the current environment chain, then register it.
    fn define_class(&mut self, decl: &ClassDecl) -> EvalResult<()> {
        let mut def = ClassDefinition::new(decl.module.clone(), decl.short_name.clone());
        for parent in &decl.parent_names {
            def = def.with_parent(parent.clone());
        }
        for f in &decl.public_functions {
            def = def.with_public_function(Arc::clone(f));
        }
        for f in &decl.private_functions {
            def = def.with_private_function(Arc::clone(f));
        }
        for v in &decl.public_variables {
            def = def.with_public_variable(Arc::clone(v));
        }
        for v in &decl.private_variables {
            def = def.with_private_variable(Arc::clone(v));
        }
        def.shared_public_variables = decl.shared_public_variables.clone();
        def.shared_private_variables = decl.shared_private_variables.clone();

        let env = Arc::clone(&self.env);
        let class = Class::register(def, |name| env.get_class(name))?;
        self.env.define_class(class.qualified_name.clone(), Arc::clone(&class))?;
        self.env.define_class(class.short_name.clone(), class)?;
        Ok(())
    }
}
