//! Exception handling (§4.7, §7): `raise`/`try`/`catch` at the statement
//! level, and the fatal/catchable split that keeps a mutex misuse from
//! being swallowed by a guarding `try` block.

use std::sync::Arc;

use ol_runtime::ast::{Expr, Stmt};
use ol_runtime::builtins::mutex::{new_mutex, MUTEX_CLASS};
use ol_runtime::env::{Environment, VariableRecord};
use ol_runtime::error::Fault;
use ol_runtime::eval::{Evaluator, Flow};
use ol_runtime::value::Value;

#[test]
fn raised_exception_is_caught_and_binds_the_message() {
    let program = vec![Stmt::TryCatch {
        body: vec![Stmt::Raise(Expr::lit(Value::string("boom")))],
        catch_var: "err".to_string(),
        catch_body: vec![Stmt::Assign {
            name: "result".to_string(),
            value: Expr::Ident("err".to_string()),
        }],
    }];

    let root = Arc::new(Environment::root());
    root.define_variable("result", VariableRecord::new(None, false, true, Value::Nothing))
        .unwrap();
    let mut ev = Evaluator::new(root);
    let flow = ev.eval_block(&program).unwrap();
    assert!(matches!(flow, Flow::Normal));
    assert_eq!(
        ev.env.get_variable("result").unwrap().get().to_canonical_string(),
        "boom"
    );
}

#[test]
fn uncaught_raise_propagates_out_of_a_nested_block() {
    let program = vec![Stmt::If {
        cond: Expr::lit(Value::Bool(true)),
        then_branch: vec![Stmt::Raise(Expr::lit(Value::string("unrecoverable")))],
        else_branch: vec![],
    }];

    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let result = ev.eval_block(&program);
    assert!(matches!(result, Err(Fault::Script(_))));
}

#[test]
fn try_catch_does_not_swallow_a_fatal_fault() {
    // Locking from one (throwaway) evaluator and then attempting to unlock
    // from a `try` block on a different thread identity is a fatal fault
    // (§7), and must escape the surrounding `catch` untouched.
    let mutex = new_mutex();
    {
        let lock = MUTEX_CLASS.public_functions.get("lock").unwrap();
        let locker = std::thread::spawn({
            let mutex = Arc::clone(&mutex);
            move || {
                let mut ev = Evaluator::new(Arc::new(Environment::root()));
                ol_runtime::eval::invoke::invoke(&mut ev, lock, Some(&mutex), &[]).unwrap();
            }
        });
        locker.join().unwrap();
    }

    let root = Arc::new(Environment::root());
    root.define_variable(
        "mtx",
        VariableRecord::new(None, false, true, Value::Object(Arc::clone(&mutex))),
    )
    .unwrap();

    let program = vec![Stmt::TryCatch {
        body: vec![Stmt::ExprStmt(Expr::Call {
            receiver: Some(Box::new(Expr::Ident("mtx".to_string()))),
            name: "unlock".to_string(),
            args: vec![],
        })],
        catch_var: "err".to_string(),
        catch_body: vec![Stmt::Assign {
            name: "mtx".to_string(),
            value: Expr::Ident("mtx".to_string()),
        }],
    }];

    let mut ev = Evaluator::new(root);
    let result = ev.eval_block(&program);
    let Err(fault) = result else {
        panic!("expected the fatal unlock fault to escape the catch block");
    };
    assert!(fault.is_fatal());
}

#[test]
fn locked_top_level_variable_rejects_reassignment() {
    let program = vec![
        Stmt::Let {
            name: "pi".to_string(),
            type_tag: None,
            is_locked: true,
            is_public: true,
            value: Expr::lit(Value::Double(3.14)),
        },
        Stmt::Assign {
            name: "pi".to_string(),
            value: Expr::lit(Value::Double(3.0)),
        },
    ];

    let mut ev = Evaluator::new(Arc::new(Environment::root()));
    let result = ev.eval_block(&program);
    assert!(matches!(
        result,
        Err(Fault::Script(ol_runtime::error::RuntimeFault::AssignToLocked(_)))
    ));
}
