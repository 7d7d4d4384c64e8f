//! The HttpClient illustration builtin (§4.9, §6).
//!
//! Thin by design, per §4.9: the shape of the native binding contract is
//! normative, the I/O is not. A production build would replace the native
//! bodies below with a complete request implementation; the tests here
//! exercise `cast`/`TypeMismatch` and timeout storage without making a
//! real network call, exactly as §4.9 specifies.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::builtins::mapping;
use crate::class::{Class, ClassDefinition, FunctionDescriptor, MemberVariableDescriptor, Param};
use crate::env::Environment;
use crate::error::{EvalResult, Fault, RuntimeFault};
use crate::object::{NativeData, ObjectInstance};
use crate::value::{TypeTag, Value};

pub const MODULE: &str = "core";
pub const SHORT_NAME: &str = "HttpClient";
pub const RESPONSE_SHORT_NAME: &str = "HttpResponse";

/// No connection state is held natively beyond the configured timeout
/// (a plain member variable); this marker exists so `HttpClient` still
/// participates in the native-data slot contract like every other
/// native-backed class in this module.
pub struct HttpClientState;

lazy_static! {
    pub static ref HTTP_CLIENT_CLASS: Arc<Class> = build_client_class();
    pub static ref HTTP_RESPONSE_CLASS: Arc<Class> = build_response_class();
}

pub fn new_client() -> Arc<ObjectInstance> {
    ObjectInstance::new_with_native(
        Arc::clone(&HTTP_CLIENT_CLASS),
        Arc::new(Environment::root()),
        NativeData::HttpClient(HttpClientState),
    )
}

fn require_receiver<'a>(
    receiver: Option<&'a Arc<ObjectInstance>>,
) -> EvalResult<&'a Arc<ObjectInstance>> {
    receiver
        .ok_or_else(|| Fault::Internal(anyhow::anyhow!("HttpClient method called with no receiver")))
}

fn do_request(
    receiver: &Arc<ObjectInstance>,
    method: &str,
    url: &str,
) -> EvalResult<Arc<ObjectInstance>> {
    let timeout_ms = receiver
        .read_variable("timeout")
        .ok()
        .and_then(|v| v.as_integer().copied())
        .unwrap_or(30_000);

    // Thin illustration only (§4.9): no real socket I/O is attempted here.
    // A production build would issue the request with a deadline of
    // `timeout_ms` and populate `status`/`headers` from the real response.
    let _ = (method, url, timeout_ms);

    let response = ObjectInstance::new(Arc::clone(&HTTP_RESPONSE_CLASS), Arc::new(Environment::root()));
    response.write_variable("status", Value::Integer(501))?;
    response.write_variable(
        "headers",
        Value::Object(mapping::new_mapping(Default::default())),
    )?;
    Ok(response)
}

fn build_client_class() -> Arc<Class> {
    let mut def = ClassDefinition::new(MODULE, SHORT_NAME);

    def = def.with_public_variable(MemberVariableDescriptor::value_cell(
        "timeout",
        Some(TypeTag::Integer),
        Value::Integer(30_000),
        false,
        true,
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "get",
        vec![Param::new("url", Some(TypeTag::String))],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let url = args[0].to_canonical_string();
            Ok(Value::Object(do_request(receiver, "GET", &url)?))
        },
    ));

    def = def.with_public_function(FunctionDescriptor::native(
        "post",
        vec![
            Param::new("url", Some(TypeTag::String)),
            Param::new("body", Some(TypeTag::String)),
        ],
        true,
        |_, receiver, args| {
            let receiver = require_receiver(receiver)?;
            let url = args[0].to_canonical_string();
            let _body = args[1].to_canonical_string();
            Ok(Value::Object(do_request(receiver, "POST", &url)?))
        },
    ));

    Class::register(def, |_| None).expect("HttpClient has no parents to resolve")
}

fn build_response_class() -> Arc<Class> {
    let def = ClassDefinition::new(MODULE, RESPONSE_SHORT_NAME)
        .with_public_variable(MemberVariableDescriptor::value_cell(
            "status",
            Some(TypeTag::Integer),
            Value::Integer(0),
            true,
            true,
        ))
        .with_public_variable(MemberVariableDescriptor::value_cell(
            "headers",
            Some(TypeTag::Object(mapping::SHORT_NAME.to_string())),
            Value::Nothing,
            true,
            true,
        ));

    Class::register(def, |_| None).expect("HttpResponse has no parents to resolve")
}
