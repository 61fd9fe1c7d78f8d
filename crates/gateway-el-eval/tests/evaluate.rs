//! Evaluation over compiled templates: navigation, host calls, whitelist
//! enforcement and deferred placeholders resolved by hand

use gateway_el_compiler::{compile, Compiler};
use gateway_el_diagnostics::{ElError, EL0100, EL0101, EL0201};
use gateway_el_eval::{
    EvalError, EvaluationContext, Evaluator, WhitelistConfig, WhitelistRegistry,
};
use gateway_el_model::{TypeDescriptor, TypeRegistry};
use gateway_el_types::{DeferredValue, Headers, HostError, HostObject, Value};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::Arc;

const HOLDER_TYPE: &str = "test.DeferredHolder";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn evaluate(text: &str, whitelist: &WhitelistRegistry, ctx: &EvaluationContext) -> Result<Value, EvalError> {
    let compiled = compile(text).unwrap_or_else(|e| panic!("Failed to compile '{}': {:?}", text, e));
    Evaluator::new(whitelist, ctx).evaluate_template(compiled.executable())
}

fn request_context() -> EvaluationContext {
    let mut headers = Headers::new();
    headers.add("X-Gravitee-Endpoint", "my_api_host");
    let mut request = IndexMap::new();
    request.insert("headers".to_string(), Value::Headers(headers));
    request.insert("content".to_string(), Value::from("hello"));

    let mut ctx = EvaluationContext::new();
    ctx.set_variable("request", Value::Map(request));
    ctx
}

#[rstest]
#[case("{#request.headers['X-Gravitee-Endpoint'][0]}", Value::from("my_api_host"))]
#[case("{#request.headers.getFirst('x-gravitee-endpoint')}", Value::from("my_api_host"))]
#[case(
    "{T(java.util.Base64).getEncoder().encodeToString(#request.content.getBytes())}",
    Value::from("aGVsbG8=")
)]
#[case(
    "{(new java.lang.String(T(java.util.Base64).getDecoder().decode('aGVsbG8=')))}",
    Value::from("hello")
)]
#[case("{T(java.lang.String).format('%s-%s', 'a', 'b')}", Value::from("a-b"))]
#[case("{(1 == 1)}", Value::Boolean(true))]
#[case("endpoint: {#request.headers['X-Gravitee-Endpoint'][0]}", Value::from("endpoint: my_api_host"))]
fn test_builtin_evaluation(#[case] text: &str, #[case] expected: Value) {
    init_logging();
    let whitelist = WhitelistRegistry::builtin();
    assert_eq!(evaluate(text, &whitelist, &request_context()).unwrap(), expected);
}

#[rstest]
#[case("{T(java.lang.System).getenv()}", EL0100)]
#[case("{T(java.lang.Class).forName('java.lang.Math')}", EL0100)]
#[case("{#request.headers.add('X-Injected', 'value')}", EL0100)]
#[case("{(new java.lang.Thread())}", EL0101)]
fn test_whitelist_denials(#[case] text: &str, #[case] code: gateway_el_diagnostics::ErrorCode) {
    let whitelist = WhitelistRegistry::builtin();
    let err: ElError = evaluate(text, &whitelist, &request_context()).unwrap_err().into();
    assert!(err.is_security_violation(), "{text} should be denied, got {err:?}");
    assert_eq!(err.code(), code);
}

#[test]
fn test_append_grant_opens_denied_method() {
    let types = Arc::new(TypeRegistry::with_builtins());
    let whitelist = WhitelistRegistry::new(
        types,
        &WhitelistConfig::append(["method java.lang.System getenv java.lang.String"]),
    );
    let value = evaluate(
        "{T(java.lang.System).getenv('GATEWAY_EL_SURELY_UNSET')}",
        &whitelist,
        &EvaluationContext::new(),
    )
    .unwrap();
    assert_eq!(value, Value::Null);
}

#[test]
fn test_replace_mode_drops_builtin_grants() {
    let types = Arc::new(TypeRegistry::with_builtins());
    let whitelist = WhitelistRegistry::new(
        types,
        &WhitelistConfig::replace(["method java.lang.Math abs int"]),
    );
    let ctx = EvaluationContext::new();
    assert_eq!(
        evaluate("{T(java.lang.Math).abs(-3)}", &whitelist, &ctx).unwrap(),
        Value::Integer(3)
    );
    let err = evaluate("{T(java.lang.Math).max(1, 2)}", &whitelist, &ctx).unwrap_err();
    assert!(err.is_security_violation());
}

#[test]
fn test_null_navigation_code() {
    let whitelist = WhitelistRegistry::builtin();
    let err: ElError = evaluate("{#request.missing.name}", &whitelist, &request_context())
        .unwrap_err()
        .into();
    assert_eq!(err.code(), EL0201);
}

// === Deferred holders ===

/// Holder whose calls complete asynchronously
struct DeferredHolder;

impl HostObject for DeferredHolder {
    fn type_name(&self) -> &str {
        HOLDER_TYPE
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        match (method, args) {
            ("get", [Value::String(a), Value::String(b)]) => {
                let joined = format!("{a}{b}");
                Ok(Value::Deferred(DeferredValue::single(async move { Ok(Value::from(joined)) })))
            }
            ("getIndex", [index]) => Ok(Value::Deferred(DeferredValue::just(index.clone()))),
            (other, args) => Err(HostError::no_such_method(HOLDER_TYPE, other, args.len())),
        }
    }
}

fn holder_whitelist() -> WhitelistRegistry {
    let mut types = TypeRegistry::with_builtins();
    types.register(
        TypeDescriptor::class(HOLDER_TYPE)
            .host_method("get", &["java.lang.String", "java.lang.String"])
            .host_method("getIndex", &["int"]),
    );
    WhitelistRegistry::new(Arc::new(types), &WhitelistConfig::append([format!("class {HOLDER_TYPE}")]))
}

#[tokio::test]
async fn test_placeholders_resolve_before_evaluation() {
    init_logging();
    let whitelist = holder_whitelist();
    let mut ctx = EvaluationContext::new();
    ctx.set_deferred_holder("custom", Arc::new(DeferredHolder));

    let holders: BTreeSet<String> = ctx.holders().clone();
    let compiled = Compiler::new()
        .compile_with_holders("{#custom.get('val1', 'val2')} - {#custom.getIndex(0)}", &holders)
        .unwrap();

    for deferred in compiled.deferred_expressions() {
        let pending = Evaluator::new(&whitelist, &ctx).evaluate(&deferred.body.inner).unwrap();
        let Value::Deferred(pending) = pending else {
            panic!("holder call should yield a deferred value");
        };
        let resolved = pending.resolve_flat().await.unwrap().unwrap_or_default();
        ctx.set_variable(deferred.name.clone(), resolved);
    }

    let value = Evaluator::new(&whitelist, &ctx)
        .evaluate_template(compiled.executable())
        .unwrap();
    assert_eq!(value, Value::from("val1val2 - 0"));
}

#[test]
fn test_unresolved_holder_call_in_concatenation() {
    let whitelist = holder_whitelist();
    let mut ctx = EvaluationContext::new();
    ctx.set_deferred_holder("custom", Arc::new(DeferredHolder));

    // Compiled without holders: the call stays inline and yields a deferred value
    let err = evaluate("value: {#custom.getIndex(1)}", &whitelist, &ctx).unwrap_err();
    assert!(matches!(err, EvalError::UnresolvedDeferred { .. }));
}
