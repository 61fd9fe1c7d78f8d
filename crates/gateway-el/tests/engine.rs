//! End-to-end evaluation through the template engine

use async_trait::async_trait;
use gateway_el::diagnostics::{EL0100, EL0101, EL0201, EL0202, EL0300};
use gateway_el::{
    CacheConfig, DeferredValue, ElError, EngineConfig, EvaluationContext, Headers, HostError,
    HostObject, ProviderRegistry, TemplateEngine, TemplateVariableProvider, TypeDescriptor,
    TypeRegistry, Value, WhitelistConfig,
};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const HOLDER_TYPE: &str = "test.DeferredHolder";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Holder whose calls complete asynchronously, counting invocations
#[derive(Default)]
struct DeferredHolder {
    calls: AtomicUsize,
}

impl HostObject for DeferredHolder {
    fn type_name(&self) -> &str {
        HOLDER_TYPE
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, HostError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (method, args) {
            ("get", [a, b]) => {
                let resolved = format!("resolved({},{})", a.to_display_string(), b.to_display_string());
                Ok(Value::Deferred(DeferredValue::single(async move {
                    tokio::task::yield_now().await;
                    Ok(Value::from(resolved))
                })))
            }
            ("getIndex", [index]) => Ok(Value::Deferred(DeferredValue::just(index.clone()))),
            (other, args) => Err(HostError::no_such_method(HOLDER_TYPE, other, args.len())),
        }
    }
}

fn holder_engine() -> (TemplateEngine, Arc<DeferredHolder>) {
    let mut types = TypeRegistry::with_builtins();
    types.register(
        TypeDescriptor::class(HOLDER_TYPE)
            .host_method("get", &["java.lang.String", "java.lang.String"])
            .host_method("getIndex", &["int"]),
    );
    let config = EngineConfig::default()
        .with_whitelist(WhitelistConfig::append([format!("class {HOLDER_TYPE}")]));
    let mut engine = TemplateEngine::with_types(types, &config).unwrap();

    let holder = Arc::new(DeferredHolder::default());
    engine.set_deferred_function_holder_variable("custom", Arc::clone(&holder) as Arc<dyn HostObject>);
    (engine, holder)
}

fn request_engine() -> TemplateEngine {
    let mut headers = Headers::new();
    headers.add("X-Gravitee-Endpoint", "my_api_host");
    headers.add("Accept", "text/plain");
    headers.add("Accept", "application/json");

    let mut params = IndexMap::new();
    params.insert("foo".to_string(), Value::from(vec![Value::from("bar")]));

    let mut request = IndexMap::new();
    request.insert("headers".to_string(), Value::Headers(headers));
    request.insert("params".to_string(), Value::Map(params));
    request.insert("content".to_string(), Value::from("hello"));

    let mut context = IndexMap::new();
    context.insert("attributes".to_string(), Value::Map(IndexMap::new()));

    let mut engine = TemplateEngine::new();
    engine.set_variable("request", Value::Map(request));
    engine.set_variable("context", Value::Map(context));
    engine
}

// === Scenarios ===

#[tokio::test]
async fn test_single_variable() {
    let mut engine = TemplateEngine::new();
    engine.set_variable("x", "hello");
    let value: Option<String> = engine.evaluate("{#x}").await.unwrap();
    assert_eq!(value.as_deref(), Some("hello"));
}

#[tokio::test]
async fn test_literal_text_around_fragment() {
    let mut engine = TemplateEngine::new();
    engine.set_variable("h", "mid");
    let value: Option<String> = engine.evaluate("pre-{#h}-post").await.unwrap();
    assert_eq!(value.as_deref(), Some("pre-mid-post"));
}

#[tokio::test]
async fn test_holder_call_resolved_without_caller_invoking_it() {
    init_logging();
    let (mut engine, holder) = holder_engine();
    let value: Option<String> = engine.evaluate("{#custom.get('v1','v2')}").await.unwrap();
    assert_eq!(value.as_deref(), Some("resolved(v1,v2)"));
    assert_eq!(holder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_two_holder_calls_compose_with_literal() {
    init_logging();
    let (mut engine, holder) = holder_engine();
    let value: Option<String> = engine
        .evaluate("{#custom.get('a','b')} and {#custom.get('c','d')}")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("resolved(a,b) and resolved(c,d)"));
    assert_eq!(holder.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_constructor_outside_whitelist() {
    let mut engine = TemplateEngine::new();
    let text = "{(new java.lang.Thread())}";
    let err = engine.evaluate::<Value>(text).await.unwrap_err();

    assert!(err.is_security_violation());
    assert_eq!(err.code(), EL0101);
    match err {
        ElError::Security { expression, .. } => assert_eq!(expression.as_deref(), Some(text)),
        other => panic!("expected a security violation, got {other:?}"),
    }
    // Compilation succeeded, so the template stays cached
    assert!(engine.cache().peek(text).is_some());
}

#[test]
fn test_cache_overflow_evicts() {
    let config = EngineConfig::default().with_cache(CacheConfig {
        max_size: 2,
        ..CacheConfig::default()
    });
    let engine = TemplateEngine::with_config(&config).unwrap();
    for text in ["{#a}", "{#b}", "{#c}"] {
        engine.compile(text).unwrap();
    }
    assert_eq!(engine.cache().len(), 2);
    assert!(engine.cache().stats().evictions >= 1);
}

// === Gateway templates ===

#[rstest]
#[case("{#request.headers['X-Gravitee-Endpoint'][0]}", "my_api_host")]
#[case("{#request.headers['Accept']}", "text/plain,application/json")]
#[case("{#request.headers.getFirst('accept')}", "text/plain")]
#[case("{#request.params['foo'][0]}", "bar")]
#[case(
    "{T(java.util.Base64).getEncoder().encodeToString(#request.content.getBytes())}",
    "aGVsbG8="
)]
#[case("{T(java.lang.String).format('%s:%s', 'user', 'pass')}", "user:pass")]
#[case("http://{#request.headers['X-Gravitee-Endpoint'][0]}/echo", "http://my_api_host/echo")]
#[case("{ \"status\": \"OK\" }", "{ \"status\": \"OK\" }")]
#[tokio::test]
async fn test_request_templates(#[case] text: &str, #[case] expected: &str) {
    let mut engine = request_engine();
    let value: Option<String> = engine.evaluate(text).await.unwrap();
    assert_eq!(value.as_deref(), Some(expected));
}

#[tokio::test]
async fn test_missing_attribute_is_none() {
    let mut engine = request_engine();
    let value: Option<String> = engine.evaluate("{#context.attributes.application}").await.unwrap();
    assert_eq!(value, None);
}

#[tokio::test]
async fn test_null_navigation_attaches_expression() {
    let mut engine = request_engine();
    let text = "{#context.attributes.application.name}";
    let err = engine.evaluate::<String>(text).await.unwrap_err();
    assert_eq!(err.code(), EL0201);
    match err {
        ElError::Evaluation { expression, .. } => assert_eq!(expression.as_deref(), Some(text)),
        other => panic!("expected an evaluation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_typed_results() {
    let mut engine = TemplateEngine::new();
    assert_eq!(engine.evaluate::<bool>("true").await.unwrap(), Some(true));
    assert_eq!(engine.evaluate::<bool>("{(1 == 1)}").await.unwrap(), Some(true));
    assert_eq!(engine.evaluate::<i64>("{(40 + 2)}").await.unwrap(), Some(42));
    assert_eq!(engine.evaluate::<f64>("{(1.5 * 2)}").await.unwrap(), Some(3.0));
    assert_eq!(
        engine.evaluate::<Vec<Value>>("{({1, 'two'})}").await.unwrap(),
        Some(vec![Value::Integer(1), Value::from("two")])
    );
    assert!(engine.evaluate::<i32>("not a number").await.is_err());
}

#[tokio::test]
async fn test_result_renders_as_json() {
    let mut engine = TemplateEngine::new();
    let value: Option<Value> = engine.evaluate("{({'a': 1, 'b': {true, null}})}").await.unwrap();
    let json = serde_json::to_string(&value.unwrap()).unwrap();
    assert_eq!(json, r#"{"a":1,"b":[true,null]}"#);
}

#[tokio::test]
async fn test_registered_function() {
    let mut engine = TemplateEngine::new();
    engine.register_function("upper", |args: &[Value]| match args {
        [Value::String(s)] => Ok(Value::from(s.to_uppercase())),
        _ => Err(HostError::invalid_argument("upper expects one string")),
    });
    let value: Option<String> = engine.evaluate("{#upper('gravitee')}").await.unwrap();
    assert_eq!(value.as_deref(), Some("GRAVITEE"));
}

#[tokio::test]
async fn test_deferred_function_result_is_resolved() {
    let mut engine = TemplateEngine::new();
    engine.register_function("lookup", |args: &[Value]| {
        let key = args.first().map(Value::to_display_string).unwrap_or_default();
        Ok(Value::Deferred(DeferredValue::just(Value::from(format!("value-of-{key}")))))
    });
    let value: Option<String> = engine.evaluate("{#lookup('k')}").await.unwrap();
    assert_eq!(value.as_deref(), Some("value-of-k"));
}

// === Deferred sources ===

#[tokio::test]
async fn test_source_resolves_once_for_several_paths() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut engine = TemplateEngine::new();
    engine.set_deferred_single("p", async move {
        counter.fetch_add(1, Ordering::SeqCst);
        let mut a = IndexMap::new();
        a.insert("b".to_string(), Value::from(1));
        a.insert("c".to_string(), Value::from(2));
        let mut p = IndexMap::new();
        p.insert("a".to_string(), Value::Map(a));
        Ok(Value::Map(p))
    });

    let value: Option<String> = engine.evaluate("{#p.a.b}-{#p.a.c}").await.unwrap();
    assert_eq!(value.as_deref(), Some("1-2"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreferenced_source_never_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut engine = TemplateEngine::new();
    engine.set_variable("x", "plain");
    engine.set_deferred_single("expensive", async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Value::from("computed"))
    });

    let value: Option<String> = engine.evaluate("{#x}").await.unwrap();
    assert_eq!(value.as_deref(), Some("plain"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(engine.lookup_variable("expensive").is_none());
}

#[tokio::test]
async fn test_source_failure_aborts() {
    let mut engine = TemplateEngine::new();
    engine.set_deferred_single("broken", async {
        Err(ElError::evaluation(gateway_el::diagnostics::EL0200, "upstream down"))
    });

    let err = engine.evaluate::<String>("{#broken}").await.unwrap_err();
    assert!(err.is_deferred_resolution());
    assert_eq!(err.code(), EL0300);
}

#[tokio::test]
async fn test_empty_sources_leave_variable_unset() {
    let mut engine = TemplateEngine::new();
    engine.set_deferred_maybe("nothing", async { Ok(None) });
    engine.set_deferred_completion("done", async { Ok(()) });

    assert_eq!(engine.evaluate::<String>("{#nothing}").await.unwrap(), None);
    assert_eq!(engine.evaluate::<String>("[{#done}]").await.unwrap().as_deref(), Some("[]"));
    assert!(engine.lookup_variable("nothing").is_none());
}

#[tokio::test]
async fn test_sources_resolve_concurrently() {
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let mut engine = TemplateEngine::new();
    // `first` only completes once `second` has run
    engine.set_deferred_single("first", async move {
        rx.await
            .map_err(|_| ElError::evaluation(gateway_el::diagnostics::EL0200, "sender dropped"))?;
        Ok(Value::from("one"))
    });
    engine.set_deferred_single("second", async move {
        let _ = tx.send(());
        Ok(Value::from("two"))
    });

    let value: Option<String> = engine.evaluate("{#first} {#second}").await.unwrap();
    assert_eq!(value.as_deref(), Some("one two"));
}

// === Deferred holders ===

#[tokio::test]
async fn test_nested_holder_calls() {
    let (mut engine, _) = holder_engine();
    let value: Option<String> = engine
        .evaluate("{#custom.get(#custom.get('a', 'b'), 'c')}")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("resolved(resolved(a,b),c)"));
}

#[tokio::test]
async fn test_nested_holder_calls_with_suffix() {
    let (mut engine, _) = holder_engine();
    let value: Option<String> = engine
        .evaluate("{#custom.get(#custom.get('a', 'b'), 'c').concat('!')}")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("resolved(resolved(a,b),c)!"));
}

#[tokio::test]
async fn test_holder_index_result() {
    let (mut engine, _) = holder_engine();
    assert_eq!(engine.evaluate::<i32>("{#custom.getIndex(0)}").await.unwrap(), Some(0));

    let value: Option<String> = engine
        .evaluate("{#custom.get('val1', 'val2')} - {#custom.getIndex(0)}")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("resolved(val1,val2) - 0"));
}

#[tokio::test]
async fn test_identical_holder_calls_run_once() {
    let (mut engine, holder) = holder_engine();
    let value: Option<String> = engine
        .evaluate("{#custom.get('a', 'b')}/{#custom.get('a', 'b')}")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("resolved(a,b)/resolved(a,b)"));
    assert_eq!(holder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_placeholder_bindings_do_not_outlive_evaluation() {
    let (mut engine, _) = holder_engine();
    engine.set_variable("api", "echo");

    let value: Option<String> = engine
        .evaluate("{#api}:{#custom.get('a', 'b')}")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("echo:resolved(a,b)"));

    let names: Vec<&str> = engine.context().variables().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["api"]);
    let derived = TemplateEngine::from_engine(&engine);
    assert_eq!(derived.context().variables().count(), 1);
}

#[tokio::test]
async fn test_placeholder_bindings_removed_after_failure() {
    let (mut engine, _) = holder_engine();
    let err = engine
        .evaluate::<String>("{#custom.getIndex(0) / 0}")
        .await
        .unwrap_err();
    assert_eq!(err.code(), EL0202);
    assert_eq!(engine.context().variables().count(), 0);
}

// === Whitelist ===

#[rstest]
#[case("{T(java.lang.System).getenv()}", EL0100)]
#[case("{T(java.lang.Class).forName('java.lang.Runtime')}", EL0100)]
#[case("{#request.headers.add('X-Injected', 'value')}", EL0100)]
#[case("{#request.params.put('foo', 'baz')}", EL0100)]
#[tokio::test]
async fn test_denied_members(#[case] text: &str, #[case] code: gateway_el::ErrorCode) {
    let mut engine = request_engine();
    let err = engine.evaluate::<Value>(text).await.unwrap_err();
    assert!(err.is_security_violation(), "{text} should be denied, got {err:?}");
    assert_eq!(err.code(), code);
}

#[tokio::test]
async fn test_append_grant_allows_without_reset() {
    let mut engine = TemplateEngine::with_config(&EngineConfig::default()).unwrap();
    let text = "{T(java.lang.System).getenv('GATEWAY_EL_SURELY_UNSET')}";
    assert!(engine.evaluate::<String>(text).await.unwrap_err().is_security_violation());

    engine
        .whitelist()
        .reinit(&WhitelistConfig::append(["method java.lang.System getenv java.lang.String"]));
    assert_eq!(engine.evaluate::<String>(text).await.unwrap(), None);
    assert_eq!(engine.cache().stats().misses, 1);
}

#[tokio::test]
async fn test_appended_exception_constructor() {
    let config = EngineConfig::default().with_whitelist(WhitelistConfig::append([
        "new java.lang.Exception java.lang.String",
        "method java.lang.Throwable getMessage",
    ]));
    let mut engine = TemplateEngine::with_config(&config).unwrap();
    let value: Option<String> = engine
        .evaluate("{(new java.lang.Exception('Gravitee')).getMessage()}")
        .await
        .unwrap();
    assert_eq!(value.as_deref(), Some("Gravitee"));
}

#[tokio::test]
async fn test_replace_mode_drops_builtin_entries() {
    let config = EngineConfig::default()
        .with_whitelist(WhitelistConfig::replace(["method java.lang.Math abs int"]));
    let mut engine = TemplateEngine::with_config(&config).unwrap();
    engine.set_variable("name", "gravitee");

    assert_eq!(engine.evaluate::<i32>("{T(java.lang.Math).abs(-3)}").await.unwrap(), Some(3));
    let err = engine.evaluate::<i32>("{#name.length()}").await.unwrap_err();
    assert!(err.is_security_violation());
}

// === Blocking ===

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_evaluate_blocking_on_multi_thread_runtime() {
    let mut engine = TemplateEngine::new();
    engine.set_deferred_single("user", async {
        tokio::task::yield_now().await;
        Ok(Value::from("alice"))
    });
    let user: Option<String> = engine.evaluate_blocking("user={#user}").unwrap();
    assert_eq!(user.as_deref(), Some("user=alice"));
}

#[tokio::test(flavor = "current_thread")]
async fn test_evaluate_blocking_refused_on_current_thread() {
    let mut engine = TemplateEngine::new();
    engine.set_deferred_single("user", async { Ok(Value::from("alice")) });
    let err = engine.evaluate_blocking::<String>("{#user}").unwrap_err();
    assert!(matches!(err, ElError::Misuse { .. }));
}

// === Engines and providers ===

struct ApiProvider {
    scopes: Vec<String>,
}

#[async_trait]
impl TemplateVariableProvider for ApiProvider {
    fn scopes(&self) -> &[String] {
        &self.scopes
    }

    async fn provide(&self, context: &mut EvaluationContext) {
        let mut api = IndexMap::new();
        api.insert("name".to_string(), Value::from("echo"));
        context.set_variable("api", Value::Map(api));
    }
}

#[tokio::test]
async fn test_provider_bindings_reach_templates() {
    let registry = ProviderRegistry::new();
    registry.register(Arc::new(ApiProvider {
        scopes: vec!["api".to_string()],
    }));

    let base = TemplateEngine::new();
    let mut engine = TemplateEngine::from_engine(&base);
    registry.provide("api", engine.context_mut()).await;

    let value: Option<String> = engine.evaluate("API {#api.name}").await.unwrap();
    assert_eq!(value.as_deref(), Some("API echo"));
    assert!(base.lookup_variable("api").is_none());
}

#[tokio::test]
async fn test_derived_engine_shares_cache() {
    let base = TemplateEngine::with_config(&EngineConfig::default()).unwrap();
    let mut first = TemplateEngine::from_engine(&base);
    let mut second = TemplateEngine::from_engine(&base);
    first.set_variable("v", 1);
    second.set_variable("v", 2);

    assert_eq!(first.evaluate::<i32>("{#v}").await.unwrap(), Some(1));
    assert_eq!(second.evaluate::<i32>("{#v}").await.unwrap(), Some(2));
    assert_eq!(base.cache().stats().hits, 1);
    assert_eq!(base.cache().stats().misses, 1);
}
