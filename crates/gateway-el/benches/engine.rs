//! Template engine benchmarks using divan
//!
//! Compilation from scratch against cached lookups and synchronous evaluation.

use gateway_el::{compile, CacheConfig, EngineConfig, Headers, TemplateEngine, Value};
use indexmap::IndexMap;

fn main() {
    divan::main();
}

const TEMPLATES: &[&str] = &[
    "{#request.headers['X-Gravitee-Endpoint'][0]}",
    "http://{#request.headers['X-Gravitee-Endpoint'][0]}/api/{#request.params['id'][0]}",
    "{(#request.params['limit'][0] matches '\\d+') ? #request.params['limit'][0] : '10'}",
    "{T(java.util.Base64).getEncoder().encodeToString(#request.content.getBytes())}",
];

fn request_engine() -> TemplateEngine {
    let mut headers = Headers::new();
    headers.add("X-Gravitee-Endpoint", "my_api_host");

    let mut params = IndexMap::new();
    params.insert("id".to_string(), Value::from(vec![Value::from("42")]));
    params.insert("limit".to_string(), Value::from(vec![Value::from("25")]));

    let mut request = IndexMap::new();
    request.insert("headers".to_string(), Value::Headers(headers));
    request.insert("params".to_string(), Value::Map(params));
    request.insert("content".to_string(), Value::from("hello"));

    let mut engine = TemplateEngine::with_config(&EngineConfig::default()).unwrap();
    engine.set_variable("request", Value::Map(request));
    engine
}

// === Compilation ===

mod compilation {
    use super::*;

    #[divan::bench(args = TEMPLATES)]
    fn uncached(bencher: divan::Bencher, text: &str) {
        bencher.bench_local(|| compile(divan::black_box(text)));
    }

    #[divan::bench(args = TEMPLATES)]
    fn cache_hit(bencher: divan::Bencher, text: &str) {
        let engine = request_engine();
        engine.compile(text).unwrap();
        bencher.bench_local(|| engine.compile(divan::black_box(text)));
    }

    #[divan::bench]
    fn cache_churn(bencher: divan::Bencher) {
        let config = EngineConfig::default().with_cache(CacheConfig {
            max_size: 16,
            ..CacheConfig::default()
        });
        let engine = TemplateEngine::with_config(&config).unwrap();
        let texts: Vec<String> = (0..64).map(|i| format!("{{#v{i}}}")).collect();
        let mut next = 0;
        bencher.bench_local(|| {
            next = (next + 1) % texts.len();
            engine.compile(divan::black_box(&texts[next]))
        });
    }
}

// === Evaluation ===

mod evaluation {
    use super::*;

    #[divan::bench(args = TEMPLATES)]
    fn evaluate_now(bencher: divan::Bencher, text: &str) {
        let engine = request_engine();
        bencher.bench_local(|| engine.evaluate_now::<String>(divan::black_box(text)));
    }

    #[divan::bench]
    fn evaluate_cached(bencher: divan::Bencher) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let mut engine = request_engine();
        bencher.bench_local(|| {
            runtime.block_on(engine.evaluate::<String>(divan::black_box(TEMPLATES[1])))
        });
    }
}
