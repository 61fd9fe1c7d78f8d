//! Template engine: compile or fetch, resolve deferred values, evaluate, coerce

use crate::config::EngineConfig;
use futures::future::join_all;
use gateway_el_compiler::{CompiledExpression, Compiler, DeferredExpression};
use gateway_el_diagnostics::{ElError, Result, EL0200, EL0301};
use gateway_el_eval::{EvalResult, EvaluationContext, Evaluator, ExpressionCache, WhitelistRegistry};
use gateway_el_model::TypeRegistry;
use gateway_el_types::{DeferredValue, FromValue, HostError, HostObject, Value};
use log::{debug, trace};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};

/// State shared by every engine derived from the same configuration
#[derive(Debug, Clone)]
struct Shared {
    cache: Arc<ExpressionCache>,
    whitelist: Arc<WhitelistRegistry>,
    compiler: Arc<Compiler>,
}

impl Shared {
    fn new(types: TypeRegistry, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            cache: Arc::new(ExpressionCache::new(config.cache)),
            whitelist: Arc::new(WhitelistRegistry::new(Arc::new(types), &config.whitelist)),
            compiler: Arc::new(Compiler::with_syntax(config.syntax.clone())),
        })
    }

    fn builtin() -> Self {
        Self {
            cache: Arc::new(ExpressionCache::default()),
            whitelist: Arc::new(WhitelistRegistry::builtin()),
            compiler: Arc::new(Compiler::new()),
        }
    }
}

/// Evaluates templates against one request's bindings.
///
/// Create one engine per configuration and derive a per-request engine with
/// [`from_engine`](TemplateEngine::from_engine): derived engines share the
/// compiled expression cache and the whitelist, and own their bindings.
///
/// ```
/// use gateway_el::TemplateEngine;
///
/// let mut engine = TemplateEngine::new();
/// engine.set_variable("name", "gravitee");
/// let greeting: Option<String> = engine.evaluate_now("Hello {#name}").unwrap();
/// assert_eq!(greeting.as_deref(), Some("Hello gravitee"));
/// ```
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    shared: Shared,
    context: EvaluationContext,
}

impl TemplateEngine {
    /// Engine with a fresh default cache and the built-in whitelist.
    ///
    /// Nothing is shared with other `new()` engines; use
    /// [`from_engine`](TemplateEngine::from_engine) to share.
    pub fn new() -> Self {
        Self {
            shared: Shared::builtin(),
            context: EvaluationContext::new(),
        }
    }

    /// Engine with its own cache and whitelist over the built-in type catalog
    pub fn with_config(config: &EngineConfig) -> Result<Self> {
        Self::with_types(TypeRegistry::with_builtins(), config)
    }

    /// Engine over a catalog extended with host types
    pub fn with_types(types: TypeRegistry, config: &EngineConfig) -> Result<Self> {
        Ok(Self {
            shared: Shared::new(types, config)?,
            context: EvaluationContext::new(),
        })
    }

    /// Engine with a copy of `other`'s bindings, sharing its cache and whitelist
    pub fn from_engine(other: &TemplateEngine) -> Self {
        other.clone()
    }

    // === Bindings ===

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EvaluationContext {
        &mut self.context
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.context.set_variable(name, value);
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&Value> {
        self.context.lookup_variable(name)
    }

    pub fn set_deferred_variable(&mut self, name: impl Into<String>, deferred: DeferredValue) {
        self.context.set_deferred_variable(name, deferred);
    }

    pub fn set_deferred_completion<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.context.set_deferred_completion(name, future);
    }

    pub fn set_deferred_maybe<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = Result<Option<Value>>> + Send + 'static,
    {
        self.context.set_deferred_maybe(name, future);
    }

    pub fn set_deferred_single<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = Result<Value>> + Send + 'static,
    {
        self.context.set_deferred_single(name, future);
    }

    /// Bind an object whose method calls return deferred values
    pub fn set_deferred_function_holder_variable(
        &mut self,
        name: impl Into<String>,
        holder: Arc<dyn HostObject>,
    ) {
        self.context.set_deferred_holder(name, holder);
    }

    /// Bind `#name(args)` to a host function
    pub fn register_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> std::result::Result<Value, HostError> + Send + Sync + 'static,
    {
        self.context.register_function(name, function);
    }

    // === Shared state ===

    pub fn cache(&self) -> &ExpressionCache {
        &self.shared.cache
    }

    pub fn whitelist(&self) -> &WhitelistRegistry {
        &self.shared.whitelist
    }

    /// Compiled form of `text` for the holders currently bound, through the cache
    pub fn compile(&self, text: &str) -> Result<Arc<CompiledExpression>> {
        self.shared
            .cache
            .get_or_compile(text, &self.shared.compiler, self.context.holders())
    }

    // === Evaluation ===

    /// Evaluate `text`, resolving the deferred values it needs first.
    ///
    /// Yields `None` when the result is null or a deferred result emits nothing.
    pub async fn evaluate<T: FromValue>(&mut self, text: &str) -> Result<Option<T>> {
        let value = self
            .evaluate_value(text)
            .await
            .map_err(|err| err.with_expression(text))?;
        coerce(value, text)
    }

    async fn evaluate_value(&mut self, text: &str) -> Result<Option<Value>> {
        let compiled = self.compile(text)?;
        self.resolve_sources(&compiled).await?;

        // Placeholder bindings live for this evaluation only
        let mut bound = Vec::new();
        let outcome = self.evaluate_compiled(&compiled, &mut bound).await;
        for name in bound {
            self.context.remove_variable(&name);
        }
        outcome
    }

    async fn evaluate_compiled(
        &mut self,
        compiled: &CompiledExpression,
        bound: &mut Vec<String>,
    ) -> Result<Option<Value>> {
        self.resolve_placeholders(compiled, bound).await?;

        let value = self.evaluator().evaluate_template(compiled.executable())?;
        match value {
            Value::Deferred(deferred) => deferred.resolve_flat().await,
            value => Ok(Some(value)),
        }
    }

    /// Evaluate without the cache and without resolving anything deferred
    pub fn evaluate_now<T: FromValue>(&self, text: &str) -> Result<Option<T>> {
        let value = self
            .shared
            .compiler
            .compile(text)
            .and_then(|compiled| {
                self.evaluator()
                    .evaluate_template(compiled.executable())
                    .map_err(ElError::from)
            })
            .and_then(|value| match value {
                Value::Deferred(_) => Err(ElError::evaluation(
                    EL0301,
                    "result is deferred; use evaluate to resolve it",
                )),
                value => Ok(Some(value)),
            })
            .map_err(|err| err.with_expression(text))?;
        coerce(value, text)
    }

    /// Evaluate on the calling thread, blocking until deferred values resolve.
    ///
    /// Refused on a current-thread runtime, whose only worker would stall.
    /// On a multi-thread runtime the worker is handed off while blocked;
    /// outside any runtime a private one is started for the call.
    pub fn evaluate_blocking<T: FromValue>(&mut self, text: &str) -> Result<Option<T>> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::CurrentThread => Err(ElError::misuse(format!(
                    "evaluate_blocking called on a current-thread runtime while evaluating '{}'",
                    text
                ))),
                _ => tokio::task::block_in_place(|| handle.block_on(self.evaluate(text))),
            },
            Err(_) => {
                let runtime = Builder::new_current_thread().enable_all().build().map_err(|err| {
                    ElError::evaluation(EL0200, format!("cannot start a runtime: {}", err))
                })?;
                runtime.block_on(self.evaluate(text))
            }
        }
    }

    fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.shared.whitelist, &self.context)
    }

    /// Resolve every deferred source the template reads, concurrently
    async fn resolve_sources(&mut self, compiled: &CompiledExpression) -> Result<()> {
        let required: Vec<(String, DeferredValue)> = self
            .context
            .deferred_variables()
            .filter(|(name, _)| compiled.requires(name))
            .map(|(name, deferred)| (name.to_string(), deferred.clone()))
            .collect();
        if required.is_empty() {
            return Ok(());
        }

        debug!(
            "resolving deferred sources: {}",
            required
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let outcomes = join_all(required.into_iter().map(|(name, deferred)| async move {
            let outcome = deferred.resolve_flat().await;
            (name, outcome)
        }))
        .await;

        for (name, outcome) in outcomes {
            match outcome {
                Ok(Some(value)) => self.context.set_variable(name, value),
                Ok(None) => trace!("deferred source '{}' emitted nothing", name),
                Err(err) => return Err(ElError::deferred(name, err.to_string())),
            }
        }
        Ok(())
    }

    /// Evaluate extracted holder calls and bind their results to the
    /// placeholder variables, in waves ordered by dependency.
    ///
    /// Every name bound is pushed to `bound`, including on failure.
    async fn resolve_placeholders(
        &mut self,
        compiled: &CompiledExpression,
        bound: &mut Vec<String>,
    ) -> Result<()> {
        let mut pending: Vec<&DeferredExpression> = compiled.deferred_expressions().collect();
        let mut resolved = BTreeSet::new();

        while !pending.is_empty() {
            let (ready, blocked): (Vec<&DeferredExpression>, Vec<&DeferredExpression>) = pending
                .into_iter()
                .partition(|deferred| deferred.depends_on.is_subset(&resolved));
            if ready.is_empty() {
                return Err(ElError::evaluation(
                    EL0301,
                    "deferred placeholders depend on each other",
                ));
            }

            let started = {
                let evaluator = self.evaluator();
                ready
                    .iter()
                    .map(|deferred| {
                        trace!("evaluating placeholder #{} = {}", deferred.name, deferred.source());
                        evaluator
                            .evaluate(&deferred.body.inner)
                            .map(|value| (deferred.name.clone(), value))
                    })
                    .collect::<EvalResult<Vec<(String, Value)>>>()?
            };

            let outcomes = join_all(started.into_iter().map(|(name, value)| async move {
                let outcome = match value {
                    Value::Deferred(deferred) => deferred.resolve_flat().await,
                    value => Ok(Some(value)),
                };
                (name, outcome)
            }))
            .await;

            for (name, outcome) in outcomes {
                let value = outcome.map_err(|err| ElError::deferred(name.clone(), err.to_string()))?;
                resolved.insert(name.clone());
                bound.push(name.clone());
                self.context.set_variable(name, value.unwrap_or_default());
            }
            pending = blocked;
        }
        Ok(())
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn coerce<T: FromValue>(value: Option<Value>, text: &str) -> Result<Option<T>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .coerce::<T>()
            .map(Some)
            .map_err(|err| ElError::from(err).with_expression(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_el_diagnostics::EL0400;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_evaluate_now_literal_template() {
        let engine = TemplateEngine::new();
        let text: Option<String> = engine.evaluate_now("no fragments { here }").unwrap();
        assert_eq!(text.as_deref(), Some("no fragments { here }"));
    }

    #[test]
    fn test_evaluate_now_rejects_deferred_result() {
        let mut engine = TemplateEngine::new();
        engine.set_variable("later", DeferredValue::just(Value::from(1)));
        let err = engine.evaluate_now::<Value>("{#later}").unwrap_err();
        assert_eq!(err.code(), EL0301);
    }

    #[tokio::test]
    async fn test_evaluate_blocking_refused_on_current_thread() {
        let mut engine = TemplateEngine::new();
        let err = engine.evaluate_blocking::<String>("{#anything}").unwrap_err();
        assert!(err.is_misuse());
        assert_eq!(err.code(), EL0400);
    }

    #[test]
    fn test_evaluate_blocking_outside_runtime() {
        let mut engine = TemplateEngine::new();
        engine.set_deferred_single("user", async { Ok(Value::from("alice")) });
        let user: Option<String> = engine.evaluate_blocking("{#user}").unwrap();
        assert_eq!(user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_from_engine_copies_bindings() {
        let mut base = TemplateEngine::new();
        base.set_variable("shared", "yes");

        let mut derived = TemplateEngine::from_engine(&base);
        derived.set_variable("own", 1);

        assert_eq!(derived.lookup_variable("shared"), Some(&Value::from("yes")));
        assert!(base.lookup_variable("own").is_none());
        assert!(std::ptr::eq(base.cache(), derived.cache()));
    }

    #[test]
    fn test_new_engines_do_not_share_whitelist() {
        let granted = TemplateEngine::new();
        let other = TemplateEngine::new();
        let text = "{T(java.lang.System).getenv('GATEWAY_EL_SURELY_UNSET')}";

        granted.whitelist().reinit(&gateway_el_eval::WhitelistConfig::append([
            "method java.lang.System getenv java.lang.String",
        ]));

        assert_eq!(granted.evaluate_now::<String>(text).unwrap(), None);
        assert!(other.evaluate_now::<String>(text).unwrap_err().is_security_violation());
        assert!(!std::ptr::eq(granted.cache(), other.cache()));
    }

    #[test]
    fn test_invalid_syntax_config() {
        let mut config = EngineConfig::default();
        config.syntax.prefix.clear();
        assert!(TemplateEngine::with_config(&config).is_err());
    }
}
