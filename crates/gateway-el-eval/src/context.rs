//! Evaluation context: variables, deferred sources, deferred holders and functions

use gateway_el_types::{DeferredValue, HostError, HostObject, Value};
use gateway_el_diagnostics::ElError;
use indexmap::IndexMap;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Host function bound as `#name(args)`
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, HostError> + Send + Sync>;

/// Per-request bindings an expression evaluates against.
///
/// Owned by a single request. Cloning copies the bindings; deferred values
/// keep sharing their underlying computation.
#[derive(Clone, Default)]
pub struct EvaluationContext {
    variables: HashMap<String, Value>,
    deferred: IndexMap<String, DeferredValue>,
    holders: BTreeSet<String>,
    functions: HashMap<String, Function>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    // === Variables ===

    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn remove_variable(&mut self, name: &str) -> Option<Value> {
        self.variables.remove(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.variables.iter().map(|(name, value)| (name.as_str(), value))
    }

    // === Deferred sources ===

    /// Register a source resolved only when an expression reads `name`
    pub fn set_deferred_variable(&mut self, name: impl Into<String>, deferred: DeferredValue) {
        self.deferred.insert(name.into(), deferred);
    }

    /// Source that only signals completion, e.g. after filling another variable in
    pub fn set_deferred_completion<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = Result<(), ElError>> + Send + 'static,
    {
        self.set_deferred_variable(name, DeferredValue::completion(future));
    }

    pub fn set_deferred_maybe<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = Result<Option<Value>, ElError>> + Send + 'static,
    {
        self.set_deferred_variable(name, DeferredValue::maybe(future));
    }

    pub fn set_deferred_single<F>(&mut self, name: impl Into<String>, future: F)
    where
        F: Future<Output = Result<Value, ElError>> + Send + 'static,
    {
        self.set_deferred_variable(name, DeferredValue::single(future));
    }

    pub fn deferred_variable(&self, name: &str) -> Option<&DeferredValue> {
        self.deferred.get(name)
    }

    /// Registered deferred sources in registration order
    pub fn deferred_variables(&self) -> impl Iterator<Item = (&str, &DeferredValue)> {
        self.deferred.iter().map(|(name, value)| (name.as_str(), value))
    }

    // === Deferred holders ===

    /// Bind an object whose methods return deferred values.
    ///
    /// The holder is readable as `#name`; calls on it are lifted out of the
    /// template and resolved before evaluation.
    pub fn set_deferred_holder(&mut self, name: impl Into<String>, holder: Arc<dyn HostObject>) {
        let name = name.into();
        self.variables.insert(name.clone(), Value::Object(holder));
        self.holders.insert(name);
    }

    pub fn holders(&self) -> &BTreeSet<String> {
        &self.holders
    }

    // === Functions ===

    /// Bind `#name(args)`. Functions are explicit host bindings and bypass the
    /// method whitelist.
    pub fn register_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, HostError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut functions: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        functions.sort_unstable();
        f.debug_struct("EvaluationContext")
            .field("variables", &self.variables)
            .field("deferred", &self.deferred.keys().collect::<Vec<_>>())
            .field("holders", &self.holders)
            .field("functions", &functions)
            .finish()
    }
}
