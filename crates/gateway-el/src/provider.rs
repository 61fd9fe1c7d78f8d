//! Variable providers
//!
//! A provider contributes bindings (request attributes, API properties,
//! dictionaries, ...) to an evaluation context before a template runs. Each
//! provider declares the scopes it serves; callers ask the registry for the
//! providers of one scope.

use async_trait::async_trait;
use dashmap::DashMap;
use gateway_el_eval::EvaluationContext;
use log::debug;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Source of template variables for one or more scopes
#[async_trait]
pub trait TemplateVariableProvider: Send + Sync {
    /// Scopes this provider contributes to, e.g. `"api"` or `"health-check"`
    fn scopes(&self) -> &[String];

    /// Add this provider's bindings to `context`
    async fn provide(&self, context: &mut EvaluationContext);
}

type Providers = Arc<[Arc<dyn TemplateVariableProvider>]>;

/// Registered providers with a per-scope lookup memo.
///
/// The memo is filled under the provider list's read lock and cleared under
/// its write lock, so a lookup never memoizes a list older than the last
/// registration.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn TemplateVariableProvider>>>,
    by_scope: DashMap<String, Providers>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, provider: Arc<dyn TemplateVariableProvider>) {
        debug!("registering template variable provider for scopes {:?}", provider.scopes());
        let mut providers = self.providers.write();
        providers.push(provider);
        self.by_scope.clear();
    }

    /// Providers serving `scope`, in registration order
    pub fn providers_for(&self, scope: &str) -> Providers {
        if let Some(providers) = self.by_scope.get(scope) {
            return Arc::clone(providers.value());
        }

        let registered = self.providers.read();
        let providers: Providers = registered
            .iter()
            .filter(|provider| provider.scopes().iter().any(|s| s == scope))
            .cloned()
            .collect();
        self.by_scope
            .insert(scope.to_string(), Arc::clone(&providers));
        providers
    }

    /// Run every provider of `scope` against `context`, one after another
    pub async fn provide(&self, scope: &str, context: &mut EvaluationContext) {
        for provider in self.providers_for(scope).iter() {
            provider.provide(context).await;
        }
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.len())
            .field("memoized_scopes", &self.by_scope.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_el_types::Value;
    use pretty_assertions::assert_eq;

    struct Fixed {
        scopes: Vec<String>,
        name: &'static str,
        value: &'static str,
    }

    impl Fixed {
        fn new(scopes: &[&str], name: &'static str, value: &'static str) -> Arc<Self> {
            Arc::new(Self {
                scopes: scopes.iter().map(|s| (*s).to_string()).collect(),
                name,
                value,
            })
        }
    }

    #[async_trait]
    impl TemplateVariableProvider for Fixed {
        fn scopes(&self) -> &[String] {
            &self.scopes
        }

        async fn provide(&self, context: &mut EvaluationContext) {
            context.set_variable(self.name, self.value);
        }
    }

    #[test]
    fn test_providers_filtered_by_scope() {
        let registry = ProviderRegistry::new();
        registry.register(Fixed::new(&["api"], "api", "1"));
        registry.register(Fixed::new(&["api", "health-check"], "both", "2"));

        assert_eq!(registry.providers_for("api").len(), 2);
        assert_eq!(registry.providers_for("health-check").len(), 1);
        assert!(registry.providers_for("unknown").is_empty());
    }

    #[test]
    fn test_lookup_is_memoized_until_next_registration() {
        let registry = ProviderRegistry::new();
        registry.register(Fixed::new(&["api"], "a", "1"));

        let first = registry.providers_for("api");
        let second = registry.providers_for("api");
        assert!(Arc::ptr_eq(&first, &second));

        registry.register(Fixed::new(&["api"], "b", "2"));
        assert_eq!(registry.providers_for("api").len(), 2);
    }

    #[test]
    fn test_concurrent_registration_is_never_lost() {
        let registry = Arc::new(ProviderRegistry::new());
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        registry.providers_for("api");
                    }
                })
            })
            .collect();

        for _ in 0..50 {
            registry.register(Fixed::new(&["api"], "p", "1"));
        }
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(registry.providers_for("api").len(), 50);
    }

    #[tokio::test]
    async fn test_provide_fills_context() {
        let registry = ProviderRegistry::new();
        registry.register(Fixed::new(&["api"], "first", "1"));
        registry.register(Fixed::new(&["other"], "skipped", "2"));

        let mut context = EvaluationContext::new();
        registry.provide("api", &mut context).await;

        assert_eq!(context.lookup_variable("first"), Some(&Value::from("1")));
        assert!(context.lookup_variable("skipped").is_none());
    }
}
