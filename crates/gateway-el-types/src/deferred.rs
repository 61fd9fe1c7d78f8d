//! Values computed asynchronously, resolved only when an expression needs them

use crate::Value;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use gateway_el_diagnostics::{ElError, EL0301};
use std::fmt;
use std::future::Future;

/// Output of a deferred computation: at most one value, or a failure
pub type DeferredFuture = BoxFuture<'static, Result<Option<Value>, ElError>>;

/// How many values a deferred source may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredKind {
    /// Completes (or fails) without emitting a value
    Completion,
    /// Emits at most one value
    Maybe,
    /// Emits exactly one value
    Single,
}

/// Handle to a one-shot asynchronous value.
///
/// The underlying future runs at most once; clones share its outcome.
#[derive(Clone)]
pub struct DeferredValue {
    kind: DeferredKind,
    inner: Shared<DeferredFuture>,
}

impl DeferredValue {
    pub fn new<F>(kind: DeferredKind, future: F) -> Self
    where
        F: Future<Output = Result<Option<Value>, ElError>> + Send + 'static,
    {
        let boxed: DeferredFuture = future.boxed();
        Self {
            kind,
            inner: boxed.shared(),
        }
    }

    /// Source that only signals completion
    pub fn completion<F>(future: F) -> Self
    where
        F: Future<Output = Result<(), ElError>> + Send + 'static,
    {
        Self::new(DeferredKind::Completion, future.map(|result| result.map(|()| None)))
    }

    /// Source emitting zero or one value
    pub fn maybe<F>(future: F) -> Self
    where
        F: Future<Output = Result<Option<Value>, ElError>> + Send + 'static,
    {
        Self::new(DeferredKind::Maybe, future)
    }

    /// Source emitting exactly one value
    pub fn single<F>(future: F) -> Self
    where
        F: Future<Output = Result<Value, ElError>> + Send + 'static,
    {
        Self::new(DeferredKind::Single, future.map(|result| result.map(Some)))
    }

    /// Already available value
    pub fn just(value: Value) -> Self {
        Self::single(future::ready(Ok(value)))
    }

    /// Maybe source that emits nothing
    pub fn empty() -> Self {
        Self::maybe(future::ready(Ok(None)))
    }

    pub fn failed(error: ElError) -> Self {
        Self::maybe(future::ready(Err(error)))
    }

    pub fn kind(&self) -> DeferredKind {
        self.kind
    }

    /// Wait for the outcome.
    ///
    /// Completion sources always yield `None`; a single source that finishes
    /// empty is an error.
    pub async fn resolve(&self) -> Result<Option<Value>, ElError> {
        let outcome = self.inner.clone().await?;
        match (self.kind, outcome) {
            (DeferredKind::Completion, _) => Ok(None),
            (DeferredKind::Single, None) => Err(ElError::evaluation(
                EL0301,
                "single deferred value completed without emitting",
            )),
            (_, value) => Ok(value),
        }
    }

    /// Resolve, flattening nested deferred values
    pub async fn resolve_flat(&self) -> Result<Option<Value>, ElError> {
        let mut current = self.resolve().await?;
        while let Some(Value::Deferred(next)) = current {
            current = next.resolve().await?;
        }
        Ok(current)
    }
}

impl fmt::Debug for DeferredValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredValue")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
