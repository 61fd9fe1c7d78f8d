//! Runtime value model for gateway expressions
//!
//! [`Value`] is what expressions evaluate to. Besides scalars and collections it
//! carries multi-valued [`Headers`], host objects exposed through the
//! [`HostObject`] trait and [`DeferredValue`]s that resolve asynchronously.

mod coercion;
mod deferred;
mod headers;
mod host;
mod value;

pub use coercion::{CoercionError, FromValue};
pub use deferred::{DeferredFuture, DeferredKind, DeferredValue};
pub use headers::Headers;
pub use host::{HostError, HostObject};
pub use value::{type_names, Value};
