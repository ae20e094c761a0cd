//! Reactive bindings over the query store.
//!
//! A binding is a [`SubscriptionSource`]: something that can produce a stream
//! of values, identified by a [`SubscriptionId`] so two equivalent sources can
//! be recognised as the same subscription. [`Subscription`] wraps a source
//! and lets its output be mapped into a consumer's own message type.
//!
//! - [`UseQuery`] follows a query endpoint for a changing argument value.
//! - [`UseMutation`] invokes a mutation endpoint and follows its latest call.
//!
//! ```rust,ignore
//! enum Message {
//!     Pokemon(QueryResult),
//! }
//!
//! let pokemon = api.endpoint("getPokemon")?.use_query(&json!({ "name": "pikachu" }))?;
//! let mut updates = Subscription::new(pokemon).map(Message::Pokemon).stream();
//!
//! while let Some(Message::Pokemon(result)) = updates.next().await {
//!     if result.is_success {
//!         break;
//!     }
//! }
//! ```

use std::any::TypeId;
use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;

pub mod mutation;
pub mod query;
mod view;

pub use mutation::{MutateOptions, UseMutation};
pub use query::{QueryOptions, UseQuery};

/// Identity of a subscription: the source type plus a hash of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    type_id: TypeId,
    hash: u64,
}

impl SubscriptionId {
    /// Creates an id for a source of type `T` with parameter hash `hash`.
    #[must_use]
    pub fn of<T: 'static>(hash: u64) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            hash,
        }
    }
}

/// A source of values that can be streamed any number of times.
pub trait SubscriptionSource: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Starts a new stream of values.
    fn stream(&self) -> BoxStream<'static, Self::Output>;

    /// Identifies the source.
    fn id(&self) -> SubscriptionId;
}

impl<S: SubscriptionSource> SubscriptionSource for Arc<S> {
    type Output = S::Output;

    fn stream(&self) -> BoxStream<'static, Self::Output> {
        (**self).stream()
    }

    fn id(&self) -> SubscriptionId {
        (**self).id()
    }
}

/// A type-erased source whose output can be mapped.
pub struct Subscription<T> {
    id: SubscriptionId,
    spawn: Arc<dyn Fn() -> BoxStream<'static, T> + Send + Sync>,
}

impl<T: Send + 'static> Subscription<T> {
    pub fn new<S>(source: S) -> Self
    where
        S: SubscriptionSource<Output = T>,
    {
        let id = source.id();
        Self {
            id,
            spawn: Arc::new(move || source.stream()),
        }
    }

    /// Transforms every value the subscription produces.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Subscription<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let spawn = self.spawn;
        let f = Arc::new(f);

        Subscription {
            id: self.id,
            spawn: Arc::new(move || {
                let f = Arc::clone(&f);
                spawn().map(move |value| f(value)).boxed()
            }),
        }
    }

    #[must_use]
    pub const fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Starts a new stream from the underlying source.
    #[must_use]
    pub fn stream(&self) -> BoxStream<'static, T> {
        (self.spawn)()
    }
}

impl<T> Clone for Subscription<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            spawn: Arc::clone(&self.spawn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    struct Numbers(Vec<i32>);

    impl SubscriptionSource for Numbers {
        type Output = i32;

        fn stream(&self) -> BoxStream<'static, i32> {
            stream::iter(self.0.clone()).boxed()
        }

        fn id(&self) -> SubscriptionId {
            SubscriptionId::of::<Self>(self.0.len() as u64)
        }
    }

    struct Other;

    impl SubscriptionSource for Other {
        type Output = i32;

        fn stream(&self) -> BoxStream<'static, i32> {
            stream::empty().boxed()
        }

        fn id(&self) -> SubscriptionId {
            SubscriptionId::of::<Self>(3)
        }
    }

    #[tokio::test]
    async fn test_shared_source() {
        let source = Arc::new(Numbers(vec![1, 2]));
        let sub = Subscription::new(Arc::clone(&source));
        assert_eq!(sub.id(), source.id());
        assert_eq!(sub.stream().collect::<Vec<_>>().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_stream_and_map() {
        let sub = Subscription::new(Numbers(vec![1, 2, 3])).map(|n| n * 10);
        let values: Vec<_> = sub.stream().collect().await;
        assert_eq!(values, vec![10, 20, 30]);

        // Each call starts over.
        let again: Vec<_> = sub.clone().stream().collect().await;
        assert_eq!(again, values);
    }

    #[test]
    fn test_ids() {
        let a = Subscription::new(Numbers(vec![1, 2, 3]));
        let b = Subscription::new(Numbers(vec![4, 5, 6])).map(|n| n.to_string());
        assert_eq!(a.id(), b.id());

        // Same hash, different source type.
        assert_ne!(a.id(), Subscription::new(Other).id());
    }
}
