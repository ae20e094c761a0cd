//! Mutation binding: invoke a write and follow its latest call.
//!
//! Every [`UseMutation::invoke`] generates a new request identifier, so each
//! call gets its own cache slot and is never deduplicated against an earlier
//! one. The binding's result view always shows the slot of the most recent
//! call; before the first call it reports [`QueryResult::UNINITIALIZED`].

use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use futures::stream::BoxStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use super::view::result_stream;
use super::{SubscriptionId, SubscriptionSource};
use crate::error::{ApiStoreError, QueryError};
use crate::key::{CacheKey, cache_key, new_request_id};
use crate::store::{InitiateOptions, QueryResult, QueryStore};

/// Options for a single [`UseMutation::invoke`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutateOptions {
    /// Return a failed request as an error instead of only recording it.
    pub throwable: bool,
}

impl MutateOptions {
    #[must_use]
    pub const fn throwable() -> Self {
        Self { throwable: true }
    }
}

/// A reactive handle to one mutation endpoint.
pub struct UseMutation {
    store: Arc<QueryStore>,
    endpoint: String,
    request_id: watch::Sender<Option<String>>,
}

impl UseMutation {
    /// Binds `endpoint`. Nothing is sent until [`invoke`](Self::invoke).
    ///
    /// The endpoint is expected to be a registered mutation; see
    /// [`EndpointHandle::use_mutation`](crate::api::EndpointHandle::use_mutation)
    /// for the checked constructor.
    pub fn new(store: Arc<QueryStore>, endpoint: impl Into<String>) -> Self {
        let (request_id, _) = watch::channel(None);
        Self {
            store,
            endpoint: endpoint.into(),
            request_id,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Identifier of the most recent call, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<String> {
        self.request_id.borrow().clone()
    }

    /// Sends the mutation with `args` under a fresh request identifier.
    ///
    /// The result view switches to the new call immediately.
    ///
    /// # Errors
    ///
    /// Returns [`ApiStoreError::UnknownEndpoint`] if the endpoint is not
    /// registered, or [`ApiStoreError::Query`] for a failed request when
    /// `options.throwable` is set.
    pub async fn invoke<A>(
        &self,
        args: &A,
        options: MutateOptions,
    ) -> Result<QueryResult, ApiStoreError>
    where
        A: Serialize + ?Sized,
    {
        let request_id = new_request_id();
        self.request_id.send_replace(Some(request_id.clone()));

        let initiate = InitiateOptions {
            force_refetch: false,
            throwable: options.throwable,
        };
        let result = self
            .store
            .initiate(&self.endpoint, args, initiate, Some(&request_id))
            .await?;

        // A fresh identifier is never deduplicated, but fall back to the slot.
        Ok(result.unwrap_or_else(|| {
            self.store
                .result_for_key(&cache_key(&self.endpoint, &request_id))
        }))
    }

    fn key(&self) -> Option<CacheKey> {
        self.request_id
            .borrow()
            .as_deref()
            .map(|id| cache_key(&self.endpoint, id))
    }

    /// Returns the result of the most recent call.
    #[must_use]
    pub fn result(&self) -> QueryResult {
        self.key().map_or(QueryResult::UNINITIALIZED, |key| {
            self.store.result_for_key(&key)
        })
    }

    #[must_use]
    pub fn data(&self) -> Option<Value> {
        self.result().data
    }

    /// Returns the data deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not have the shape of `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.result().data_as()
    }

    #[must_use]
    pub fn error(&self) -> Option<QueryError> {
        self.result().error
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.result().is_loading
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.result().is_success
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.result().is_error
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.result().is_initialized
    }
}

impl SubscriptionSource for UseMutation {
    type Output = QueryResult;

    fn stream(&self) -> BoxStream<'static, QueryResult> {
        let endpoint = self.endpoint.clone();
        result_stream(
            Arc::clone(&self.store),
            self.request_id.subscribe(),
            move |id: &Option<String>| id.as_deref().map(|id| cache_key(&endpoint, id)),
        )
    }

    fn id(&self) -> SubscriptionId {
        let mut hasher = DefaultHasher::new();
        self.endpoint.hash(&mut hasher);
        SubscriptionId::of::<Self>(hasher.finish())
    }
}

impl std::fmt::Debug for UseMutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UseMutation")
            .field("endpoint", &self.endpoint)
            .field("request_id", &*self.request_id.borrow())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_query::{MockBaseQuery, RequestOptions};
    use crate::config::ApiConfig;
    use crate::endpoint::EndpointRegistry;
    use serde_json::json;

    fn store(mock: &MockBaseQuery) -> Arc<QueryStore> {
        let registry = EndpointRegistry::builder()
            .mutation("addPost", |args: Value| Ok(RequestOptions::post("/posts").body(args)))
            .build();
        Arc::new(QueryStore::new(&ApiConfig::default(), mock.clone(), registry))
    }

    #[test]
    fn test_mutate_options() {
        assert!(!MutateOptions::default().throwable);
        assert!(MutateOptions::throwable().throwable);
    }

    #[tokio::test]
    async fn test_result_before_first_call() {
        let mutation = UseMutation::new(store(&MockBaseQuery::new()), "addPost");
        assert!(mutation.request_id().is_none());
        assert_eq!(mutation.result(), QueryResult::UNINITIALIZED);
    }

    #[tokio::test]
    async fn test_invoke_switches_view() {
        let mock = MockBaseQuery::new();
        mock.respond("/posts", json!({ "id": 101 }));
        let mutation = UseMutation::new(store(&mock), "addPost");

        let result = mutation
            .invoke(&json!({ "title": "hello" }), MutateOptions::default())
            .await
            .expect("registered endpoint");

        assert!(result.is_success);
        assert!(mutation.request_id().is_some());
        assert_eq!(mutation.data(), Some(json!({ "id": 101 })));
        assert_eq!(mock.calls()[0].body, Some(json!({ "title": "hello" })));
    }

    #[tokio::test]
    async fn test_id_ignores_request_id() {
        let store = store(&MockBaseQuery::new());
        let a = UseMutation::new(Arc::clone(&store), "addPost");
        let b = UseMutation::new(store, "addPost");
        assert_eq!(a.id(), b.id());
    }
}
