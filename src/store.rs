//! The query store: keyed request state with deduplication.
//!
//! The store owns one [`QueryResult`] per [`CacheKey`] and is the only thing
//! that writes them. [`QueryStore::initiate`] decides whether a request is
//! needed, runs it through the [`BaseQuery`], and writes the outcome back.
//! Every write is announced on a broadcast channel so bindings can re-read the
//! slots they display.
//!
//! # Deduplication
//!
//! A slot that is loading, or holds a successful result, is not fetched again
//! unless the caller forces it. The check and the transition to loading
//! happen under the slot's map lock, so two concurrent initiates for the same
//! key dispatch a single request.
//!
//! # Ordering
//!
//! Each request is tagged with the slot's generation when it starts. When two
//! forced requests for one key overlap, only the completion of the newest one
//! is written; an older response arriving late is dropped.
//!
//! # Growth
//!
//! Slots are created on first use and never evicted. Every mutation call
//! creates a new slot, so a long-running process that mutates often grows
//! without bound.

use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::base_query::BaseQuery;
use crate::config::ApiConfig;
use crate::endpoint::{EndpointDefinition, EndpointRegistry, PendingResult};
use crate::error::{ApiStoreError, QueryError};
use crate::key::{CacheKey, cache_key, new_request_id};
use entry::CacheEntry;

mod entry;
mod result;

pub use result::{QueryResult, QueryStatus};

/// Options for a single [`QueryStore::initiate`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitiateOptions {
    /// Fetch even if the slot is loading or already holds a result.
    pub force_refetch: bool,
    /// Return the request's error instead of only recording it.
    pub throwable: bool,
}

impl InitiateOptions {
    #[must_use]
    pub const fn forced() -> Self {
        Self {
            force_refetch: true,
            throwable: false,
        }
    }

    #[must_use]
    pub const fn throwable(mut self) -> Self {
        self.throwable = true;
        self
    }
}

/// Process-wide request state, keyed by endpoint and arguments.
pub struct QueryStore {
    name: String,
    registry: EndpointRegistry,
    base_query: Arc<dyn BaseQuery>,
    entries: DashMap<CacheKey, CacheEntry>,
    changes: broadcast::Sender<CacheKey>,
}

impl QueryStore {
    /// Creates an empty store.
    pub fn new(config: &ApiConfig, base_query: impl BaseQuery, registry: EndpointRegistry) -> Self {
        let (changes, _) = broadcast::channel(config.notify_capacity.max(1));
        Self {
            name: config.name.clone(),
            registry,
            base_query: Arc::new(base_query),
            entries: DashMap::new(),
            changes,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Number of slots created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribes to change notifications.
    ///
    /// The receiver gets the key of every slot after it is written.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheKey> {
        self.changes.subscribe()
    }

    /// Streams the key of every slot written from now on.
    ///
    /// A consumer that falls behind skips the notifications it missed.
    #[must_use]
    pub fn changes(&self) -> BoxStream<'static, CacheKey> {
        BroadcastStream::new(self.changes.subscribe())
            .filter_map(|key| futures::future::ready(key.ok()))
            .boxed()
    }

    /// Returns the key a call to `endpoint` with `args` would use.
    ///
    /// For a mutation `args` is the request identifier.
    pub fn key_for<A>(&self, endpoint: &str, args: &A) -> CacheKey
    where
        A: Serialize + ?Sized,
    {
        cache_key(endpoint, args)
    }

    /// Looks up the result for `endpoint` called with `args`.
    ///
    /// Never creates a slot. Unknown keys report [`QueryResult::UNINITIALIZED`].
    pub fn result<A>(&self, endpoint: &str, args: &A) -> QueryResult
    where
        A: Serialize + ?Sized,
    {
        self.result_for_key(&cache_key(endpoint, args))
    }

    #[must_use]
    pub fn result_for_key(&self, key: &CacheKey) -> QueryResult {
        self.entries
            .get(key)
            .map_or(QueryResult::UNINITIALIZED, |entry| entry.result.clone())
    }

    /// Fetches `endpoint` with `args` unless the cached slot can be served.
    ///
    /// Queries are keyed by `args`. Mutations are keyed by `request_id`, and a
    /// fresh identifier is generated when none is given, so two mutation calls
    /// never share a slot.
    ///
    /// Returns `Ok(None)` when the call was deduplicated, otherwise the result
    /// this request produced. A result that lost the race to a newer request
    /// is returned but not written.
    ///
    /// # Errors
    ///
    /// Returns [`ApiStoreError::UnknownEndpoint`] if `endpoint` is not
    /// registered. With [`InitiateOptions::throwable`], a failed request is
    /// returned as [`ApiStoreError::Query`] after its state is written.
    pub async fn initiate<A>(
        &self,
        endpoint: &str,
        args: &A,
        options: InitiateOptions,
        request_id: Option<&str>,
    ) -> Result<Option<QueryResult>, ApiStoreError>
    where
        A: Serialize + ?Sized,
    {
        let definition = self
            .registry
            .get(endpoint)
            .cloned()
            .ok_or_else(|| ApiStoreError::UnknownEndpoint(endpoint.to_string()))?;

        let args = serde_json::to_value(args).unwrap_or(Value::Null);
        let key = if definition.is_mutation() {
            match request_id {
                Some(id) => cache_key(endpoint, id),
                None => cache_key(endpoint, &new_request_id()),
            }
        } else {
            cache_key(endpoint, &args)
        };

        let Some(generation) = self.begin(&key, options.force_refetch) else {
            debug!(store = %self.name, %key, "serving cached result");
            return Ok(None);
        };
        self.notify(&key);

        let result = self.run(endpoint, &definition, args).await;
        self.settle(&key, generation, result.clone());

        match result.error.clone() {
            Some(source) if options.throwable => Err(ApiStoreError::Query { key, source }),
            _ => Ok(Some(result)),
        }
    }

    /// Moves the slot to loading if it needs a fetch.
    fn begin(&self, key: &CacheKey, force_refetch: bool) -> Option<u64> {
        let mut entry = self.entries.entry(key.clone()).or_default();
        entry.should_fetch(force_refetch).then(|| entry.begin())
    }

    async fn run(
        &self,
        endpoint: &str,
        definition: &EndpointDefinition,
        args: Value,
    ) -> QueryResult {
        let request = match definition.to_request(&args) {
            Ok(request) => request,
            Err(e) => {
                debug!(store = %self.name, endpoint, error = %e, "request options failed");
                return QueryResult::failed(QueryError::Request(e.to_string()));
            }
        };

        debug!(
            store = %self.name,
            endpoint,
            method = %request.method,
            url = %request.url,
            "dispatching request"
        );

        let pending: PendingResult = self.base_query.query(request).shared();

        if let Some(hook) = definition.started(args, pending.clone()) {
            let endpoint = endpoint.to_string();
            tokio::spawn(async move {
                if let Err(e) = hook.await {
                    warn!(%endpoint, error = %e, "on_started hook failed");
                }
            });
        }

        QueryResult::settled(pending.await)
    }

    fn settle(&self, key: &CacheKey, generation: u64, result: QueryResult) {
        let applied = self
            .entries
            .get_mut(key)
            .is_some_and(|mut entry| entry.settle(generation, result));

        if applied {
            debug!(store = %self.name, %key, generation, "result stored");
            self.notify(key);
        } else {
            debug!(store = %self.name, %key, generation, "dropping stale result");
        }
    }

    fn notify(&self, key: &CacheKey) {
        // No subscribers is fine.
        let _ = self.changes.send(key.clone());
    }
}

impl std::fmt::Debug for QueryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryStore")
            .field("name", &self.name)
            .field("registry", &self.registry)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_query::{MockBaseQuery, RequestOptions};
    use serde_json::json;

    fn store(mock: &MockBaseQuery) -> QueryStore {
        let registry = EndpointRegistry::builder()
            .query("getPost", |args: Value| {
                Ok(RequestOptions::get(format!("/posts/{}", args["id"])))
            })
            .mutation("addPost", |args: Value| Ok(RequestOptions::post("/posts").body(args)))
            .build();
        QueryStore::new(&ApiConfig::new("test"), mock.clone(), registry)
    }

    #[test]
    fn test_initiate_options() {
        assert_eq!(
            InitiateOptions::default(),
            InitiateOptions {
                force_refetch: false,
                throwable: false
            }
        );
        let options = InitiateOptions::forced().throwable();
        assert!(options.force_refetch);
        assert!(options.throwable);
    }

    #[test]
    fn test_result_does_not_create_slots() {
        let store = store(&MockBaseQuery::new());
        assert_eq!(store.result("getPost", &json!({ "id": 1 })), QueryResult::UNINITIALIZED);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let store = store(&MockBaseQuery::new());
        let err = store
            .initiate("nope", &(), InitiateOptions::default(), None)
            .await
            .expect_err("unregistered endpoint");
        assert_eq!(err, ApiStoreError::UnknownEndpoint("nope".to_string()));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_mutation_without_request_id_gets_fresh_slot() {
        let mock = MockBaseQuery::new();
        mock.respond("/posts", json!({ "id": 101 }));
        let store = store(&mock);

        let args = json!({ "title": "a" });
        store.initiate("addPost", &args, InitiateOptions::default(), None).await.ok();
        store.initiate("addPost", &args, InitiateOptions::default(), None).await.ok();

        assert_eq!(mock.calls_to("/posts"), 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_notifies_loading_and_settled() {
        let mock = MockBaseQuery::new();
        mock.respond("/posts/1", json!({ "id": 1 }));
        let store = store(&mock);
        let mut rx = store.subscribe();

        store
            .initiate("getPost", &json!({ "id": 1 }), InitiateOptions::default(), None)
            .await
            .expect("no error");

        let key = store.key_for("getPost", &json!({ "id": 1 }));
        assert_eq!(rx.recv().await.expect("loading notification"), key);
        assert_eq!(rx.recv().await.expect("settled notification"), key);
    }

    #[tokio::test]
    async fn test_changes_stream() {
        let mock = MockBaseQuery::new();
        mock.respond("/posts/2", json!({ "id": 2 }));
        let store = store(&mock);
        let changes = store.changes();

        store
            .initiate("getPost", &json!({ "id": 2 }), InitiateOptions::default(), None)
            .await
            .expect("no error");
        drop(store);

        let keys: Vec<_> = changes.collect().await;
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|key| key.endpoint() == "getPost"));
    }
}
