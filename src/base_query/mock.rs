//! Scripted base query for testing.
//!
//! [`MockBaseQuery`] answers requests from replies registered per URL and
//! records every request it receives, so tests can assert on dedup and on the
//! exact options an endpoint produced without any network.
//!
//! ```
//! use apistore::base_query::MockBaseQuery;
//! use serde_json::json;
//!
//! let mock = MockBaseQuery::new();
//! mock.respond("https://pokeapi.co/api/v2/pokemon/pikachu", json!({ "id": 25 }));
//! assert_eq!(mock.call_count(), 0);
//! ```
//!
//! Replies queued with [`MockBaseQuery::respond_once`] are consumed first, in
//! order; the reply set with [`MockBaseQuery::respond`] answers afterwards.
//! A delay can be attached to a queued reply to hold a request in flight.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use super::{BaseQuery, QueryOutcome, RequestOptions};
use crate::error::ApiError;

/// Error code returned for URLs without a registered reply.
pub const NO_REPLY_CODE: &str = "no_mock_reply";

#[derive(Debug, Clone)]
struct Reply {
    outcome: QueryOutcome,
    delay: Duration,
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<String, VecDeque<Reply>>,
    fallback: HashMap<String, Reply>,
    calls: Vec<RequestOptions>,
}

/// A base query that answers from a script.
///
/// Clones share the same script and call log.
#[derive(Debug, Clone, Default)]
pub struct MockBaseQuery {
    script: Arc<Mutex<Script>>,
}

impl MockBaseQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answers every request to `url` with `data`.
    pub fn respond(&self, url: impl Into<String>, data: Value) {
        self.respond_with(url, QueryOutcome::Data(data));
    }

    /// Answers every request to `url` with `error`.
    pub fn fail(&self, url: impl Into<String>, error: ApiError) {
        self.respond_with(url, QueryOutcome::Error(error));
    }

    /// Answers every request to `url` with `outcome`.
    pub fn respond_with(&self, url: impl Into<String>, outcome: QueryOutcome) {
        self.script().fallback.insert(
            url.into(),
            Reply {
                outcome,
                delay: Duration::ZERO,
            },
        );
    }

    /// Answers the next request to `url` with `outcome` after `delay`.
    pub fn respond_once(&self, url: impl Into<String>, outcome: QueryOutcome, delay: Duration) {
        self.script()
            .queued
            .entry(url.into())
            .or_default()
            .push_back(Reply { outcome, delay });
    }

    /// Returns every request received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<RequestOptions> {
        self.script().calls.clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.script().calls.len()
    }

    /// Returns how many requests targeted `url`.
    #[must_use]
    pub fn calls_to(&self, url: &str) -> usize {
        self.script().calls.iter().filter(|call| call.url == url).count()
    }

    fn next_reply(&self, options: RequestOptions) -> Reply {
        let mut script = self.script();
        let url = options.url.clone();
        script.calls.push(options);

        if let Some(reply) = script.queued.get_mut(&url).and_then(VecDeque::pop_front) {
            return reply;
        }

        script.fallback.get(&url).cloned().unwrap_or_else(|| Reply {
            outcome: QueryOutcome::Error(ApiError::new(
                format!("No mock reply for {url}"),
                NO_REPLY_CODE,
            )),
            delay: Duration::ZERO,
        })
    }
}

impl BaseQuery for MockBaseQuery {
    fn query(&self, options: RequestOptions) -> BoxFuture<'static, QueryOutcome> {
        let reply = self.next_reply(options);

        async move {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.outcome
        }
        .boxed()
    }
}
