//! Endpoint declarations.
//!
//! An endpoint is a named request template: a function from arguments to
//! [`RequestOptions`], tagged as a query (cached by arguments) or a mutation
//! (one cache slot per invocation). Definitions are immutable once built into
//! an [`EndpointRegistry`].
//!
//! ```
//! use apistore::base_query::RequestOptions;
//! use apistore::endpoint::EndpointRegistry;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct PokemonArgs {
//!     name: String,
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct NewPost {
//!     title: String,
//! }
//!
//! let registry = EndpointRegistry::builder()
//!     .query("getPokemon", |args: PokemonArgs| {
//!         Ok(RequestOptions::get(format!("https://pokeapi.co/api/v2/pokemon/{}", args.name)))
//!     })
//!     .mutation("addPost", |args: NewPost| {
//!         Ok(RequestOptions::post("https://jsonplaceholder.typicode.com/posts").body(args))
//!     })
//!     .build();
//!
//! assert_eq!(registry.len(), 2);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::base_query::{QueryOutcome, RequestOptions};

/// Error type for user-supplied endpoint functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A handle to the outcome of a request that may still be in flight.
///
/// Cloning is cheap; every clone resolves to the same outcome.
pub type PendingResult = Shared<BoxFuture<'static, QueryOutcome>>;

type RequestMapper = Arc<dyn Fn(&Value) -> Result<RequestOptions, BoxError> + Send + Sync>;

type StartedHook =
    Arc<dyn Fn(Value, PendingResult) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Whether an endpoint reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Query,
    Mutation,
}

impl EndpointKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single endpoint: its kind, request mapper and optional started hook.
#[derive(Clone)]
pub struct EndpointDefinition {
    kind: EndpointKind,
    to_request: RequestMapper,
    on_started: Option<StartedHook>,
}

impl EndpointDefinition {
    /// Declares a query whose arguments deserialize into `A`.
    pub fn query<A, F>(to_request: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) -> Result<RequestOptions, BoxError> + Send + Sync + 'static,
    {
        Self::new(EndpointKind::Query, to_request)
    }

    /// Declares a mutation whose arguments deserialize into `A`.
    pub fn mutation<A, F>(to_request: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) -> Result<RequestOptions, BoxError> + Send + Sync + 'static,
    {
        Self::new(EndpointKind::Mutation, to_request)
    }

    fn new<A, F>(kind: EndpointKind, to_request: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) -> Result<RequestOptions, BoxError> + Send + Sync + 'static,
    {
        Self {
            kind,
            to_request: Arc::new(move |args: &Value| {
                let args = serde_json::from_value(args.clone())?;
                to_request(args)
            }),
            on_started: None,
        }
    }

    /// Attaches a hook that runs once the request has been dispatched.
    ///
    /// The hook receives the original arguments and a handle to the pending
    /// outcome. It runs detached from the store; a failure is logged and does
    /// not affect the cache entry.
    #[must_use]
    pub fn on_started<A, F, Fut>(mut self, hook: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A, PendingResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.on_started = Some(Arc::new(move |args: Value, pending: PendingResult| {
            match serde_json::from_value::<A>(args) {
                Ok(args) => hook(args, pending).boxed(),
                Err(e) => futures::future::ready(Err(BoxError::from(e))).boxed(),
            }
        }));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> EndpointKind {
        self.kind
    }

    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(self.kind, EndpointKind::Mutation)
    }

    /// Maps arguments to request options.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments do not fit the endpoint or the
    /// mapper itself fails.
    pub fn to_request(&self, args: &Value) -> Result<RequestOptions, BoxError> {
        (self.to_request)(args)
    }

    /// Starts the hook for one request, if one is attached.
    pub(crate) fn started(
        &self,
        args: Value,
        pending: PendingResult,
    ) -> Option<BoxFuture<'static, Result<(), BoxError>>> {
        self.on_started.as_ref().map(|hook| hook(args, pending))
    }
}

impl fmt::Debug for EndpointDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDefinition")
            .field("kind", &self.kind)
            .field("on_started", &self.on_started.is_some())
            .finish_non_exhaustive()
    }
}

/// Endpoint definitions by name.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<String, Arc<EndpointDefinition>>,
}

impl EndpointRegistry {
    #[must_use]
    pub fn builder() -> EndpointRegistryBuilder {
        EndpointRegistryBuilder::default()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<EndpointDefinition>> {
        self.endpoints.get(name)
    }

    /// Returns the registered endpoint names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Collects endpoint definitions. A later definition replaces an earlier one
/// with the same name.
#[derive(Debug, Default)]
pub struct EndpointRegistryBuilder {
    endpoints: HashMap<String, Arc<EndpointDefinition>>,
}

impl EndpointRegistryBuilder {
    /// Registers a query endpoint.
    #[must_use]
    pub fn query<A, F>(self, name: impl Into<String>, to_request: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) -> Result<RequestOptions, BoxError> + Send + Sync + 'static,
    {
        self.endpoint(name, EndpointDefinition::query(to_request))
    }

    /// Registers a mutation endpoint.
    #[must_use]
    pub fn mutation<A, F>(self, name: impl Into<String>, to_request: F) -> Self
    where
        A: DeserializeOwned + 'static,
        F: Fn(A) -> Result<RequestOptions, BoxError> + Send + Sync + 'static,
    {
        self.endpoint(name, EndpointDefinition::mutation(to_request))
    }

    /// Registers a prepared definition, e.g. one with a started hook.
    #[must_use]
    pub fn endpoint(mut self, name: impl Into<String>, definition: EndpointDefinition) -> Self {
        self.endpoints.insert(name.into(), Arc::new(definition));
        self
    }

    #[must_use]
    pub fn build(self) -> EndpointRegistry {
        EndpointRegistry {
            endpoints: self.endpoints,
        }
    }
}
