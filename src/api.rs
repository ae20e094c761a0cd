//! The API facade: one store, its endpoints, and checked bindings.
//!
//! ```no_run
//! use apistore::prelude::*;
//! use serde_json::{Value, json};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ApiStoreError> {
//! let registry = EndpointRegistry::builder()
//!     .query("getPokemon", |args: Value| {
//!         let name = args["name"].as_str().unwrap_or_default();
//!         Ok(RequestOptions::get(format!("https://pokeapi.co/api/v2/pokemon/{name}")))
//!     })
//!     .build();
//!
//! let api = Api::define(ApiConfig::new("pokemon"), ReqwestBaseQuery::default(), registry);
//! let pikachu = api.endpoint("getPokemon")?.use_query(&json!({ "name": "pikachu" }))?;
//! # let _ = pikachu;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::base_query::BaseQuery;
use crate::config::ApiConfig;
use crate::endpoint::{EndpointKind, EndpointRegistry};
use crate::error::ApiStoreError;
use crate::store::QueryStore;
use crate::subscription::{QueryOptions, UseMutation, UseQuery};

/// A defined API. Cloning shares the same store.
#[derive(Debug, Clone)]
pub struct Api {
    store: Arc<QueryStore>,
}

impl Api {
    /// Creates the store for `registry`, sending requests through `base_query`.
    pub fn define(
        config: ApiConfig,
        base_query: impl BaseQuery,
        registry: EndpointRegistry,
    ) -> Self {
        Self {
            store: Arc::new(QueryStore::new(&config, base_query, registry)),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<QueryStore> {
        &self.store
    }

    /// Looks up a registered endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiStoreError::UnknownEndpoint`] if `name` is not registered.
    pub fn endpoint(&self, name: &str) -> Result<EndpointHandle, ApiStoreError> {
        let definition = self
            .store
            .registry()
            .get(name)
            .ok_or_else(|| ApiStoreError::UnknownEndpoint(name.to_string()))?;

        Ok(EndpointHandle {
            store: Arc::clone(&self.store),
            name: name.to_string(),
            kind: definition.kind(),
        })
    }
}

/// A registered endpoint, ready to be bound.
#[derive(Debug, Clone)]
pub struct EndpointHandle {
    store: Arc<QueryStore>,
    name: String,
    kind: EndpointKind,
}

impl EndpointHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Binds a query endpoint to `args` and starts fetching.
    ///
    /// # Errors
    ///
    /// Returns [`ApiStoreError::KindMismatch`] for a mutation endpoint.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn use_query<A>(&self, args: &A) -> Result<UseQuery, ApiStoreError>
    where
        A: Serialize + ?Sized,
    {
        self.use_query_with(args, QueryOptions::default())
    }

    /// Binds a query endpoint with `options` applied to every fetch.
    ///
    /// With [`QueryOptions::forced`] the binding skips the cache: its first
    /// fetch and every argument change go to the network.
    ///
    /// # Errors
    ///
    /// Returns [`ApiStoreError::KindMismatch`] for a mutation endpoint.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn use_query_with<A>(
        &self,
        args: &A,
        options: QueryOptions,
    ) -> Result<UseQuery, ApiStoreError>
    where
        A: Serialize + ?Sized,
    {
        self.expect_kind(EndpointKind::Query)?;
        Ok(UseQuery::with_options(
            Arc::clone(&self.store),
            self.name.clone(),
            args,
            options,
        ))
    }

    /// Binds a mutation endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ApiStoreError::KindMismatch`] for a query endpoint.
    pub fn use_mutation(&self) -> Result<UseMutation, ApiStoreError> {
        self.expect_kind(EndpointKind::Mutation)?;
        Ok(UseMutation::new(Arc::clone(&self.store), self.name.clone()))
    }

    fn expect_kind(&self, expected: EndpointKind) -> Result<(), ApiStoreError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(ApiStoreError::KindMismatch {
                endpoint: self.name.clone(),
                expected: expected.as_str(),
                actual: self.kind.as_str(),
            })
        }
    }
}
