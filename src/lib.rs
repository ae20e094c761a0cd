//! # apistore - a keyed request cache for async Rust
//!
//! apistore sits between application code and an HTTP API. Endpoints are
//! declared once as request templates; calling an endpoint goes through a
//! process-wide store that caches one result per endpoint and argument value,
//! deduplicates concurrent identical reads, and tells subscribers when a
//! result changes.
//!
//! ## Architecture
//!
//! 1. **Endpoints**: named request templates, each a query or a mutation
//! 2. **Base query**: the injected transport that performs a request
//! 3. **Store**: one [`QueryResult`](store::QueryResult) per cache key
//! 4. **Bindings**: reactive views that initiate requests and stream results
//!
//! ## Core Components
//!
//! - [`Api`](api::Api): owns the store and hands out endpoint bindings
//! - [`EndpointRegistry`](endpoint::EndpointRegistry): the declared endpoints
//! - [`BaseQuery`](base_query::BaseQuery): the transport seam, with a
//!   [`reqwest` adapter](base_query::ReqwestBaseQuery) and a
//!   [scripted mock](base_query::MockBaseQuery)
//! - [`QueryStore`](store::QueryStore): cached state and deduplication
//! - [`UseQuery`](subscription::UseQuery) and
//!   [`UseMutation`](subscription::UseMutation): the bindings
//!
//! ## Example
//!
//! ```rust,no_run
//! use apistore::prelude::*;
//! use futures::StreamExt;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct PokemonArgs {
//!     name: String,
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ApiStoreError> {
//! let registry = EndpointRegistry::builder()
//!     .query("getPokemon", |args: PokemonArgs| {
//!         Ok(RequestOptions::get(format!("https://pokeapi.co/api/v2/pokemon/{}", args.name)))
//!     })
//!     .build();
//!
//! let api = Api::define(ApiConfig::new("pokemon"), ReqwestBaseQuery::default(), registry);
//! let pikachu = api
//!     .endpoint("getPokemon")?
//!     .use_query(&PokemonArgs { name: "pikachu".into() })?;
//!
//! let mut results = pikachu.stream();
//! while let Some(result) = results.next().await {
//!     if !result.is_loading && result.is_initialized {
//!         println!("{:?}", result.data);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod base_query;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod key;
pub mod prelude;
pub mod store;
pub mod subscription;
