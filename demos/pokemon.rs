//! Looks up a few pokemon and creates a post, printing every state change.
//!
//! ```sh
//! RUST_LOG=apistore=debug cargo run --example pokemon
//! ```

use std::sync::Arc;

use apistore::prelude::*;
use color_eyre::eyre::Result;
use futures::StreamExt;
use futures::stream::select;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const POKE_API: &str = "https://pokeapi.co/api/v2";
const POSTS_API: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Serialize, Deserialize)]
struct PokemonArgs {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct PostArgs {
    id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct NewPost {
    title: String,
}

#[derive(Debug, Deserialize)]
struct Pokemon {
    name: String,
    height: u32,
    weight: u32,
}

#[derive(Debug, Deserialize)]
struct PokemonPage {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: u64,
    title: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: u64,
}

#[derive(Debug)]
enum Message {
    Pokemon(QueryResult),
    Post(QueryResult),
}

fn endpoints() -> EndpointRegistry {
    EndpointRegistry::builder()
        .query("getPokemon", |args: PokemonArgs| {
            Ok(RequestOptions::get(format!("{POKE_API}/pokemon/{}", args.name)))
        })
        .query("getAllPokemon", |(): ()| Ok(RequestOptions::get(format!("{POKE_API}/pokemon"))))
        .query("getPosts", |(): ()| Ok(RequestOptions::get(format!("{POSTS_API}/posts"))))
        .query("getPost", |args: PostArgs| {
            Ok(RequestOptions::get(format!("{POSTS_API}/posts/{}", args.id)))
        })
        .endpoint(
            "addPost",
            EndpointDefinition::mutation(|args: NewPost| {
                Ok(RequestOptions::post(format!("{POSTS_API}/posts")).body(args))
            })
            .on_started(|args: NewPost, pending: PendingResult| async move {
                if let Some(data) = pending.await.data() {
                    tracing::info!(title = %args.title, response = %data, "post created");
                }
                Ok::<(), BoxError>(())
            }),
        )
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ApiConfig::new("pokeApi");
    let base_query = ReqwestBaseQuery::from_config(&config)?;
    let api = Api::define(config, base_query, endpoints());

    let pokemon = Arc::new(api.endpoint("getPokemon")?.use_query(&PokemonArgs {
        name: "pikachu".into(),
    })?);
    let add_post = Arc::new(api.endpoint("addPost")?.use_mutation()?);

    let mut messages = select(
        Subscription::new(Arc::clone(&pokemon)).map(Message::Pokemon).stream(),
        Subscription::new(Arc::clone(&add_post)).map(Message::Post).stream(),
    );

    let created = add_post
        .invoke(&NewPost { title: "hello".into() }, MutateOptions::default())
        .await?;
    if let Some(post) = created.data_as::<Created>()? {
        println!("created post #{}", post.id);
    }

    let mut names = ["ditto", "bulbasaur"].into_iter();
    while let Some(message) = messages.next().await {
        match message {
            Message::Pokemon(result) if result.is_loading => {
                println!("loading {}", pokemon.args());
            }
            Message::Pokemon(result) if !result.is_initialized => {}
            Message::Pokemon(result) => {
                match result.data_as::<Pokemon>()? {
                    Some(p) => println!("{}: height {}, weight {}", p.name, p.height, p.weight),
                    None => println!("failed: {:?}", result.error),
                }
                let Some(next) = names.next() else { break };
                pokemon.set_args(&PokemonArgs { name: next.into() });
            }
            Message::Post(result) => println!("post: {:?}", result.status()),
        }
    }

    // Cached: no request is sent.
    let pikachu = PokemonArgs {
        name: "pikachu".into(),
    };
    let again = api
        .store()
        .initiate("getPokemon", &pikachu, InitiateOptions::default(), None)
        .await?;
    println!("pikachu again deduplicated: {}", again.is_none());

    let store = api.store();
    if let Some(page) = store
        .initiate("getAllPokemon", &(), InitiateOptions::default().throwable(), None)
        .await?
    {
        if let Some(page) = page.data_as::<PokemonPage>()? {
            println!("{} pokemon in total", page.count);
        }
    }
    if let Some(posts) = store
        .initiate("getPosts", &(), InitiateOptions::default().throwable(), None)
        .await?
    {
        let posts = posts.data_as::<Vec<Post>>()?.unwrap_or_default();
        println!("{} posts", posts.len());
    }

    // Forced: always asks the server, even for a cached post.
    let post = api
        .endpoint("getPost")?
        .use_query_with(&PostArgs { id: 1 }, QueryOptions::forced())?;
    let mut updates = post.stream();
    while let Some(result) = updates.next().await {
        if !result.is_initialized {
            continue;
        }
        match result.data_as::<Post>()? {
            Some(p) => println!("post #{}: {}", p.id, p.title),
            None => println!("failed: {:?}", result.error),
        }
        break;
    }

    Ok(())
}
