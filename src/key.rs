//! Cache key derivation.
//!
//! A key is the endpoint name followed by the JSON text of its arguments in
//! parentheses, e.g. `getPokemon({"name":"pikachu"})`. Object fields keep the
//! order in which they were enumerated, so callers must build arguments in a
//! stable shape for two calls to share a slot.

use std::borrow::Borrow;
use std::fmt;

use serde::Serialize;

/// A string that uniquely identifies one cached result slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the endpoint part of the key.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.0.split_once('(').map_or(self.0.as_str(), |(name, _)| name)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

/// Builds the cache key for `endpoint` called with `args`.
///
/// Arguments that cannot be serialized are keyed as `null`.
pub fn cache_key<A>(endpoint: &str, args: &A) -> CacheKey
where
    A: Serialize + ?Sized,
{
    let json = serde_json::to_string(args).unwrap_or_else(|_| "null".to_string());
    CacheKey(format!("{endpoint}({json})"))
}

/// Generates a fresh identifier for one mutation invocation.
#[must_use]
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_format() {
        let key = cache_key("getPokemon", &json!({ "name": "pikachu" }));
        assert_eq!(key.as_str(), r#"getPokemon({"name":"pikachu"})"#);
        assert_eq!(key.endpoint(), "getPokemon");
    }

    #[test]
    fn test_equal_arguments_share_key() {
        let a = json!({ "id": 1, "page": { "size": 10 } });
        let b = json!({ "id": 1, "page": { "size": 10 } });
        assert_eq!(cache_key("getPost", &a), cache_key("getPost", &b));
    }

    #[test]
    fn test_key_order_is_not_normalized() {
        let a = json!({ "a": 1, "b": 2 });
        let b = json!({ "b": 2, "a": 1 });
        assert_ne!(cache_key("e", &a), cache_key("e", &b));
    }

    #[test]
    fn test_different_endpoints_differ() {
        let args = json!({ "id": 1 });
        assert_ne!(cache_key("getPost", &args), cache_key("getPosts", &args));
    }

    #[test]
    fn test_unit_arguments() {
        assert_eq!(cache_key("getPosts", &()).as_str(), "getPosts(null)");
        assert_eq!(cache_key("getPosts", "abc").as_str(), r#"getPosts("abc")"#);
    }

    #[test]
    fn test_typed_arguments_match_json() {
        #[derive(Serialize)]
        struct Args {
            name: &'static str,
        }

        assert_eq!(
            cache_key("getPokemon", &Args { name: "ditto" }),
            cache_key("getPokemon", &json!({ "name": "ditto" }))
        );
    }

    #[test]
    fn test_request_ids_are_unique() {
        let first = new_request_id();
        let second = new_request_id();
        assert_ne!(first, second);
        assert_ne!(cache_key("addPost", &first), cache_key("addPost", &second));
    }
}
