use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Configuration for an [`Api`](crate::api::Api) and its HTTP base query.
///
/// Every field has a default, so a partial document deserializes:
///
/// ```
/// use apistore::config::ApiConfig;
///
/// let json = r#"{ "name": "pokeApi", "request_timeout_ms": 5000 }"#;
/// let config: ApiConfig = serde_json::from_str(json)?;
/// assert_eq!(config.notify_capacity, 100);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Name of the store, used in log fields.
    pub name: String,

    /// How many change notifications a slow subscriber may fall behind
    /// before it skips ahead to the current state.
    pub notify_capacity: usize,

    /// Upper bound for a single HTTP request made by
    /// [`ReqwestBaseQuery`](crate::base_query::ReqwestBaseQuery).
    #[serde(rename = "request_timeout_ms", deserialize_with = "millis")]
    pub request_timeout: Duration,

    /// Headers sent with every HTTP request.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            name: "api".to_string(),
            notify_capacity: 100,
            request_timeout: Duration::from_secs(30),
            default_headers: BTreeMap::from([(
                "Content-Type".to_string(),
                "application/json".to_string(),
            )]),
        }
    }
}

impl ApiConfig {
    /// Creates a configuration with the given store name and default settings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_notify_capacity(mut self, capacity: usize) -> Self {
        self.notify_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
