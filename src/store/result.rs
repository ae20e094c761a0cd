use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::base_query::QueryOutcome;
use crate::error::QueryError;

/// Lifecycle of one cache slot.
///
/// ```text
/// Uninitialized -> Loading -> Success | Error
///                     ^          |
///                     +----------+  (refetch)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Uninitialized,
    Loading,
    Success,
    Error,
}

/// The state of one cached request.
///
/// At most one of `data` and `error` is populated once the request settles.
/// While loading both are empty: a refetch clears the previous result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    pub data: Option<Value>,
    pub error: Option<QueryError>,
    pub is_loading: bool,
    pub is_success: bool,
    pub is_error: bool,
    pub is_initialized: bool,
}

impl QueryResult {
    /// The result reported for a key that has never been initiated.
    pub const UNINITIALIZED: Self = Self {
        data: None,
        error: None,
        is_loading: false,
        is_success: false,
        is_error: false,
        is_initialized: false,
    };

    /// A request is in flight.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::UNINITIALIZED
        }
    }

    /// The request settled with `outcome`.
    #[must_use]
    pub fn settled(outcome: QueryOutcome) -> Self {
        let (data, error) = match outcome {
            QueryOutcome::Data(data) => (Some(data), None),
            QueryOutcome::Error(e) => (None, Some(QueryError::Api(e))),
        };

        Self {
            is_success: data.is_some(),
            is_error: error.is_some(),
            is_loading: false,
            is_initialized: true,
            data,
            error,
        }
    }

    /// The request could not be made at all.
    #[must_use]
    pub const fn failed(error: QueryError) -> Self {
        Self {
            data: None,
            error: Some(error),
            is_loading: false,
            is_success: false,
            is_error: true,
            is_initialized: true,
        }
    }

    #[must_use]
    pub const fn status(&self) -> QueryStatus {
        if self.is_loading {
            QueryStatus::Loading
        } else if self.is_error {
            QueryStatus::Error
        } else if self.is_success {
            QueryStatus::Success
        } else {
            QueryStatus::Uninitialized
        }
    }

    #[must_use]
    pub const fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    #[must_use]
    pub const fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }

    /// Deserializes the data into `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the data does not have the shape of `T`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.data.clone().map(serde_json::from_value).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn test_default_is_uninitialized() {
        let result = QueryResult::default();
        assert_eq!(result, QueryResult::UNINITIALIZED);
        assert_eq!(result.status(), QueryStatus::Uninitialized);
        assert!(result.data().is_none());
        assert!(result.error().is_none());
    }

    #[test]
    fn test_loading() {
        let result = QueryResult::loading();
        assert!(result.is_loading);
        assert!(!result.is_initialized);
        assert!(!result.is_success);
        assert!(!result.is_error);
        assert_eq!(result.status(), QueryStatus::Loading);
    }

    #[test]
    fn test_settled_with_data() {
        let result = QueryResult::settled(QueryOutcome::Data(json!({ "id": 25 })));
        assert!(result.is_success);
        assert!(!result.is_error);
        assert!(!result.is_loading);
        assert!(result.is_initialized);
        assert_eq!(result.data(), Some(&json!({ "id": 25 })));
        assert_eq!(result.status(), QueryStatus::Success);
    }

    #[test]
    fn test_settled_with_error() {
        let result = QueryResult::settled(QueryOutcome::Error(ApiError::new("bad", "E1")));
        assert!(!result.is_success);
        assert!(result.is_error);
        assert!(result.is_initialized);
        assert!(result.data().is_none());
        assert_eq!(
            result.error(),
            Some(&QueryError::Api(ApiError::new("bad", "E1")))
        );
        assert_eq!(result.status(), QueryStatus::Error);
    }

    #[test]
    fn test_failed() {
        let result = QueryResult::failed(QueryError::Request("bad args".to_string()));
        assert!(result.is_error);
        assert!(result.is_initialized);
        assert!(result.data.is_none());
    }

    #[test]
    fn test_data_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Pokemon {
            id: u32,
            name: String,
        }

        let result =
            QueryResult::settled(QueryOutcome::Data(json!({ "id": 25, "name": "pikachu" })));
        let pokemon: Option<Pokemon> = result.data_as().expect("matching shape");
        assert_eq!(
            pokemon,
            Some(Pokemon {
                id: 25,
                name: "pikachu".to_string()
            })
        );

        assert!(result.data_as::<Vec<u32>>().is_err());
        assert_eq!(QueryResult::UNINITIALIZED.data_as::<Pokemon>().ok(), Some(None));
    }
}
