//! Error types for place search.

use wayfind_core::error::WayfindError;

/// Errors from the places service or the search client.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search query cannot be empty")]
    EmptyQuery,
    /// The service could not be reached, or did not answer in time.
    #[error("places service unavailable: {0}")]
    Unavailable(String),
    /// The service answered with a status other than OK / ZERO_RESULTS, or
    /// with a body that could not be decoded.
    #[error("places service error: {0}")]
    Service(String),
}

impl SearchError {
    /// Transport-level failure (as opposed to a service-reported one).
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SearchError::Unavailable(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            SearchError::Unavailable(err.to_string())
        } else {
            SearchError::Service(err.to_string())
        }
    }
}

impl From<SearchError> for WayfindError {
    fn from(err: SearchError) -> Self {
        WayfindError::Search(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display() {
        assert_eq!(
            SearchError::EmptyQuery.to_string(),
            "search query cannot be empty"
        );
        assert_eq!(
            SearchError::Unavailable("connection refused".to_string()).to_string(),
            "places service unavailable: connection refused"
        );
        assert_eq!(
            SearchError::Service("REQUEST_DENIED".to_string()).to_string(),
            "places service error: REQUEST_DENIED"
        );
    }

    #[test]
    fn test_is_unavailable() {
        assert!(SearchError::Unavailable(String::new()).is_unavailable());
        assert!(!SearchError::Service(String::new()).is_unavailable());
        assert!(!SearchError::EmptyQuery.is_unavailable());
    }

    #[test]
    fn test_into_wayfind_error() {
        let err: WayfindError = SearchError::Service("OVER_QUERY_LIMIT".to_string()).into();
        assert!(matches!(err, WayfindError::Search(_)));
        assert!(err.to_string().contains("OVER_QUERY_LIMIT"));
    }
}
