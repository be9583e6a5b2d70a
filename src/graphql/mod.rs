//! GraphQL transport for the Morpho API and The Graph subgraphs
//!
//! Query documents live in [`queries`] as raw strings; responses are handled
//! as `serde_json::Value` and decoded per entity by the callers.

pub(crate) mod de;
pub mod queries;

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Executes a GraphQL document against an endpoint and returns its `data` member
#[async_trait]
pub trait GraphQlTransport: Send + Sync {
    async fn query(&self, url: &str, query: &str, variables: &Value) -> Result<Value>;
}

/// GraphQL over HTTP POST
///
/// No retries happen here; a failed request is returned to the caller as is.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a total per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl GraphQlTransport for HttpTransport {
    async fn query(&self, url: &str, query: &str, variables: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(&json!({
                "query": query,
                "variables": variables
            }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        decode_response(status, &body)
    }
}

/// Unwrap a GraphQL reply. A failed HTTP status keeps any `errors[]` the
/// server sent alongside it.
fn decode_response(status: StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        let detail = serde_json::from_str::<GraphQLResponse>(body)
            .ok()
            .and_then(|envelope| envelope.error_message());
        return Err(Error::GraphQL(match detail {
            Some(message) => format!("HTTP {}: {}", status, message),
            None => format!("HTTP {}", status),
        }));
    }

    let envelope: GraphQLResponse = serde_json::from_str(body)?;
    envelope.into_data()
}

/// GraphQL response structure
#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    data: Option<Value>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize, Serialize)]
struct GraphQLError {
    message: String,
}

impl GraphQLResponse {
    /// Joined `errors[]` messages; `None` when the array is absent or empty
    fn error_message(&self) -> Option<String> {
        let errors = self.errors.as_ref().filter(|errors| !errors.is_empty())?;
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        Some(messages.join(", "))
    }

    fn into_data(self) -> Result<Value> {
        if let Some(message) = self.error_message() {
            return Err(Error::GraphQL(message));
        }

        self.data
            .filter(|data| !data.is_null())
            .ok_or_else(|| Error::GraphQL("No data in GraphQL response".to_string()))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for tests

    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&str, &str, &Value) -> Result<Value> + Send + Sync>;

    /// A recorded request
    #[derive(Debug, Clone)]
    pub(crate) struct Call {
        pub url: String,
        pub query: String,
        pub variables: Value,
    }

    pub(crate) struct MockTransport {
        handler: Handler,
        calls: Mutex<Vec<Call>>,
        count: AtomicUsize,
    }

    impl MockTransport {
        pub(crate) fn new(
            handler: impl Fn(&str, &str, &Value) -> Result<Value> + Send + Sync + 'static,
        ) -> Self {
            Self {
                handler: Box::new(handler),
                calls: Mutex::new(Vec::new()),
                count: AtomicUsize::new(0),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.count.load(Ordering::SeqCst)
        }

        pub(crate) fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GraphQlTransport for MockTransport {
        async fn query(&self, url: &str, query: &str, variables: &Value) -> Result<Value> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(Call {
                url: url.to_string(),
                query: query.to_string(),
                variables: variables.clone(),
            });
            (self.handler)(url, query, variables)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_returns_data() {
        let envelope: GraphQLResponse =
            serde_json::from_value(json!({ "data": { "tokens": [] } })).unwrap();
        assert_eq!(envelope.into_data().unwrap(), json!({ "tokens": [] }));
    }

    #[test]
    fn test_envelope_errors() {
        let envelope: GraphQLResponse = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "bad field" }, { "message": "rate limited" }]
        }))
        .unwrap();
        let err = envelope.into_data().unwrap_err();
        assert!(matches!(err, Error::GraphQL(ref msg) if msg == "bad field, rate limited"));
    }

    #[test]
    fn test_envelope_without_data() {
        let envelope: GraphQLResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(envelope.into_data(), Err(Error::GraphQL(_))));
    }

    #[test]
    fn test_http_error_keeps_graphql_errors() {
        let body = r#"{"errors":[{"message":"Cannot query field \"foo\" on type \"Query\""}]}"#;
        let err = decode_response(StatusCode::BAD_REQUEST, body).unwrap_err();
        assert!(matches!(
            err,
            Error::GraphQL(ref msg)
                if msg == "HTTP 400 Bad Request: Cannot query field \"foo\" on type \"Query\""
        ));
    }

    #[test]
    fn test_http_error_without_envelope() {
        let err = decode_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, Error::GraphQL(ref msg) if msg == "HTTP 502 Bad Gateway"));

        let err = decode_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{"errors":[]}"#).unwrap_err();
        assert!(matches!(err, Error::GraphQL(ref msg) if msg == "HTTP 500 Internal Server Error"));
    }

    #[test]
    fn test_success_body_is_unwrapped() {
        let data = decode_response(StatusCode::OK, r#"{"data":{"tokens":[]}}"#).unwrap();
        assert_eq!(data, json!({ "tokens": [] }));

        let err = decode_response(StatusCode::OK, r#"{"errors":[{"message":"rate limited"}]}"#)
            .unwrap_err();
        assert!(matches!(err, Error::GraphQL(ref msg) if msg == "rate limited"));

        assert!(matches!(
            decode_response(StatusCode::OK, "not json"),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn test_empty_errors_array_is_ignored() {
        let envelope: GraphQLResponse =
            serde_json::from_value(json!({ "data": { "a": 1 }, "errors": [] })).unwrap();
        assert!(envelope.into_data().is_ok());
    }
}
