//! Cloud function tool executor.
//!
//! Maps tool names to configured HTTPS endpoints and calls them with a GET
//! request, encoding the model's arguments as query parameters.

use crate::traits::{ToolExecutor, ToolOutput};
use async_trait::async_trait;
use live_common::ToolsConfig;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Executor backed by one HTTP endpoint per tool.
pub struct CloudFunctionExecutor {
    endpoints: HashMap<String, String>,
    client: reqwest::Client,
}

impl CloudFunctionExecutor {
    /// Create an executor from a name → endpoint map.
    pub fn new(endpoints: HashMap<String, String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self { endpoints, client }
    }

    /// Create an executor from the tools configuration.
    pub fn from_config(config: &ToolsConfig) -> Self {
        Self::new(config.endpoints.clone())
    }

    /// Build the request URL: the endpoint with every argument appended as a
    /// query parameter. Strings are sent verbatim, other values as JSON text.
    fn build_url(base: &str, args: &Map<String, Value>) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base)?;
        if !args.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in args {
                match value {
                    Value::String(s) => pairs.append_pair(key, s),
                    other => pairs.append_pair(key, &other.to_string()),
                };
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ToolExecutor for CloudFunctionExecutor {
    async fn execute(&self, tool_name: &str, args: &Map<String, Value>) -> ToolOutput {
        let Some(base_url) = self.endpoints.get(tool_name) else {
            tracing::error!(tool = %tool_name, "Tool not found");
            return ToolOutput::failure(format!("Unknown tool: {tool_name}"));
        };

        let url = match Self::build_url(base_url, args) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(tool = %tool_name, error = %e, "Error executing tool");
                return ToolOutput::failure(format!("Tool execution failed: {e}"));
            }
        };

        tracing::debug!(tool = %tool_name, url = %url, "Calling cloud function");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(tool = %tool_name, error = %e, "Network error calling cloud function");
                return ToolOutput::failure(format!("Failed to call cloud function: {e}"));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(tool = %tool_name, error = %e, "Failed to read cloud function response");
                return ToolOutput::failure(format!("Failed to call cloud function: {e}"));
            }
        };
        tracing::debug!(tool = %tool_name, status = status.as_u16(), body = %body, "Cloud function responded");

        if status.as_u16() != 200 {
            tracing::error!(tool = %tool_name, status = status.as_u16(), body = %body, "Cloud function error");
            return ToolOutput::failure(format!(
                "Cloud function returned status {}",
                status.as_u16()
            ));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => ToolOutput::Success(value),
            Err(e) => {
                tracing::error!(tool = %tool_name, body = %body, "Failed to parse JSON response");
                ToolOutput::failure(format!("Invalid JSON response from cloud function: {e}"))
            }
        }
    }

    fn has_tool(&self, tool_name: &str) -> bool {
        self.endpoints.contains_key(tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn executor_for(server: &MockServer, tool: &str, route: &str) -> CloudFunctionExecutor {
        let mut endpoints = HashMap::new();
        endpoints.insert(tool.to_string(), format!("{}{}", server.uri(), route));
        CloudFunctionExecutor::new(endpoints)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn unknown_tool_returns_error_without_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let executor = executor_for(&server, "weather", "/weather");
        let output = executor.execute("foo", &Map::new()).await;

        assert_eq!(output, ToolOutput::failure("Unknown tool: foo"));
        assert_eq!(output.into_value(), json!({ "error": "Unknown tool: foo" }));
    }

    #[tokio::test]
    async fn arguments_are_sent_as_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("city", "Paris"))
            .and(query_param("days", "3"))
            .and(query_param("metric", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "temp": 21 })))
            .expect(1)
            .mount(&server)
            .await;

        let executor = executor_for(&server, "weather", "/weather");
        let output = executor
            .execute(
                "weather",
                &args(json!({ "city": "Paris", "days": 3, "metric": true })),
            )
            .await;

        assert_eq!(output, ToolOutput::Success(json!({ "temp": 21 })));
    }

    #[tokio::test]
    async fn no_arguments_calls_bare_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/time"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "now": "noon" })))
            .mount(&server)
            .await;

        let executor = executor_for(&server, "time", "/time");
        let output = executor.execute("time", &Map::new()).await;

        assert!(output.is_success());
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn non_200_status_becomes_error_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let executor = executor_for(&server, "weather", "/weather");
        let output = executor.execute("weather", &Map::new()).await;

        assert_eq!(
            output.into_value(),
            json!({ "error": "Cloud function returned status 500" })
        );
    }

    #[tokio::test]
    async fn malformed_json_becomes_error_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let executor = executor_for(&server, "weather", "/weather");
        let output = executor.execute("weather", &Map::new()).await;

        let error = output.error().unwrap();
        assert!(error.starts_with("Invalid JSON response from cloud function:"));
    }

    #[tokio::test]
    async fn network_failure_becomes_error_object() {
        let mut endpoints = HashMap::new();
        // Port 9 on localhost: nothing listens there.
        endpoints.insert("down".to_string(), "http://127.0.0.1:9/fn".to_string());
        let executor = CloudFunctionExecutor::new(endpoints);

        let output = executor.execute("down", &Map::new()).await;
        assert!(output
            .error()
            .unwrap()
            .starts_with("Failed to call cloud function:"));
    }

    #[tokio::test]
    async fn invalid_endpoint_url_becomes_error_object() {
        let mut endpoints = HashMap::new();
        endpoints.insert("broken".to_string(), "not a url".to_string());
        let executor = CloudFunctionExecutor::new(endpoints);

        let output = executor.execute("broken", &Map::new()).await;
        assert!(output.error().unwrap().starts_with("Tool execution failed:"));
    }

    #[test]
    fn has_tool_reflects_configuration() {
        let mut config = ToolsConfig::default();
        config
            .endpoints
            .insert("weather".into(), "https://example.com/weather".into());
        let executor = CloudFunctionExecutor::from_config(&config);
        assert!(executor.has_tool("weather"));
        assert!(!executor.has_tool("foo"));
    }
}
