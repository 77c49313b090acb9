//! HTTP client for OpenAI-compatible endpoints
//!
//! Member names map onto URL path segments, so `chat.completions.create`
//! issues `POST {base}/chat/completions`. The verbs recognised at any depth are:
//! - `create`: POST with the first argument as JSON body
//! - `list`: GET, first argument (if an object) becomes the query string
//! - `retrieve`: GET `{path}/{id}`, first argument is the id
//! - `del`: DELETE `{path}/{id}`, first argument is the id
//!
//! Any other name is a nested resource one segment deeper. A `create` call
//! whose body carries `"stream": true` returns the raw event stream.

use super::{ApiResponse, ModelCatalog, Node, Operation, Resource};
use crate::config::EndpointConfig;
use crate::error::{BalancerError, BalancerResult};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde_json::Value;
use std::sync::Arc;

struct HttpInner {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpInner {
    fn url(&self, path: &[String]) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path.join("/"))
        }
    }

    fn transport_error(&self, source: reqwest::Error) -> BalancerError {
        BalancerError::Transport {
            endpoint: self.base_url.clone(),
            source,
        }
    }

    /// Send a request and turn non-success statuses into `BalancerError::Upstream`
    async fn send(&self, request: reqwest::RequestBuilder) -> BalancerResult<reqwest::Response> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(
                    endpoint = %self.base_url,
                    error = %e,
                    "Failed to read upstream error body"
                );
                String::new()
            }
        };
        tracing::debug!(
            endpoint = %self.base_url,
            status = status.as_u16(),
            "Upstream returned non-success status"
        );
        Err(BalancerError::Upstream {
            endpoint: self.base_url.clone(),
            status: status.as_u16(),
            body,
        })
    }
}

/// Client for one OpenAI-compatible upstream
#[derive(Clone)]
pub struct HttpApiClient {
    inner: Arc<HttpInner>,
}

impl HttpApiClient {
    /// Create a client for `base_url`, authenticating with `api_key` when given
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> BalancerResult<Self> {
        let base_url = base_url.into();
        let http = reqwest::Client::builder().build().map_err(|e| {
            BalancerError::Config(format!("Failed to build HTTP client for {}: {}", base_url, e))
        })?;

        Ok(Self {
            inner: Arc::new(HttpInner {
                http,
                base_url,
                api_key,
            }),
        })
    }

    /// Create a client from an endpoint configuration entry
    pub fn from_endpoint(endpoint: &EndpointConfig) -> BalancerResult<Self> {
        Self::new(endpoint.base_url(), endpoint.api_key().map(str::to_string))
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn root(&self) -> HttpResource {
        HttpResource {
            inner: self.inner.clone(),
            path: Vec::new(),
        }
    }
}

impl Resource for HttpApiClient {
    fn member(&self, name: &str) -> Option<Node> {
        match name {
            "baseURL" => Some(Node::Value(Value::String(self.inner.base_url.clone()))),
            _ => self.root().member(name),
        }
    }
}

#[async_trait]
impl ModelCatalog for HttpApiClient {
    async fn list_models(&self) -> BalancerResult<Vec<Option<String>>> {
        let url = self.inner.url(&["models".to_string()]);
        let response = self.inner.send(self.inner.http.get(url)).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| self.inner.transport_error(e))?;
        Ok(model_ids(&body))
    }
}

/// Extract `data[].id` from a models list body, one slot per entry
fn model_ids(body: &Value) -> Vec<Option<String>> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| entry.get("id").and_then(Value::as_str).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Convert a member name to its URL segment (`fineTuning` -> `fine_tuning`)
fn path_segment(name: &str) -> String {
    let mut segment = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            segment.push('_');
            segment.push(ch.to_ascii_lowercase());
        } else {
            segment.push(ch);
        }
    }
    segment
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Create,
    List,
    Retrieve,
    Delete,
}

impl Verb {
    fn from_member(name: &str) -> Option<Self> {
        match name {
            "create" => Some(Self::Create),
            "list" => Some(Self::List),
            "retrieve" => Some(Self::Retrieve),
            "del" => Some(Self::Delete),
            _ => None,
        }
    }
}

struct HttpResource {
    inner: Arc<HttpInner>,
    path: Vec<String>,
}

impl Resource for HttpResource {
    fn member(&self, name: &str) -> Option<Node> {
        if let Some(verb) = Verb::from_member(name) {
            return Some(Node::Operation(Arc::new(HttpOperation {
                inner: self.inner.clone(),
                path: self.path.clone(),
                verb,
            })));
        }

        let mut path = self.path.clone();
        path.push(path_segment(name));
        Some(Node::Resource(Arc::new(HttpResource {
            inner: self.inner.clone(),
            path,
        })))
    }
}

struct HttpOperation {
    inner: Arc<HttpInner>,
    path: Vec<String>,
    verb: Verb,
}

impl HttpOperation {
    fn id_url(&self, args: &[Value]) -> BalancerResult<String> {
        let id = args.first().and_then(Value::as_str).ok_or_else(|| {
            BalancerError::InvalidArguments(format!(
                "{} on '{}' requires an id string as first argument",
                if self.verb == Verb::Delete { "del" } else { "retrieve" },
                self.path.join(".")
            ))
        })?;
        let mut path = self.path.clone();
        path.push(id.to_string());
        Ok(self.inner.url(&path))
    }
}

#[async_trait]
impl Operation for HttpOperation {
    async fn invoke(&self, args: Vec<Value>) -> BalancerResult<ApiResponse> {
        let http = &self.inner.http;
        let (request, streaming) = match self.verb {
            Verb::Create => {
                let body = args
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| Value::Object(Default::default()));
                let streaming = body.get("stream").and_then(Value::as_bool) == Some(true);
                (http.post(self.inner.url(&self.path)).json(&body), streaming)
            }
            Verb::List => {
                let mut request = http.get(self.inner.url(&self.path));
                if let Some(Value::Object(params)) = args.first() {
                    let query: Vec<(String, String)> = params
                        .iter()
                        .map(|(key, value)| match value {
                            Value::String(s) => (key.clone(), s.clone()),
                            other => (key.clone(), other.to_string()),
                        })
                        .collect();
                    request = request.query(&query);
                }
                (request, false)
            }
            Verb::Retrieve => (http.get(self.id_url(&args)?), false),
            Verb::Delete => (http.delete(self.id_url(&args)?), false),
        };

        let response = self.inner.send(request).await?;

        if streaming {
            let endpoint = self.inner.base_url.clone();
            let stream = response
                .bytes_stream()
                .map_err(move |source| BalancerError::Transport {
                    endpoint: endpoint.clone(),
                    source,
                });
            return Ok(ApiResponse::Stream(Box::pin(stream)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| self.inner.transport_error(e))?;
        Ok(ApiResponse::Json(body))
    }
}
