//! Upstream API client surface
//!
//! An upstream client is modelled as an object graph: a [`Resource`] exposes
//! named members, each of which is a nested resource, a callable
//! [`Operation`], or a plain value. This lets the interception layer wrap any
//! depth of the client's namespaces without enumerating them.

pub mod http;

pub use http::HttpApiClient;

use crate::error::{BalancerError, BalancerResult};
use async_trait::async_trait;
use axum::body::Bytes;
use futures::Stream;
use serde_json::Value;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

/// Raw byte stream of a streaming (server-sent events) response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BalancerError>> + Send>>;

/// Result of invoking an upstream operation
pub enum ApiResponse {
    /// Fully decoded JSON body
    Json(Value),
    /// Undecoded streaming body, forwarded chunk by chunk
    Stream(ByteStream),
}

impl ApiResponse {
    /// Get the JSON body, if this is not a streaming response
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Stream(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Stream(_) => None,
        }
    }
}

impl fmt::Debug for ApiResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A callable member of the client graph
///
/// `args` are the positional arguments of the call. By convention the first
/// argument is a JSON object that may carry a `model` field.
#[async_trait]
pub trait Operation: Send + Sync {
    async fn invoke(&self, args: Vec<Value>) -> BalancerResult<ApiResponse>;
}

/// A namespace in the client graph
pub trait Resource: Send + Sync {
    /// Look up a member by name; `None` if the resource has no such member
    fn member(&self, name: &str) -> Option<Node>;
}

/// A member of a resource
#[derive(Clone)]
pub enum Node {
    Resource(Arc<dyn Resource>),
    Operation(Arc<dyn Operation>),
    Value(Value),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(_) => f.write_str("Resource(..)"),
            Self::Operation(_) => f.write_str("Operation(..)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// Model catalog listing capability of an upstream
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// List the catalog entries in order, one per entry
    ///
    /// An entry without a string id is kept in position as `None`.
    async fn list_models(&self) -> BalancerResult<Vec<Option<String>>>;
}

/// Full upstream client: a resource graph root plus a model catalog
pub trait UpstreamApi: Resource + ModelCatalog {
    /// View this client as the root resource of its graph
    fn into_resource(self: Arc<Self>) -> Arc<dyn Resource>;
}

impl<T: Resource + ModelCatalog + 'static> UpstreamApi for T {
    fn into_resource(self: Arc<Self>) -> Arc<dyn Resource> {
        self
    }
}
