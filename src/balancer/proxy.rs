//! Interception layer over the upstream client graph
//!
//! A [`Proxy`] is either unbound (fronting the balancer) or bound to one
//! selected [`EndpointClient`] and a node of that client's graph. Touching an
//! unbound proxy performs exactly one balancing selection and continues on a
//! bound proxy; every member reached from a bound proxy stays bound to the
//! same client, so one call chain is never split across upstreams.
//!
//! Calls reached through a bound proxy resolve the `"auto"` model sentinel
//! and overwrite the first argument's `model` with the client's pinned model
//! before delegating to the real operation.

use super::Balancer;
use super::client::EndpointClient;
use super::resolver;
use crate::api::{ApiResponse, Node, Operation, Resource, UpstreamApi};
use crate::error::{BalancerError, BalancerResult};
use crate::metrics::Metrics;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
enum Binding {
    Unbound(Arc<Balancer>),
    Bound {
        client: Arc<EndpointClient>,
        target: Arc<dyn Resource>,
    },
}

/// Transparent handle with the same shape as the underlying client graph
#[derive(Clone)]
pub struct Proxy {
    binding: Binding,
    metrics: Arc<Metrics>,
}

/// A member reached through a proxy
#[derive(Clone)]
pub enum Member {
    /// Operation wrapped with model resolution and rewriting
    Call(InterceptedCall),
    /// Nested namespace, bound to the same client
    Resource(Proxy),
    /// Plain value, returned unchanged
    Value(Value),
}

impl Proxy {
    pub(crate) fn unbound(balancer: Arc<Balancer>) -> Self {
        let metrics = balancer.metrics().clone();
        Self {
            binding: Binding::Unbound(balancer),
            metrics,
        }
    }

    /// Proxy bound to `client`, positioned at the root of its graph
    pub fn bound(client: Arc<EndpointClient>, metrics: Arc<Metrics>) -> Self {
        let target = client.handle().clone().into_resource();
        Self {
            binding: Binding::Bound { client, target },
            metrics,
        }
    }

    /// The endpoint client this proxy is bound to; `None` while unbound
    pub fn bound_client(&self) -> Option<&Arc<EndpointClient>> {
        match &self.binding {
            Binding::Unbound(_) => None,
            Binding::Bound { client, .. } => Some(client),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound_client().is_some()
    }

    /// Fix the endpoint for a call chain
    ///
    /// An unbound proxy performs one balancing selection and returns a proxy
    /// bound to the chosen client's root. A bound proxy returns itself.
    pub fn bind(&self) -> Proxy {
        match &self.binding {
            Binding::Unbound(balancer) => Self::bound(balancer.next_client(), self.metrics.clone()),
            Binding::Bound { .. } => self.clone(),
        }
    }

    /// Raw handle of the next selected upstream, bypassing interception
    ///
    /// Only the unbound (balancer) proxy has a next client; bound proxies return `None`.
    pub fn next_client(&self) -> Option<Arc<dyn UpstreamApi>> {
        match &self.binding {
            Binding::Unbound(balancer) => Some(balancer.next_client().handle().clone()),
            Binding::Bound { .. } => None,
        }
    }

    /// Access a member by name
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::UnknownMember` if the underlying node has no such member.
    pub fn get(&self, name: &str) -> BalancerResult<Member> {
        let (client, target) = match &self.binding {
            Binding::Unbound(_) => return self.bind().get(name),
            Binding::Bound { client, target } => (client, target),
        };

        match target.member(name) {
            Some(Node::Operation(operation)) => Ok(Member::Call(InterceptedCall {
                client: client.clone(),
                operation,
                name: name.to_string(),
                metrics: self.metrics.clone(),
            })),
            Some(Node::Resource(nested)) => Ok(Member::Resource(Proxy {
                binding: Binding::Bound {
                    client: client.clone(),
                    target: nested,
                },
                metrics: self.metrics.clone(),
            })),
            Some(Node::Value(value)) => Ok(Member::Value(value)),
            None => Err(BalancerError::UnknownMember(name.to_string())),
        }
    }

    /// Walk a dotted member path, e.g. `["chat", "completions", "create"]`
    ///
    /// The whole walk happens on one selected endpoint.
    pub fn path(&self, path: &[&str]) -> BalancerResult<Member> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(Member::Resource(self.clone()));
        };

        let mut member = self.get(first)?;
        for (depth, name) in rest.iter().enumerate() {
            member = match member {
                Member::Resource(proxy) => proxy.get(name)?,
                Member::Call(_) | Member::Value(_) => {
                    return Err(BalancerError::UnknownMember(path[..=depth + 1].join(".")));
                }
            };
        }
        Ok(member)
    }

    /// Walk `path` and invoke the operation found there
    ///
    /// # Errors
    ///
    /// Returns `BalancerError::InvalidArguments` if the path does not end at an
    /// operation, otherwise whatever the resolution or the operation returns.
    pub async fn call(&self, path: &[&str], args: Vec<Value>) -> BalancerResult<ApiResponse> {
        match self.path(path)? {
            Member::Call(call) => call.invoke(args).await,
            Member::Resource(_) | Member::Value(_) => Err(BalancerError::InvalidArguments(
                format!("'{}' is not callable", path.join(".")),
            )),
        }
    }
}

impl Resource for Proxy {
    fn member(&self, name: &str) -> Option<Node> {
        match self.get(name).ok()? {
            Member::Call(call) => Some(Node::Operation(Arc::new(call))),
            Member::Resource(proxy) => Some(Node::Resource(Arc::new(proxy))),
            Member::Value(value) => Some(Node::Value(value)),
        }
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.binding {
            Binding::Unbound(balancer) => f.debug_tuple("Proxy::Unbound").field(balancer).finish(),
            Binding::Bound { client, .. } => f
                .debug_tuple("Proxy::Bound")
                .field(&client.base_url())
                .finish(),
        }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(call) => f.debug_tuple("Call").field(&call.name).finish(),
            Self::Resource(proxy) => f.debug_tuple("Resource").field(proxy).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

/// An upstream operation wrapped for one bound endpoint client
#[derive(Clone)]
pub struct InterceptedCall {
    client: Arc<EndpointClient>,
    operation: Arc<dyn Operation>,
    name: String,
    metrics: Arc<Metrics>,
}

impl InterceptedCall {
    pub fn client(&self) -> &Arc<EndpointClient> {
        &self.client
    }

    /// Resolve `"auto"`, pin the model onto the first argument, then delegate
    pub async fn invoke(&self, mut args: Vec<Value>) -> BalancerResult<ApiResponse> {
        resolver::resolve_if_needed(&self.client, &args, &self.metrics).await?;

        if let Some(model) = self.client.model() {
            match args.first_mut() {
                Some(Value::Object(first)) => {
                    first.insert("model".to_string(), Value::String(model.to_string()));
                    tracing::debug!(
                        endpoint = %self.client.base_url(),
                        operation = %self.name,
                        model = %model,
                        "Pinned model onto call arguments"
                    );
                }
                _ => {
                    tracing::warn!(
                        endpoint = %self.client.base_url(),
                        operation = %self.name,
                        arg_count = args.len(),
                        "First argument is not an object, model not injected"
                    );
                }
            }
        }

        self.operation.invoke(args).await
    }
}

#[async_trait]
impl Operation for InterceptedCall {
    async fn invoke(&self, args: Vec<Value>) -> BalancerResult<ApiResponse> {
        InterceptedCall::invoke(self, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ModelCatalog;
    use crate::config::{BalancerConfig, EndpointConfig};
    use serde_json::json;
    use std::sync::Mutex;

    /// Client graph that echoes its arguments and records every invocation
    struct EchoClient {
        name: String,
        calls: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    }

    struct EchoResource {
        client: String,
        path: String,
        calls: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    }

    struct EchoOperation {
        client: String,
        path: String,
        calls: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    }

    impl Resource for EchoClient {
        fn member(&self, name: &str) -> Option<Node> {
            EchoResource {
                client: self.name.clone(),
                path: String::new(),
                calls: self.calls.clone(),
            }
            .member(name)
        }
    }

    #[async_trait]
    impl ModelCatalog for EchoClient {
        async fn list_models(&self) -> BalancerResult<Vec<Option<String>>> {
            Ok(vec![Some(format!("{}-model", self.name))])
        }
    }

    impl Resource for EchoResource {
        fn member(&self, name: &str) -> Option<Node> {
            let path = if self.path.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", self.path, name)
            };
            match name {
                "create" => Some(Node::Operation(Arc::new(EchoOperation {
                    client: self.client.clone(),
                    path,
                    calls: self.calls.clone(),
                }))),
                "version" => Some(Node::Value(json!(2))),
                "missing" => None,
                _ => Some(Node::Resource(Arc::new(EchoResource {
                    client: self.client.clone(),
                    path,
                    calls: self.calls.clone(),
                }))),
            }
        }
    }

    #[async_trait]
    impl Operation for EchoOperation {
        async fn invoke(&self, args: Vec<Value>) -> BalancerResult<ApiResponse> {
            self.calls
                .lock()
                .unwrap()
                .push((format!("{}:{}", self.client, self.path), args.clone()));
            Ok(ApiResponse::Json(json!({ "client": self.client, "args": args })))
        }
    }

    fn echo_balancer(
        endpoints: Vec<EndpointConfig>,
    ) -> (Proxy, Arc<Mutex<Vec<(String, Vec<Value>)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let factory = move |endpoint: &EndpointConfig| -> BalancerResult<Arc<dyn UpstreamApi>> {
            Ok(Arc::new(EchoClient {
                name: endpoint.base_url().to_string(),
                calls: recorded.clone(),
            }))
        };
        let balancer = Balancer::with_factory(&BalancerConfig::new(endpoints), factory)
            .expect("should build balancer");
        (balancer.into_proxy(), calls)
    }

    #[tokio::test]
    async fn test_pinned_model_overrides_caller_model() {
        let (proxy, calls) =
            echo_balancer(vec![EndpointConfig::new("http://a/v1").with_model("gpt-x")]);

        proxy
            .call(
                &["chat", "completions", "create"],
                vec![json!({"model": "caller-choice", "messages": []})],
            )
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].0, "http://a/v1:chat.completions.create");
        assert_eq!(calls[0].1[0]["model"], "gpt-x");
        assert_eq!(calls[0].1[0]["messages"], json!([]));
    }

    #[tokio::test]
    async fn test_unpinned_model_passes_through() {
        let (proxy, calls) = echo_balancer(vec![EndpointConfig::new("http://a/v1")]);

        proxy
            .call(&["completions", "create"], vec![json!({"model": "mine"})])
            .await
            .unwrap();

        assert_eq!(calls.lock().unwrap()[0].1[0]["model"], "mine");
    }

    #[tokio::test]
    async fn test_auto_model_resolves_through_catalog() {
        let (proxy, calls) = echo_balancer(vec![EndpointConfig::new("http://a/v1")]);

        proxy
            .call(&["chat", "completions", "create"], vec![json!({"model": "auto"})])
            .await
            .unwrap();

        assert_eq!(calls.lock().unwrap()[0].1[0]["model"], "http://a/v1-model");
    }

    #[tokio::test]
    async fn test_non_object_first_argument_is_left_alone() {
        let (proxy, calls) =
            echo_balancer(vec![EndpointConfig::new("http://a/v1").with_model("gpt-x")]);

        proxy
            .call(&["files", "create"], vec![json!("file-123")])
            .await
            .unwrap();
        proxy.call(&["files", "create"], vec![]).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0].1, vec![json!("file-123")]);
        assert!(calls[1].1.is_empty());
    }

    #[tokio::test]
    async fn test_values_are_returned_unchanged() {
        let (proxy, _) = echo_balancer(vec![EndpointConfig::new("http://a/v1")]);
        match proxy.path(&["chat", "version"]).unwrap() {
            Member::Value(value) => assert_eq!(value, json!(2)),
            other => panic!("expected value, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_member_is_an_error() {
        let (proxy, _) = echo_balancer(vec![EndpointConfig::new("http://a/v1")]);
        let err = proxy.path(&["chat", "missing"]).unwrap_err();
        assert!(matches!(err, BalancerError::UnknownMember(ref name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_calling_a_namespace_is_invalid_arguments() {
        let (proxy, _) = echo_balancer(vec![EndpointConfig::new("http://a/v1")]);
        let err = proxy.call(&["chat"], vec![]).await.unwrap_err();
        assert!(matches!(err, BalancerError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_walking_past_an_operation_is_unknown_member() {
        let (proxy, _) = echo_balancer(vec![EndpointConfig::new("http://a/v1")]);
        let err = proxy.path(&["chat", "create", "deeper"]).unwrap_err();
        assert!(
            matches!(err, BalancerError::UnknownMember(ref name) if name == "chat.create.deeper")
        );
    }

    #[test]
    fn test_bind_selects_once_and_bound_proxy_stays_put() {
        let (proxy, _) = echo_balancer(vec![
            EndpointConfig::new("http://a/v1"),
            EndpointConfig::new("http://b/v1"),
        ]);
        assert!(!proxy.is_bound());

        let bound = proxy.bind();
        let chosen = bound.bound_client().unwrap().base_url().to_string();
        assert_eq!(chosen, "http://a/v1");
        assert_eq!(
            bound.bind().bound_client().unwrap().base_url(),
            "http://a/v1"
        );

        let Member::Resource(chat) = bound.get("chat").unwrap() else {
            panic!("chat should be a namespace");
        };
        assert_eq!(chat.bound_client().unwrap().base_url(), "http://a/v1");
        assert!(chat.next_client().is_none());
    }

    #[test]
    fn test_intercepted_call_keeps_the_chain_client() {
        let (proxy, _) = echo_balancer(vec![
            EndpointConfig::new("http://a/v1"),
            EndpointConfig::new("http://b/v1"),
        ]);
        proxy.bind();

        let Member::Call(call) = proxy.path(&["chat", "completions", "create"]).unwrap() else {
            panic!("create should be callable");
        };
        assert_eq!(call.client().base_url(), "http://b/v1");
    }

    #[test]
    fn test_proxy_implements_resource_shape() {
        let (proxy, _) = echo_balancer(vec![EndpointConfig::new("http://a/v1")]);
        let resource: &dyn Resource = &proxy;
        assert!(matches!(resource.member("chat"), Some(Node::Resource(_))));
        assert!(resource.member("missing").is_none());
    }
}
