//! The lifecycle callback surface.
//!
//! The REST pipeline calls these hooks around every outbound request. A
//! provider implements [`ProviderCallback`] and overrides only the hooks it
//! needs; every hook except [`ProviderCallback::get_authorization_header`]
//! has a pass-through default.
//!
//! # Example
//!
//! ```ignore
//! use xyz_provider::callback::{OutboundRequest, ProviderCallback, ResourceRequest};
//! use xyz_provider::ProviderError;
//!
//! struct Tagging;
//!
//! #[async_trait::async_trait]
//! impl ProviderCallback for Tagging {
//!     fn get_authorization_header(&self) -> Result<String, ProviderError> {
//!         Ok("Bearer test".to_string())
//!     }
//!
//!     async fn on_pre_create(
//!         &self,
//!         _req: &ResourceRequest,
//!         http: &mut OutboundRequest,
//!     ) -> Result<(), ProviderError> {
//!         http.set_header("X-Request-Source", "pulumi");
//!         Ok(())
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{DiffResponse, ObjectDiff};

/// Configuration supplied by the host at configure time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfigureRequest {
    /// Namespaced configuration keys to string values.
    pub variables: HashMap<String, String>,
}

impl ConfigureRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration variable.
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(key.into(), value.into());
        self
    }
}

/// The provider's answer to a configure call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigureResponse {
    /// Whether the provider accepts secret-valued configuration.
    pub accept_secrets: bool,
}

impl Default for ConfigureResponse {
    fn default() -> Self {
        Self {
            accept_secrets: true,
        }
    }
}

/// A pending resource operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// The resource type token, e.g. `xyz:index:Widget`.
    pub resource_type: String,
    /// The provider-assigned id, absent for create.
    pub id: Option<String>,
    /// The desired inputs.
    pub inputs: Value,
    /// The prior recorded state, if any.
    pub state: Option<Value>,
}

impl ResourceRequest {
    /// Create a request for a resource type with the given inputs.
    pub fn new(resource_type: impl Into<String>, inputs: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            inputs,
            state: None,
        }
    }

    /// Set the resource id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the prior recorded state.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}

/// A pending function invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// The function token, e.g. `xyz:index:getWidget`.
    pub token: String,
    /// The function arguments.
    pub args: Value,
}

impl InvokeRequest {
    /// Create an invocation.
    pub fn new(token: impl Into<String>, args: Value) -> Self {
        Self {
            token: token.into(),
            args,
        }
    }
}

/// A pending diff between two desired states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffRequest {
    /// The resource type token.
    pub resource_type: String,
    /// The provider-assigned id.
    pub id: Option<String>,
    /// The old state.
    pub olds: Value,
    /// The new desired inputs.
    pub news: Value,
}

impl DiffRequest {
    /// Create a diff request.
    pub fn new(resource_type: impl Into<String>, olds: Value, news: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            olds,
            news,
        }
    }
}

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(method)
    }
}

/// The not-yet-sent representation of an outbound HTTP request.
///
/// Header names are stored as given; lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The absolute (or base-relative) URL.
    pub url: String,
    /// Request headers.
    pub headers: BTreeMap<String, String>,
    /// JSON body, if any.
    pub body: Option<Value>,
}

impl OutboundRequest {
    /// Create a request without headers or body.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Set the JSON body.
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a header, replacing any existing header with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Look up a header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Hooks invoked at defined points of a resource's lifecycle.
///
/// Pre hooks run after the outbound request is built and before it is sent;
/// an error aborts the operation without any network call. Post hooks
/// receive the decoded response and return the mapping recorded as the
/// resource's state.
#[async_trait::async_trait]
pub trait ProviderCallback: Send + Sync + 'static {
    /// The `Authorization` header value for outbound requests.
    fn get_authorization_header(&self) -> Result<String, ProviderError>;

    /// Customize provider configuration. Called once, before any other hook.
    async fn on_configure(
        &self,
        req: &ConfigureRequest,
    ) -> Result<ConfigureResponse, ProviderError> {
        let _ = req;
        Ok(ConfigureResponse::default())
    }

    /// Called before a function invocation is sent.
    async fn on_pre_invoke(
        &self,
        req: &InvokeRequest,
        http: &mut OutboundRequest,
    ) -> Result<(), ProviderError> {
        let _ = (req, http);
        Ok(())
    }

    /// Called with the decoded invocation response.
    async fn on_post_invoke(
        &self,
        req: &InvokeRequest,
        outputs: Value,
    ) -> Result<Value, ProviderError> {
        let _ = req;
        Ok(outputs)
    }

    /// Called before a create request is sent.
    async fn on_pre_create(
        &self,
        req: &ResourceRequest,
        http: &mut OutboundRequest,
    ) -> Result<(), ProviderError> {
        let _ = (req, http);
        Ok(())
    }

    /// Called with the decoded create response.
    async fn on_post_create(
        &self,
        req: &ResourceRequest,
        outputs: Value,
    ) -> Result<Value, ProviderError> {
        let _ = req;
        Ok(outputs)
    }

    /// Called before a read request is sent.
    async fn on_pre_read(
        &self,
        req: &ResourceRequest,
        http: &mut OutboundRequest,
    ) -> Result<(), ProviderError> {
        let _ = (req, http);
        Ok(())
    }

    /// Called with the decoded read response.
    async fn on_post_read(
        &self,
        req: &ResourceRequest,
        outputs: Value,
    ) -> Result<Value, ProviderError> {
        let _ = req;
        Ok(outputs)
    }

    /// Called before an update request is sent.
    async fn on_pre_update(
        &self,
        req: &ResourceRequest,
        http: &mut OutboundRequest,
    ) -> Result<(), ProviderError> {
        let _ = (req, http);
        Ok(())
    }

    /// Called with the decoded update response.
    async fn on_post_update(
        &self,
        req: &ResourceRequest,
        outputs: Value,
    ) -> Result<Value, ProviderError> {
        let _ = req;
        Ok(outputs)
    }

    /// Called before a delete request is sent.
    async fn on_pre_delete(
        &self,
        req: &ResourceRequest,
        http: &mut OutboundRequest,
    ) -> Result<(), ProviderError> {
        let _ = (req, http);
        Ok(())
    }

    /// Called with the decoded delete response.
    async fn on_post_delete(
        &self,
        req: &ResourceRequest,
        outputs: Value,
    ) -> Result<Value, ProviderError> {
        let _ = req;
        Ok(outputs)
    }

    /// Override the computed diff. `None` accepts it unchanged.
    async fn on_diff(
        &self,
        req: &DiffRequest,
        diff: &ObjectDiff,
    ) -> Result<Option<DiffResponse>, ProviderError> {
        let _ = (req, diff);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Defaults;

    #[async_trait::async_trait]
    impl ProviderCallback for Defaults {
        fn get_authorization_header(&self) -> Result<String, ProviderError> {
            Ok("Bearer k".to_string())
        }
    }

    #[tokio::test]
    async fn test_default_hooks_pass_through() {
        let cb = Defaults;
        let req = ResourceRequest::new("xyz:index:Widget", json!({"name": "w"}));
        let payload = json!({"id": "w-1", "name": "w", "createdAt": "now"});

        assert_eq!(cb.on_post_create(&req, payload.clone()).await.unwrap(), payload);
        assert_eq!(cb.on_post_read(&req, payload.clone()).await.unwrap(), payload);
        assert_eq!(cb.on_post_update(&req, payload.clone()).await.unwrap(), payload);
        assert_eq!(cb.on_post_delete(&req, payload.clone()).await.unwrap(), payload);

        let invoke = InvokeRequest::new("xyz:index:getWidget", json!({}));
        assert_eq!(cb.on_post_invoke(&invoke, payload.clone()).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_default_pre_hooks_leave_request_untouched() {
        let cb = Defaults;
        let req = ResourceRequest::new("xyz:index:Widget", json!({}));
        let mut http = OutboundRequest::new(HttpMethod::Post, "https://api.xyz.test/widgets");
        let before = http.clone();

        cb.on_pre_create(&req, &mut http).await.unwrap();
        cb.on_pre_read(&req, &mut http).await.unwrap();
        cb.on_pre_update(&req, &mut http).await.unwrap();
        cb.on_pre_delete(&req, &mut http).await.unwrap();
        assert_eq!(http, before);
    }

    #[tokio::test]
    async fn test_default_configure_and_diff() {
        let cb = Defaults;
        let response = cb.on_configure(&ConfigureRequest::new()).await.unwrap();
        assert!(response.accept_secrets);

        let req = DiffRequest::new("xyz:index:Widget", json!({"a": 1}), json!({"a": 2}));
        let diff = ObjectDiff::between(&req.olds, &req.news);
        assert!(cb.on_diff(&req, &diff).await.unwrap().is_none());
    }

    #[test]
    fn test_outbound_headers_case_insensitive() {
        let mut http = OutboundRequest::new(HttpMethod::Get, "/widgets");
        http.set_header("Authorization", "Bearer a");
        http.set_header("authorization", "Bearer b");

        assert_eq!(http.headers.len(), 1);
        assert_eq!(http.header("AUTHORIZATION"), Some("Bearer b"));
        assert_eq!(http.header("X-Missing"), None);
    }

    #[test]
    fn test_http_method_display() {
        assert_eq!(HttpMethod::Patch.to_string(), "PATCH");
        assert_eq!(serde_json::to_value(HttpMethod::Delete).unwrap(), json!("DELETE"));
    }
}
