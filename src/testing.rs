//! Testing utilities for callback implementations.
//!
//! This module provides an in-memory [`Transport`] and a tester harness so
//! hooks can be exercised through the full REST pipeline without a network
//! or a host process.
//!
//! # Example
//!
//! ```ignore
//! use xyz_provider::testing::{MockTransport, ProviderTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_widget() {
//!     let transport = MockTransport::new()
//!         .respond(HttpMethod::Post, "/widgets", json!({"widgetId": "w-1"}));
//!     let tester = ProviderTester::new(MyCallback::new(), metadata, transport);
//!
//!     tester.configure_api_key("test").await.unwrap();
//!     let state = tester.create("xyz:index:Widget", json!({"name": "w"})).await.unwrap();
//!
//!     assert_eq!(state["widgetId"], "w-1");
//! }
//! ```

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::callback::{
    ConfigureRequest, ConfigureResponse, DiffRequest, HttpMethod, InvokeRequest, OutboundRequest,
    ProviderCallback, ResourceRequest,
};
use crate::error::ProviderError;
use crate::generate::OpenApiDocument;
use crate::rest::{RestProvider, Transport};
use crate::schema::xyz_package;
use crate::types::{DiffResponse, ProviderMetadata, API_KEY_CONFIG_KEY};

/// Base URL the tester's OpenAPI document declares.
pub const TEST_SERVER_URL: &str = "https://api.xyz.test";

/// An in-memory transport that records every request.
///
/// Responses are matched by method and URL suffix, first registered wins.
/// Unmatched requests get the request body back, or `{}` when there is none.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Vec<(HttpMethod, String, Value)>,
    rejections: Vec<(HttpMethod, String, u16)>,
    failure: Option<String>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl MockTransport {
    /// Create a transport with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a canned response.
    pub fn respond(mut self, method: HttpMethod, path: impl Into<String>, body: Value) -> Self {
        self.routes.push((method, path.into(), body));
        self
    }

    /// Answer matching requests with a non-success HTTP status.
    ///
    /// Rejections are checked before canned responses.
    pub fn reject(mut self, method: HttpMethod, path: impl Into<String>, status: u16) -> Self {
        self.rejections.push((method, path.into(), status));
        self
    }

    /// Fail every request with a transport error.
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Requests sent so far, in order.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: OutboundRequest) -> Result<Value, ProviderError> {
        let hits = |method: &HttpMethod, path: &str| {
            *method == request.method && request.url.ends_with(path)
        };
        let rejection = self
            .rejections
            .iter()
            .find(|(method, path, _)| hits(method, path.as_str()));

        let response = match (&self.failure, rejection) {
            (Some(message), _) => Err(ProviderError::Transport(message.clone())),
            (None, Some((_, _, status))) => Err(ProviderError::from_http_status(
                *status,
                format!("{} {}", request.method, request.url),
            )),
            (None, None) => Ok(self
                .routes
                .iter()
                .find(|(method, path, _)| hits(method, path.as_str()))
                .map(|(_, _, body)| body.clone())
                .unwrap_or_else(|| request.body.clone().unwrap_or_else(|| json!({})))),
        };

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        response
    }
}

/// A test harness around a [`RestProvider`] backed by a [`MockTransport`].
pub struct ProviderTester<C: ProviderCallback> {
    rest: RestProvider<C, Arc<MockTransport>>,
    transport: Arc<MockTransport>,
}

impl<C: ProviderCallback> ProviderTester<C> {
    /// Create a tester for `callback` using the static Xyz package.
    pub fn new(callback: C, metadata: ProviderMetadata, transport: MockTransport) -> Self {
        let transport = Arc::new(transport);
        let openapi = OpenApiDocument::from_value(json!({
            "openapi": "3.0.3",
            "servers": [{ "url": TEST_SERVER_URL }],
        }))
        .unwrap_or_else(|e| panic!("test OpenAPI document is invalid: {}", e));

        let rest = RestProvider::new(
            "xyz",
            "0.0.0-test",
            xyz_package(),
            metadata,
            openapi,
            Arc::new(callback),
            Arc::clone(&transport),
        );
        Self { rest, transport }
    }

    /// The underlying pipeline.
    pub fn rest(&self) -> &RestProvider<C, Arc<MockTransport>> {
        &self.rest
    }

    /// The callback under test.
    pub fn callback(&self) -> &C {
        self.rest.callback()
    }

    /// Requests sent so far.
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.transport.requests()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<OutboundRequest> {
        self.transport.requests().pop()
    }

    /// Configure with an explicit set of variables.
    pub async fn configure(
        &self,
        req: ConfigureRequest,
    ) -> Result<ConfigureResponse, ProviderError> {
        self.rest.configure(req).await
    }

    /// Configure with the given API key as an explicit configuration entry.
    pub async fn configure_api_key(
        &self,
        api_key: &str,
    ) -> Result<ConfigureResponse, ProviderError> {
        self.configure(ConfigureRequest::new().with_variable(API_KEY_CONFIG_KEY, api_key))
            .await
    }

    /// Create a resource.
    pub async fn create(&self, resource_type: &str, inputs: Value) -> Result<Value, ProviderError> {
        self.rest
            .create(ResourceRequest::new(resource_type, inputs))
            .await
    }

    /// Read a resource by id.
    pub async fn read(
        &self,
        resource_type: &str,
        id: &str,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.rest
            .read(
                ResourceRequest::new(resource_type, state.clone())
                    .with_id(id)
                    .with_state(state),
            )
            .await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        id: &str,
        prior_state: Value,
        inputs: Value,
    ) -> Result<Value, ProviderError> {
        self.rest
            .update(
                ResourceRequest::new(resource_type, inputs)
                    .with_id(id)
                    .with_state(prior_state),
            )
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        id: &str,
        state: Value,
    ) -> Result<Value, ProviderError> {
        self.rest
            .delete(
                ResourceRequest::new(resource_type, state.clone())
                    .with_id(id)
                    .with_state(state),
            )
            .await
    }

    /// Invoke a function.
    pub async fn invoke(&self, token: &str, args: Value) -> Result<Value, ProviderError> {
        self.rest.invoke(InvokeRequest::new(token, args)).await
    }

    /// Diff two states.
    pub async fn diff(
        &self,
        resource_type: &str,
        olds: Value,
        news: Value,
    ) -> Result<DiffResponse, ProviderError> {
        self.rest
            .diff(DiffRequest::new(resource_type, olds, news))
            .await
    }
}

// =========================================================================
// Assertion Helpers
// =========================================================================

/// Assert that a diff reports no changes.
///
/// # Panics
///
/// Panics if the diff has changes.
pub fn assert_diff_no_changes(diff: &DiffResponse) {
    assert!(
        !diff.has_changes(),
        "Expected no changes, but found {} change(s)",
        diff.changes.len()
    );
}

/// Assert that a diff requires replacing the resource because of `property`.
///
/// # Panics
///
/// Panics if `property` is not listed as a replacement reason.
pub fn assert_diff_replaces(diff: &DiffResponse, property: &str) {
    assert!(
        diff.replaces.iter().any(|p| p == property),
        "Expected replacement due to '{}', but replaces are {:?}",
        property,
        diff.replaces
    );
}

/// Assert that a request carried a header with the given value.
///
/// # Panics
///
/// Panics if the header is missing or has a different value.
pub fn assert_header(request: &OutboundRequest, name: &str, expected: &str) {
    assert_eq!(
        request.header(name),
        Some(expected),
        "Unexpected value for header '{}'",
        name
    );
}
