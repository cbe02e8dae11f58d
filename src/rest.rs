//! The REST request pipeline.
//!
//! [`RestProvider`] turns a resource operation into an outbound request,
//! gives the callback a chance to adjust it, sends it through a
//! [`Transport`] and hands the decoded response to the matching post hook.
//! Hooks for one operation always run in order: pre hook, send, post hook.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, instrument};

use crate::callback::{
    ConfigureRequest, ConfigureResponse, DiffRequest, HttpMethod, InvokeRequest, OutboundRequest,
    ProviderCallback, ResourceRequest,
};
use crate::error::ProviderError;
use crate::generate::OpenApiDocument;
use crate::schema::PackageSpec;
use crate::types::{CrudOperations, DiffResponse, ObjectDiff, ProviderMetadata};

/// Sends outbound requests and decodes their JSON responses.
///
/// Implemented by the HTTP client of the host framework. A non-success
/// response is reported through [`ProviderError::from_http_status`], so a
/// missing object reads as `NotFound` and a rejected key as
/// `PermissionDenied`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and return the decoded response body.
    async fn send(&self, request: OutboundRequest) -> Result<Value, ProviderError>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: OutboundRequest) -> Result<Value, ProviderError> {
        (**self).send(request).await
    }
}

/// A resource lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create a resource.
    Create,
    /// Read a resource.
    Read,
    /// Update a resource.
    Update,
    /// Delete a resource.
    Delete,
}

impl Operation {
    fn method(self) -> HttpMethod {
        match self {
            Operation::Create => HttpMethod::Post,
            Operation::Read => HttpMethod::Get,
            Operation::Update => HttpMethod::Patch,
            Operation::Delete => HttpMethod::Delete,
        }
    }

    fn endpoint(self, operations: &CrudOperations) -> Option<&str> {
        match self {
            Operation::Create => operations.create.as_deref(),
            Operation::Read => operations.read.as_deref(),
            Operation::Update => operations.update.as_deref(),
            Operation::Delete => operations.delete.as_deref(),
        }
    }

    fn sends_body(self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }

    fn name(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

/// Drives lifecycle hooks around REST calls for one provider.
pub struct RestProvider<C, T> {
    name: String,
    version: String,
    schema: PackageSpec,
    metadata: ProviderMetadata,
    openapi: OpenApiDocument,
    callback: Arc<C>,
    transport: T,
}

impl<C: ProviderCallback, T: Transport> RestProvider<C, T> {
    /// Create a pipeline.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        schema: PackageSpec,
        metadata: ProviderMetadata,
        openapi: OpenApiDocument,
        callback: Arc<C>,
        transport: T,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            schema,
            metadata,
            openapi,
            callback,
            transport,
        }
    }

    /// The provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provider version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The package schema the provider serves.
    pub fn schema(&self) -> &PackageSpec {
        &self.schema
    }

    /// The generation metadata.
    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// The OpenAPI document.
    pub fn openapi(&self) -> &OpenApiDocument {
        &self.openapi
    }

    /// The registered callback.
    pub fn callback(&self) -> &Arc<C> {
        &self.callback
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Configure the provider.
    #[instrument(skip(self, req), name = "rest.configure")]
    pub async fn configure(
        &self,
        req: ConfigureRequest,
    ) -> Result<ConfigureResponse, ProviderError> {
        debug!(variables = req.variables.len(), "Configure called");
        match self.callback.on_configure(&req).await {
            Ok(response) => {
                info!(
                    accept_secrets = response.accept_secrets,
                    "Configure completed successfully"
                );
                Ok(response)
            }
            Err(e) => {
                error!(error = %e, "Configure failed");
                Err(e)
            }
        }
    }

    /// Create a resource and return its recorded state.
    pub async fn create(&self, req: ResourceRequest) -> Result<Value, ProviderError> {
        self.execute(Operation::Create, req).await
    }

    /// Read a resource and return its recorded state.
    pub async fn read(&self, req: ResourceRequest) -> Result<Value, ProviderError> {
        self.execute(Operation::Read, req).await
    }

    /// Update a resource and return its recorded state.
    pub async fn update(&self, req: ResourceRequest) -> Result<Value, ProviderError> {
        self.execute(Operation::Update, req).await
    }

    /// Delete a resource and return the post-delete hook's output.
    pub async fn delete(&self, req: ResourceRequest) -> Result<Value, ProviderError> {
        self.execute(Operation::Delete, req).await
    }

    /// Invoke a function.
    ///
    /// Functions are read-only lookups served by the read endpoint registered
    /// for their token; arguments fill the path parameters.
    #[instrument(skip(self, req), fields(token = %req.token), name = "rest.invoke")]
    pub async fn invoke(&self, req: InvokeRequest) -> Result<Value, ProviderError> {
        let path = self
            .metadata
            .resource_crud_map
            .get(&req.token)
            .ok_or_else(|| ProviderError::UnknownResource(req.token.clone()))?
            .read
            .as_deref()
            .ok_or_else(|| {
                ProviderError::Unimplemented(format!("{} has no read endpoint", req.token))
            })?;

        let path = self.expand_path(path, &req.args, None)?;
        let mut http = OutboundRequest::new(HttpMethod::Get, self.url_for(&path));
        http.set_header("Authorization", self.callback.get_authorization_header()?);

        self.callback.on_pre_invoke(&req, &mut http).await?;
        debug!(method = %http.method, url = %http.url, "Sending request");
        let response = self.transport.send(http).await?;
        let outputs = self.callback.on_post_invoke(&req, response).await?;

        info!("Invoke completed successfully");
        Ok(outputs)
    }

    /// Diff two desired states.
    ///
    /// The diff hook may replace the computed response.
    #[instrument(skip(self, req), fields(resource_type = %req.resource_type), name = "rest.diff")]
    pub async fn diff(&self, req: DiffRequest) -> Result<DiffResponse, ProviderError> {
        let diff = ObjectDiff::between(&req.olds, &req.news);
        debug!(changes = diff.changes.len(), "Computed diff");

        let response = match self.callback.on_diff(&req, &diff).await? {
            Some(custom) => {
                debug!("Diff hook overrode computed diff");
                custom
            }
            None => DiffResponse::from_diff(&diff),
        };

        info!(
            changes = response.changes.len(),
            replaces = response.replaces.len(),
            "Diff completed"
        );
        Ok(response)
    }

    #[instrument(
        skip(self, req),
        fields(operation = op.name(), resource_type = %req.resource_type),
        name = "rest.resource"
    )]
    async fn execute(&self, op: Operation, req: ResourceRequest) -> Result<Value, ProviderError> {
        let operations = self
            .metadata
            .resource_crud_map
            .get(&req.resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(req.resource_type.clone()))?;
        let path = op.endpoint(operations).ok_or_else(|| {
            ProviderError::Unimplemented(format!(
                "{} does not support {}",
                req.resource_type,
                op.name()
            ))
        })?;

        let path = self.expand_path(path, &req.inputs, req.id.as_deref())?;
        let mut http = OutboundRequest::new(op.method(), self.url_for(&path));
        if op.sends_body() {
            http.body = Some(req.inputs.clone());
        }
        http.set_header("Authorization", self.callback.get_authorization_header()?);

        match op {
            Operation::Create => self.callback.on_pre_create(&req, &mut http).await?,
            Operation::Read => self.callback.on_pre_read(&req, &mut http).await?,
            Operation::Update => self.callback.on_pre_update(&req, &mut http).await?,
            Operation::Delete => self.callback.on_pre_delete(&req, &mut http).await?,
        }

        debug!(method = %http.method, url = %http.url, "Sending request");
        let response = self.transport.send(http).await.map_err(|e| {
            error!(error = %e, "Request failed");
            e
        })?;

        let outputs = match op {
            Operation::Create => self.callback.on_post_create(&req, response).await?,
            Operation::Read => self.callback.on_post_read(&req, response).await?,
            Operation::Update => self.callback.on_post_update(&req, response).await?,
            Operation::Delete => self.callback.on_post_delete(&req, response).await?,
        };

        info!("Operation completed successfully");
        Ok(outputs)
    }

    /// Substitute `{param}` segments of `template`.
    ///
    /// Each parameter is looked up in `values` under the SDK name mapped
    /// through the path-param map (or the parameter's own name); if absent,
    /// the resource id is used. Values are percent-encoded as a single path
    /// segment.
    fn expand_path(
        &self,
        template: &str,
        values: &Value,
        id: Option<&str>,
    ) -> Result<String, ProviderError> {
        let mut path = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            let end = rest[start..].find('}').map(|i| start + i).ok_or_else(|| {
                ProviderError::Validation(format!("unterminated path parameter in {}", template))
            })?;
            let param = &rest[start + 1..end];
            let property = self
                .metadata
                .path_param_name_map
                .get(param)
                .map(String::as_str)
                .unwrap_or(param);

            let value = match values.get(property) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                _ => id.map(str::to_string).ok_or_else(|| {
                    ProviderError::InvalidRequest(format!(
                        "missing value for path parameter {}",
                        param
                    ))
                })?,
            };

            if value == "." || value == ".." {
                return Err(ProviderError::InvalidRequest(format!(
                    "invalid value for path parameter {}: {}",
                    param, value
                )));
            }

            path.push_str(&rest[..start]);
            path.push_str(&urlencoding::encode(&value));
            rest = &rest[end + 1..];
        }
        path.push_str(rest);

        Ok(path)
    }

    fn url_for(&self, path: &str) -> String {
        match self.openapi.server_url() {
            Some(base) => format!("{}{}", base, path),
            None => path.to_string(),
        }
    }
}
