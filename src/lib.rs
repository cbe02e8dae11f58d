//! Xyz Provider
//!
//! This crate is the glue between an infrastructure-as-code engine and the
//! Xyz REST API. The heavy lifting (RPC transport, OpenAPI → schema mapping,
//! HTTP) lives in the host framework; this crate supplies the pieces that are
//! specific to Xyz.
//!
//! # Overview
//!
//! - **Package schema**: the static package definition, configuration surface
//!   and SDK language settings ([`schema`], [`generate`])
//! - **Credential resolution**: the API key from configuration or the
//!   schema-declared environment variables ([`credentials`])
//! - **ProviderCallback trait**: lifecycle hooks with pass-through defaults
//!   ([`callback`]), implemented by [`XyzProvider`]
//! - **REST pipeline**: runs the hooks around every outbound request ([`rest`])
//! - **Serve helpers**: load embedded artifacts and hand the provider to the
//!   host ([`server`])
//! - **Logging**: `tracing` setup on stderr ([`logging`])
//!
//! # Quick Start
//!
//! ```ignore
//! use xyz_provider::{init_logging, serve};
//!
//! static SCHEMA: &[u8] = include_bytes!("schema.json");
//! static OPENAPI: &[u8] = include_bytes!("openapi_generated.yml");
//! static METADATA: &[u8] = include_bytes!("metadata.json");
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!     let version = env!("CARGO_PKG_VERSION");
//!     serve("xyz", version, SCHEMA, OPENAPI, METADATA, HttpClient::new(), Host::new()).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration
//!
//! The API key is read from the `xyz:config:apiKey` configuration entry. If
//! the entry is absent, the environment variables listed under
//! `provider.inputProperties.apiKey.defaultInfo.environment` in the schema
//! (`XYZ_APIKEY`) are consulted. Every outbound request then carries
//! `Authorization: Bearer <key>`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callback;
pub mod credentials;
pub mod error;
pub mod generate;
pub mod logging;
pub mod provider;
pub mod rest;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;

// Re-export main types at crate root
pub use callback::{
    ConfigureRequest, ConfigureResponse, DiffRequest, HttpMethod, InvokeRequest, OutboundRequest,
    ProviderCallback, ResourceRequest,
};
pub use credentials::{authorization_header, resolve_api_key, ApiKey, CredentialSource};
pub use error::ProviderError;
pub use generate::{pulumi_schema, GeneratedSchema, OpenApiDocument, ResourceGatherer};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::XyzProvider;
pub use rest::{RestProvider, Transport};
pub use schema::{xyz_package, PackageSpec};
pub use server::{
    make_provider, serve, serve_until, serve_with_options, ProviderHost, ServeOptions,
    ShutdownSignal,
};
pub use types::{
    AttributeChange, CrudOperations, DiffResponse, ObjectDiff, ProviderMetadata,
    API_KEY_CONFIG_KEY, AUTH_SCHEME_PREFIX, PROVIDER_NAME,
};

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
