//! Schema assembly.
//!
//! Turning the OpenAPI document into resources is the job of an external
//! generator, reached through [`ResourceGatherer`]. This module owns the
//! steps around it: the static package definition, resource examples and the
//! per-language SDK settings.
//!
//! # Example
//!
//! ```ignore
//! use xyz_provider::generate::{pulumi_schema, OpenApiDocument};
//!
//! let doc = OpenApiDocument::from_slice(include_bytes!("openapi.yml"))?;
//! let generated = pulumi_schema(&doc, &MyGatherer, &Default::default())?;
//! std::fs::write("schema.json", generated.schema_json()?)?;
//! std::fs::write("metadata.json", generated.metadata_json()?)?;
//! ```

use std::collections::BTreeMap;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::ProviderError;
use crate::schema::{xyz_package, PackageSpec};
use crate::types::{ProviderMetadata, PROVIDER_NAME};

/// A parsed OpenAPI document.
///
/// The document is kept as an untyped tree; only the handful of fields the
/// provider itself needs are exposed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenApiDocument {
    root: Value,
}

impl OpenApiDocument {
    /// Parse a JSON or YAML document.
    ///
    /// Fails if the document has no `openapi` version field.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ProviderError> {
        let root: Value = serde_yaml::from_slice(bytes)?;
        Self::from_value(root)
    }

    /// Wrap an already-parsed document.
    pub fn from_value(root: Value) -> Result<Self, ProviderError> {
        if root.get("openapi").and_then(Value::as_str).is_none() {
            return Err(ProviderError::Validation(
                "OpenAPI document is missing the `openapi` version field".to_string(),
            ));
        }
        Ok(Self { root })
    }

    /// The OpenAPI version, e.g. `3.0.3`.
    pub fn openapi_version(&self) -> &str {
        self.root["openapi"].as_str().unwrap_or_default()
    }

    /// The API title.
    pub fn title(&self) -> Option<&str> {
        self.root.pointer("/info/title").and_then(Value::as_str)
    }

    /// The first server URL, without a trailing slash.
    pub fn server_url(&self) -> Option<&str> {
        self.root
            .pointer("/servers/0/url")
            .and_then(Value::as_str)
            .map(|url| url.trim_end_matches('/'))
    }

    /// Number of paths the document declares.
    pub fn path_count(&self) -> usize {
        self.root
            .get("paths")
            .and_then(Value::as_object)
            .map_or(0, |paths| paths.len())
    }

    /// The underlying document tree.
    pub fn as_value(&self) -> &Value {
        &self.root
    }
}

/// The external OpenAPI → schema generator.
pub trait ResourceGatherer {
    /// Add resources and types for `doc` to `pkg`.
    ///
    /// Returns the generation metadata and the (possibly rewritten) document
    /// the provider should serve with.
    fn gather_resources(
        &self,
        doc: &OpenApiDocument,
        pkg: &mut PackageSpec,
        csharp_namespaces: &BTreeMap<String, String>,
    ) -> Result<(ProviderMetadata, OpenApiDocument), ProviderError>;
}

/// The output of schema assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedSchema {
    /// The complete package schema.
    pub package: PackageSpec,
    /// Generation metadata for the REST pipeline.
    pub metadata: ProviderMetadata,
    /// The document to embed in the provider binary.
    pub openapi: OpenApiDocument,
}

impl GeneratedSchema {
    /// The package schema as pretty-printed JSON.
    pub fn schema_json(&self) -> Result<String, ProviderError> {
        Ok(serde_json::to_string_pretty(&self.package)?)
    }

    /// The generation metadata as pretty-printed JSON.
    pub fn metadata_json(&self) -> Result<String, ProviderError> {
        Ok(serde_json::to_string_pretty(&self.metadata)?)
    }
}

/// C# namespace for each module of the package.
pub fn csharp_namespaces() -> BTreeMap<String, String> {
    BTreeMap::from([
        (PROVIDER_NAME.to_string(), "XYZ".to_string()),
        (String::new(), "Provider".to_string()),
    ])
}

/// Assemble the full package schema for `doc`.
///
/// `examples` maps resource tokens to example snippets that are appended to
/// the matching resource descriptions; unknown tokens are ignored.
pub fn pulumi_schema<G>(
    doc: &OpenApiDocument,
    gatherer: &G,
    examples: &BTreeMap<String, String>,
) -> Result<GeneratedSchema, ProviderError>
where
    G: ResourceGatherer + ?Sized,
{
    let mut pkg = xyz_package();
    let namespaces = csharp_namespaces();

    let (metadata, openapi) = gatherer.gather_resources(doc, &mut pkg, &namespaces)?;
    info!(
        resources = pkg.resources.len(),
        types = pkg.types.len(),
        "Gathered resources from OpenAPI document"
    );

    for (token, example) in examples {
        if let Some(resource) = pkg.resources.get_mut(token) {
            debug!(resource = %token, "Attaching example");
            resource.object.description.push_str("\n\n");
            resource.object.description.push_str(example);
        }
    }

    set_language_sections(&mut pkg, &namespaces);

    Ok(GeneratedSchema {
        package: pkg,
        metadata,
        openapi,
    })
}

fn set_language_sections(pkg: &mut PackageSpec, namespaces: &BTreeMap<String, String>) {
    pkg.language.insert(
        "csharp".to_string(),
        json!({
            "rootNamespace": "Pulumi",
            "packageReferences": { "Pulumi": "3.*" },
            "namespaces": namespaces,
        }),
    );
    pkg.language.insert(
        "go".to_string(),
        json!({
            "importBasePath": "github.com/cloudy-sky-software/pulumi-xyz/sdk/go/xyz",
        }),
    );
    pkg.language.insert(
        "nodejs".to_string(),
        json!({
            "packageName": "@cloudyskysoftware/pulumi-xyz",
        }),
    );
    pkg.language.insert(
        "python".to_string(),
        json!({
            "packageName": "pulumi_x_y_z",
            "requires": { "pulumi": ">=3.0.0,<4.0.0" },
            "pyproject": { "enabled": true },
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResourceSpec;
    use crate::types::CrudOperations;

    const DOC: &str = r#"
openapi: 3.0.3
info:
  title: Xyz API
  version: "1.0"
servers:
  - url: https://api.xyz.test/v1/
paths:
  /widgets:
    post: {}
  /widgets/{widgetId}:
    get: {}
"#;

    struct WidgetGatherer;

    impl ResourceGatherer for WidgetGatherer {
        fn gather_resources(
            &self,
            doc: &OpenApiDocument,
            pkg: &mut PackageSpec,
            csharp_namespaces: &BTreeMap<String, String>,
        ) -> Result<(ProviderMetadata, OpenApiDocument), ProviderError> {
            assert_eq!(csharp_namespaces["xyz"], "XYZ");
            pkg.resources.insert(
                "xyz:index:Widget".to_string(),
                ResourceSpec::object("A widget."),
            );
            let metadata = ProviderMetadata::default().with_resource(
                "xyz:index:Widget",
                CrudOperations {
                    create: Some("/widgets".to_string()),
                    read: Some("/widgets/{widgetId}".to_string()),
                    ..Default::default()
                },
            );
            Ok((metadata, doc.clone()))
        }
    }

    struct FailingGatherer;

    impl ResourceGatherer for FailingGatherer {
        fn gather_resources(
            &self,
            _doc: &OpenApiDocument,
            _pkg: &mut PackageSpec,
            _csharp_namespaces: &BTreeMap<String, String>,
        ) -> Result<(ProviderMetadata, OpenApiDocument), ProviderError> {
            Err(ProviderError::Validation("unsupported request body".to_string()))
        }
    }

    #[test]
    fn test_openapi_document_yaml() {
        let doc = OpenApiDocument::from_slice(DOC.as_bytes()).unwrap();
        assert_eq!(doc.openapi_version(), "3.0.3");
        assert_eq!(doc.title(), Some("Xyz API"));
        assert_eq!(doc.server_url(), Some("https://api.xyz.test/v1"));
        assert_eq!(doc.path_count(), 2);
    }

    #[test]
    fn test_openapi_document_json() {
        let doc = OpenApiDocument::from_slice(br#"{"openapi": "3.1.0", "paths": {}}"#).unwrap();
        assert_eq!(doc.openapi_version(), "3.1.0");
        assert_eq!(doc.server_url(), None);
        assert_eq!(doc.path_count(), 0);
    }

    #[test]
    fn test_openapi_document_requires_version() {
        let err = OpenApiDocument::from_slice(b"info: {title: x}").unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));

        let err = OpenApiDocument::from_slice(b"paths: [").unwrap_err();
        assert!(matches!(err, ProviderError::Document(_)));
    }

    #[test]
    fn test_pulumi_schema_attaches_examples() {
        let doc = OpenApiDocument::from_slice(DOC.as_bytes()).unwrap();
        let examples = BTreeMap::from([
            ("xyz:index:Widget".to_string(), "## Example".to_string()),
            ("xyz:index:Missing".to_string(), "ignored".to_string()),
        ]);

        let generated = pulumi_schema(&doc, &WidgetGatherer, &examples).unwrap();
        let widget = &generated.package.resources["xyz:index:Widget"];
        assert_eq!(widget.object.description, "A widget.\n\n## Example");
        assert!(!generated.package.resources.contains_key("xyz:index:Missing"));
        assert!(generated
            .metadata
            .resource_crud_map
            .contains_key("xyz:index:Widget"));
    }

    #[test]
    fn test_pulumi_schema_language_sections() {
        let doc = OpenApiDocument::from_slice(DOC.as_bytes()).unwrap();
        let generated = pulumi_schema(&doc, &WidgetGatherer, &BTreeMap::new()).unwrap();
        let language = &generated.package.language;

        assert_eq!(language["csharp"]["rootNamespace"], "Pulumi");
        assert_eq!(language["csharp"]["packageReferences"]["Pulumi"], "3.*");
        assert_eq!(language["csharp"]["namespaces"]["xyz"], "XYZ");
        assert_eq!(language["csharp"]["namespaces"][""], "Provider");
        assert_eq!(
            language["go"]["importBasePath"],
            "github.com/cloudy-sky-software/pulumi-xyz/sdk/go/xyz"
        );
        assert_eq!(
            language["nodejs"]["packageName"],
            "@cloudyskysoftware/pulumi-xyz"
        );
        assert_eq!(language["python"]["packageName"], "pulumi_x_y_z");
        assert_eq!(language["python"]["requires"]["pulumi"], ">=3.0.0,<4.0.0");
        assert_eq!(language["python"]["pyproject"]["enabled"], true);
    }

    #[test]
    fn test_pulumi_schema_propagates_gatherer_errors() {
        let doc = OpenApiDocument::from_slice(DOC.as_bytes()).unwrap();
        let err = pulumi_schema(&doc, &FailingGatherer, &BTreeMap::new()).unwrap_err();
        assert_eq!(err.message(), "unsupported request body");
    }

    #[test]
    fn test_generated_artifacts_parse_back() {
        let doc = OpenApiDocument::from_slice(DOC.as_bytes()).unwrap();
        let generated = pulumi_schema(&doc, &WidgetGatherer, &BTreeMap::new()).unwrap();

        let schema = PackageSpec::from_slice(generated.schema_json().unwrap().as_bytes()).unwrap();
        assert_eq!(schema, generated.package);

        let metadata =
            ProviderMetadata::from_slice(generated.metadata_json().unwrap().as_bytes()).unwrap();
        assert_eq!(metadata, generated.metadata);
    }
}
