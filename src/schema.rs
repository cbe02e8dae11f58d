//! Package schema types.
//!
//! The package schema describes the provider's configuration surface, its
//! resources and functions, and the per-language hints consumed by SDK
//! generators. Resources and types are filled in by the schema generator
//! (see [`crate::generate`]); the rest is static and defined by [`xyz_package`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{API_KEY_PROPERTY, PROVIDER_NAME};

/// The type reference of a property.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeSpec {
    /// Primitive type name (`string`, `integer`, `boolean`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Reference to a complex type.
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl TypeSpec {
    /// A primitive type.
    pub fn primitive(name: impl Into<String>) -> Self {
        Self {
            type_name: Some(name.into()),
            reference: None,
        }
    }
}

/// Where a property's default value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefaultSpec {
    /// Environment variables consulted, in declared order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environment: Vec<String>,
}

/// Describes a single property.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySpec {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// The property type.
    #[serde(flatten)]
    pub type_spec: TypeSpec,
    /// Default value sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_info: Option<DefaultSpec>,
    /// Per-language overrides, keyed by language name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub language: BTreeMap<String, Value>,
    /// Whether the value must be treated as a secret.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub secret: bool,
}

impl PropertySpec {
    /// A string property.
    pub fn string() -> Self {
        Self {
            type_spec: TypeSpec::primitive("string"),
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Mark the property as secret.
    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Declare environment variables that supply the default value.
    pub fn with_env_default<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_info = Some(DefaultSpec {
            environment: names.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add a language-specific override.
    pub fn with_language(mut self, language: impl Into<String>, value: Value) -> Self {
        self.language.insert(language.into(), value);
        self
    }

    /// The declared environment fallbacks, empty if none.
    pub fn env_fallbacks(&self) -> &[String] {
        self.default_info
            .as_ref()
            .map(|info| info.environment.as_slice())
            .unwrap_or_default()
    }
}

/// An object type: a description plus its properties.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectTypeSpec {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Always `object` for resources.
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub type_name: String,
    /// Output properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, PropertySpec>,
    /// Names of always-present output properties.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

/// Describes a resource, or the provider resource itself.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// The output shape.
    #[serde(flatten)]
    pub object: ObjectTypeSpec,
    /// Input properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub input_properties: BTreeMap<String, PropertySpec>,
    /// Names of required inputs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_inputs: Vec<String>,
}

impl ResourceSpec {
    /// Create an object resource with a description.
    pub fn object(description: impl Into<String>) -> Self {
        Self {
            object: ObjectTypeSpec {
                description: description.into(),
                type_name: "object".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Add an input property.
    pub fn with_input(mut self, name: impl Into<String>, property: PropertySpec) -> Self {
        self.input_properties.insert(name.into(), property);
        self
    }
}

/// Provider configuration variables.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigSpec {
    /// Configuration variables by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, PropertySpec>,
}

/// The full package schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    /// Package name.
    pub name: String,
    /// Human-readable display name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,
    /// Package description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Search keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Homepage URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub homepage: String,
    /// SPDX license identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub license: String,
    /// Publisher name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,
    /// Source repository URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,
    /// Where the plugin binary is downloaded from.
    #[serde(rename = "pluginDownloadURL", default, skip_serializing_if = "String::is_empty")]
    pub plugin_download_url: String,
    /// Provider configuration variables.
    #[serde(default)]
    pub config: ConfigSpec,
    /// The provider resource.
    #[serde(default)]
    pub provider: ResourceSpec,
    /// Resources by token.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceSpec>,
    /// Complex types by token, kept opaque.
    #[serde(default)]
    pub types: BTreeMap<String, Value>,
    /// Functions by token, kept opaque.
    #[serde(default)]
    pub functions: BTreeMap<String, Value>,
    /// Per-language package settings.
    #[serde(default)]
    pub language: BTreeMap<String, Value>,
}

impl PackageSpec {
    /// Parse a package schema from its embedded JSON form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, crate::ProviderError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Environment variables that may supply the API key, in declared order.
    pub fn api_key_env_vars(&self) -> Vec<String> {
        self.provider
            .input_properties
            .get(API_KEY_PROPERTY)
            .map(|p| p.env_fallbacks().to_vec())
            .unwrap_or_default()
    }
}

/// Build the static Xyz package definition.
///
/// Resources, types and functions are left empty for the schema generator.
pub fn xyz_package() -> PackageSpec {
    let csharp_name = || json!({ "name": "ApiKey" });

    PackageSpec {
        name: PROVIDER_NAME.to_string(),
        display_name: "Xyz".to_string(),
        description: "A Pulumi package for creating and managing Xyz resources.".to_string(),
        keywords: vec![
            "pulumi".to_string(),
            PROVIDER_NAME.to_string(),
            "category/cloud".to_string(),
            "kind/native".to_string(),
        ],
        homepage: "https://cloudysky.software".to_string(),
        license: "Apache-2.0".to_string(),
        publisher: "Cloudy Sky Software".to_string(),
        repository: "https://github.com/cloudy-sky-software/pulumi-xyz".to_string(),
        plugin_download_url: "github://api.github.com/cloudy-sky-software/pulumi-xyz".to_string(),
        config: ConfigSpec {
            variables: BTreeMap::from([(
                API_KEY_PROPERTY.to_string(),
                PropertySpec::string()
                    .with_description("The API key")
                    .with_language("csharp", csharp_name())
                    .secret(),
            )]),
        },
        provider: ResourceSpec::object("The provider type for the Xyz package.").with_input(
            API_KEY_PROPERTY,
            PropertySpec::string()
                .with_description("The Xyz API key.")
                .with_env_default(["XYZ_APIKEY"])
                .with_language("csharp", csharp_name())
                .secret(),
        ),
        resources: BTreeMap::new(),
        types: BTreeMap::new(),
        functions: BTreeMap::new(),
        language: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xyz_package_metadata() {
        let pkg = xyz_package();
        assert_eq!(pkg.name, "xyz");
        assert_eq!(pkg.display_name, "Xyz");
        assert_eq!(pkg.license, "Apache-2.0");
        assert_eq!(
            pkg.keywords,
            vec!["pulumi", "xyz", "category/cloud", "kind/native"]
        );
        assert!(pkg.resources.is_empty());
        assert!(pkg.language.is_empty());
    }

    #[test]
    fn test_api_key_is_secret_everywhere() {
        let pkg = xyz_package();

        let config = &pkg.config.variables["apiKey"];
        assert!(config.secret);
        assert_eq!(config.type_spec.type_name.as_deref(), Some("string"));
        assert_eq!(config.language["csharp"], json!({"name": "ApiKey"}));

        let input = &pkg.provider.input_properties["apiKey"];
        assert!(input.secret);
        assert_eq!(input.description, "The Xyz API key.");
    }

    #[test]
    fn test_api_key_env_vars() {
        assert_eq!(xyz_package().api_key_env_vars(), vec!["XYZ_APIKEY"]);

        let mut pkg = xyz_package();
        pkg.provider.input_properties.clear();
        assert!(pkg.api_key_env_vars().is_empty());

        let pkg = PackageSpec {
            provider: ResourceSpec::object("p").with_input(
                "apiKey",
                PropertySpec::string().with_env_default(["XYZ_APIKEY", "XYZ_API_KEY"]),
            ),
            ..Default::default()
        };
        assert_eq!(pkg.api_key_env_vars(), vec!["XYZ_APIKEY", "XYZ_API_KEY"]);
    }

    #[test]
    fn test_package_json_shape() {
        let value = serde_json::to_value(xyz_package()).unwrap();

        assert_eq!(
            value["pluginDownloadURL"],
            "github://api.github.com/cloudy-sky-software/pulumi-xyz"
        );
        assert_eq!(value["displayName"], "Xyz");
        assert_eq!(value["provider"]["type"], "object");
        assert_eq!(
            value["provider"]["inputProperties"]["apiKey"]["defaultInfo"]["environment"],
            json!(["XYZ_APIKEY"])
        );
        assert_eq!(value["config"]["variables"]["apiKey"]["type"], "string");
        assert_eq!(value["config"]["variables"]["apiKey"]["secret"], true);
    }

    #[test]
    fn test_package_parses_back() {
        let bytes = serde_json::to_vec(&xyz_package()).unwrap();
        let parsed = PackageSpec::from_slice(&bytes).unwrap();
        assert_eq!(parsed, xyz_package());
    }
}
