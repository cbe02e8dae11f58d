//! Convenience types shared by the callback surface and the REST pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The provider's package name.
pub const PROVIDER_NAME: &str = "xyz";

/// The name of the API-key property in the package schema.
pub const API_KEY_PROPERTY: &str = "apiKey";

/// The namespaced configuration key the host uses for the API key.
pub const API_KEY_CONFIG_KEY: &str = "xyz:config:apiKey";

/// The scheme prefix of the `Authorization` header.
pub const AUTH_SCHEME_PREFIX: &str = "Bearer";

/// A change to a single top-level property between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The property that changed.
    pub path: String,
    /// The value before the change (None if added).
    pub before: Option<Value>,
    /// The value after the change (None if removed).
    pub after: Option<Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(path: impl Into<String>, before: Option<Value>, after: Option<Value>) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new property.
    pub fn added(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed property.
    pub fn removed(path: impl Into<String>, value: Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified property.
    pub fn modified(path: impl Into<String>, before: Value, after: Value) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The structural diff between an old and a new desired state.
///
/// Only top-level properties are compared; nested objects that differ are
/// reported as a single modified property.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectDiff {
    /// Changed properties, ordered by name.
    pub changes: Vec<AttributeChange>,
}

impl ObjectDiff {
    /// Compute the diff between two states.
    ///
    /// Non-object values are treated as empty objects.
    pub fn between(olds: &Value, news: &Value) -> Self {
        let empty = serde_json::Map::new();
        let olds = olds.as_object().unwrap_or(&empty);
        let news = news.as_object().unwrap_or(&empty);

        let mut keys: Vec<&String> = olds.keys().chain(news.keys()).collect();
        keys.sort();
        keys.dedup();

        let changes = keys
            .into_iter()
            .filter_map(|key| match (olds.get(key), news.get(key)) {
                (Some(before), Some(after)) if before != after => Some(AttributeChange::modified(
                    key.as_str(),
                    before.clone(),
                    after.clone(),
                )),
                (Some(before), None) => {
                    Some(AttributeChange::removed(key.as_str(), before.clone()))
                }
                (None, Some(after)) => Some(AttributeChange::added(key.as_str(), after.clone())),
                _ => None,
            })
            .collect();

        Self { changes }
    }

    /// Whether the two states are identical.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Names of the changed properties.
    pub fn changed_keys(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.path.as_str()).collect()
    }
}

/// The result of a diff, either computed or overridden by the diff hook.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffResponse {
    /// The property changes.
    pub changes: Vec<AttributeChange>,
    /// Properties whose change requires replacing the resource.
    pub replaces: Vec<String>,
    /// Whether the old resource must be deleted before its replacement is created.
    pub delete_before_replace: bool,
}

impl DiffResponse {
    /// Build the default response for a computed diff (update in place).
    pub fn from_diff(diff: &ObjectDiff) -> Self {
        Self {
            changes: diff.changes.clone(),
            replaces: Vec::new(),
            delete_before_replace: false,
        }
    }

    /// Mark a property as requiring replacement.
    pub fn with_replace(mut self, property: impl Into<String>) -> Self {
        self.replaces.push(property.into());
        self
    }

    /// Request delete-before-replace semantics.
    pub fn with_delete_before_replace(mut self) -> Self {
        self.delete_before_replace = true;
        self
    }

    /// Whether any property changed.
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Whether the resource must be replaced.
    pub fn requires_replace(&self) -> bool {
        !self.replaces.is_empty()
    }
}

/// The REST endpoints backing one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CrudOperations {
    /// Path of the create endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    /// Path of the read endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<String>,
    /// Path of the update endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<String>,
    /// Path of the delete endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete: Option<String>,
}

/// Metadata produced alongside the package schema by the schema generator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Resource (or function) token to its REST endpoints.
    #[serde(default)]
    pub resource_crud_map: BTreeMap<String, CrudOperations>,
    /// Resource token to the property that is auto-named.
    #[serde(default)]
    pub auto_name_map: BTreeMap<String, String>,
    /// SDK property name to API property name.
    #[serde(default)]
    pub sdk_to_api_name_map: BTreeMap<String, String>,
    /// API property name to SDK property name.
    #[serde(default)]
    pub api_to_sdk_name_map: BTreeMap<String, String>,
    /// Path parameter name to the SDK property that supplies it.
    #[serde(default)]
    pub path_param_name_map: BTreeMap<String, String>,
}

impl ProviderMetadata {
    /// Parse metadata from its embedded JSON form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, crate::ProviderError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Register the endpoints for a resource token.
    pub fn with_resource(mut self, token: impl Into<String>, operations: CrudOperations) -> Self {
        self.resource_crud_map.insert(token.into(), operations);
        self
    }

    /// Register a path parameter mapping.
    pub fn with_path_param(
        mut self,
        param: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        self.path_param_name_map.insert(param.into(), property.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_change_constructors() {
        let added = AttributeChange::added("name", json!("test"));
        assert!(added.before.is_none());
        assert_eq!(added.after, Some(json!("test")));

        let removed = AttributeChange::removed("name", json!("old"));
        assert_eq!(removed.before, Some(json!("old")));
        assert!(removed.after.is_none());

        let modified = AttributeChange::modified("count", json!(1), json!(2));
        assert_eq!(modified.before, Some(json!(1)));
        assert_eq!(modified.after, Some(json!(2)));
    }

    #[test]
    fn test_object_diff_between() {
        let olds = json!({"name": "a", "size": 1, "region": "eu"});
        let news = json!({"name": "b", "size": 1, "tier": "pro"});

        let diff = ObjectDiff::between(&olds, &news);
        assert_eq!(diff.changed_keys(), vec!["name", "region", "tier"]);
        assert_eq!(diff.changes[0], AttributeChange::modified("name", json!("a"), json!("b")));
        assert_eq!(diff.changes[1], AttributeChange::removed("region", json!("eu")));
        assert_eq!(diff.changes[2], AttributeChange::added("tier", json!("pro")));
    }

    #[test]
    fn test_object_diff_identical_and_non_objects() {
        let state = json!({"name": "a"});
        assert!(ObjectDiff::between(&state, &state).is_empty());
        assert!(ObjectDiff::between(&Value::Null, &json!([])).is_empty());

        let diff = ObjectDiff::between(&Value::Null, &state);
        assert_eq!(diff.changed_keys(), vec!["name"]);
    }

    #[test]
    fn test_diff_response() {
        let diff = ObjectDiff::between(&json!({"region": "eu"}), &json!({"region": "us"}));
        let response = DiffResponse::from_diff(&diff);
        assert!(response.has_changes());
        assert!(!response.requires_replace());

        let response = response.with_replace("region").with_delete_before_replace();
        assert!(response.requires_replace());
        assert!(response.delete_before_replace);
    }

    #[test]
    fn test_metadata_from_slice() {
        let bytes = br#"{
            "resourceCrudMap": {
                "xyz:index:Widget": {"create": "/widgets", "read": "/widgets/{widgetId}"}
            },
            "pathParamNameMap": {"widgetId": "id"}
        }"#;

        let metadata = ProviderMetadata::from_slice(bytes).unwrap();
        let widget = &metadata.resource_crud_map["xyz:index:Widget"];
        assert_eq!(widget.create.as_deref(), Some("/widgets"));
        assert!(widget.delete.is_none());
        assert_eq!(metadata.path_param_name_map["widgetId"], "id");
        assert!(metadata.auto_name_map.is_empty());
    }

    #[test]
    fn test_constants() {
        assert_eq!(API_KEY_CONFIG_KEY, format!("{}:config:{}", PROVIDER_NAME, API_KEY_PROPERTY));
        assert_eq!(AUTH_SCHEME_PREFIX, "Bearer");
    }
}
