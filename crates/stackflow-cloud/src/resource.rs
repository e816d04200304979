//! Nodes of the resource graph

use crate::intrinsic::collect_references;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// A resource declared by this stack
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Logical id (key in the template's Resources section)
    pub logical_id: String,

    /// CloudFormation type (e.g., "AWS::ECS::Cluster")
    pub resource_type: String,

    /// Resource properties
    pub properties: BTreeMap<String, Value>,

    /// Explicit ordering edges (DependsOn)
    pub depends_on: Vec<String>,
}

impl Resource {
    pub fn new(logical_id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            properties: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_dependency(mut self, logical_id: impl Into<String>) -> Self {
        self.add_dependency(logical_id);
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn add_dependency(&mut self, logical_id: impl Into<String>) {
        let logical_id = logical_id.into();
        if !self.depends_on.contains(&logical_id) {
            self.depends_on.push(logical_id);
        }
    }

    /// Outgoing edges: property references followed by DependsOn
    pub fn references(&self) -> Vec<String> {
        let mut refs = Vec::new();
        for value in self.properties.values() {
            for r in collect_references(value) {
                if !refs.contains(&r) {
                    refs.push(r);
                }
            }
        }
        for d in &self.depends_on {
            if !refs.contains(d) {
                refs.push(d.clone());
            }
        }
        refs
    }
}

/// A pre-existing resource referenced by identifier
///
/// `Ref` to an import renders as its identifier; `Fn::GetAtt` renders as
/// the matching entry of `attributes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResource {
    pub logical_id: String,
    pub resource_type: String,
    pub identifier: String,
    pub attributes: BTreeMap<String, Value>,
}

impl ExternalResource {
    pub fn new(
        logical_id: impl Into<String>,
        resource_type: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }
}

/// Template parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Parameter {
    #[serde(rename = "Type")]
    pub param_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_pattern: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint_description: Option<String>,
}

impl Parameter {
    pub fn string() -> Self {
        Self {
            param_type: "String".to_string(),
            description: None,
            default: None,
            allowed_pattern: None,
            constraint_description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_allowed_pattern(
        mut self,
        pattern: impl Into<String>,
        constraint_description: impl Into<String>,
    ) -> Self {
        self.allowed_pattern = Some(pattern.into());
        self.constraint_description = Some(constraint_description.into());
        self
    }
}

/// Stack output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub value: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Output {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Stack-wide tags, kept sorted by key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// `[{"Key": .., "Value": ..}]`, merged with an existing tag list
    ///
    /// Tags already present on the resource win over stack tags.
    pub fn merged_into(&self, existing: Option<&Value>, extra: &[(&str, Value)]) -> Value {
        let mut merged: BTreeMap<String, Value> = BTreeMap::new();

        for (key, value) in &self.0 {
            merged.insert(key.clone(), tag_entry(key, json!(value), extra));
        }
        if let Some(Value::Array(items)) = existing {
            for item in items {
                if let Some(key) = item.get("Key").and_then(Value::as_str) {
                    merged.insert(key.to_string(), item.clone());
                }
            }
        }

        Value::Array(merged.into_values().collect())
    }
}

fn tag_entry(key: &str, value: Value, extra: &[(&str, Value)]) -> Value {
    let mut entry = serde_json::Map::new();
    entry.insert("Key".to_string(), json!(key));
    entry.insert("Value".to_string(), value);
    for (k, v) in extra {
        entry.insert((*k).to_string(), v.clone());
    }
    Value::Object(entry)
}
