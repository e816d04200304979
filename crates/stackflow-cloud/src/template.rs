//! CloudFormation template document
//!
//! Every section is a `BTreeMap`, so two renderings of the same graph are
//! byte-identical.

use crate::error::{CloudError, Result};
use crate::intrinsic::substitute_refs;
use crate::resource::{Output, Parameter};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;

pub const FORMAT_VERSION: &str = "2010-09-09";

/// A rendered CloudFormation template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,

    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "Metadata", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,

    #[serde(rename = "Parameters", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,

    #[serde(rename = "Mappings", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: BTreeMap<String, Value>,

    #[serde(rename = "Resources")]
    pub resources: BTreeMap<String, TemplateResource>,

    #[serde(rename = "Outputs", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
}

/// One entry of the Resources section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    #[serde(rename = "Type")]
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl Template {
    pub fn empty() -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            description: None,
            metadata: BTreeMap::new(),
            parameters: BTreeMap::new(),
            mappings: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn resource(&self, logical_id: &str) -> Option<&TemplateResource> {
        self.resources.get(logical_id)
    }

    /// Logical ids of resources with the given type
    pub fn resources_of_type<'a>(&'a self, resource_type: &'a str) -> Vec<&'a str> {
        self.resources
            .iter()
            .filter(|(_, r)| r.resource_type == resource_type)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        let mut rendered = serde_json::to_string_pretty(self)?;
        rendered.push('\n');
        Ok(rendered)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// The template as a deploy with `values` would see it
    ///
    /// Every `Ref` to a parameter is replaced by the supplied value (or the
    /// parameter's default). The Parameters section is left as is.
    pub fn resolved(&self, values: &ParameterValues) -> Result<Template> {
        values.check_against(self)?;

        let mut substitutions = BTreeMap::new();
        for (name, parameter) in &self.parameters {
            let value = values
                .get(name)
                .map(str::to_string)
                .or_else(|| parameter.default.clone())
                .ok_or_else(|| CloudError::MissingParameterValue(name.clone()))?;
            substitutions.insert(name.clone(), Value::String(value));
        }

        let mut resolved = self.clone();
        for resource in resolved.resources.values_mut() {
            for value in resource.properties.values_mut() {
                substitute_refs(value, &substitutions);
            }
        }
        for output in resolved.outputs.values_mut() {
            substitute_refs(&mut output.value, &substitutions);
        }
        Ok(resolved)
    }
}

/// Values for template parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterValues(BTreeMap<String, String>);

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every value names a declared parameter, and every parameter without
    /// a default has a value
    pub fn check_against(&self, template: &Template) -> Result<()> {
        if let Some(unknown) = self.0.keys().find(|k| !template.parameters.contains_key(*k)) {
            return Err(CloudError::UnknownParameter(unknown.clone()));
        }
        for (name, parameter) in &template.parameters {
            if parameter.default.is_none() && !self.0.contains_key(name) {
                return Err(CloudError::MissingParameterValue(name.clone()));
            }
        }
        Ok(())
    }

    /// `[{"ParameterKey": .., "ParameterValue": ..}]` as accepted by
    /// `aws cloudformation create-stack --parameters file://...`
    pub fn to_cli_parameters(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|(k, v)| json!({ "ParameterKey": k, "ParameterValue": v }))
                .collect(),
        )
    }

    pub fn from_cli_parameters(content: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(rename_all = "PascalCase")]
        struct Entry {
            parameter_key: String,
            parameter_value: String,
        }

        let entries: Vec<Entry> = serde_json::from_str(content)?;
        Ok(Self(
            entries
                .into_iter()
                .map(|e| (e.parameter_key, e.parameter_value))
                .collect(),
        ))
    }
}
