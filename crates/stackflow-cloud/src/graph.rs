//! Resource graph
//!
//! Nodes are declared leaves first: `add` refuses a resource whose
//! references are not declared yet. Later wiring (`attach`,
//! `add_dependency`) may point forward, so the construction order and the
//! topological order can differ; `topological_order` computes the latter.

use crate::error::{CloudError, Result};
use crate::intrinsic::collect_references;
use crate::resource::{ExternalResource, Output, Parameter, Resource, Tags};
use crate::template::{FORMAT_VERSION, Template, TemplateResource};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Kind of node a logical id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Parameter,
    Import,
    Resource,
}

/// A stack's resources, parameters, imports and outputs
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    stack_name: String,
    description: Option<String>,
    parameters: BTreeMap<String, Parameter>,
    mappings: BTreeMap<String, Value>,
    imports: Vec<ExternalResource>,
    resources: Vec<Resource>,
    outputs: BTreeMap<String, Output>,
    kinds: HashMap<String, NodeKind>,
}

impl ResourceGraph {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            description: None,
            parameters: BTreeMap::new(),
            mappings: BTreeMap::new(),
            imports: Vec::new(),
            resources: Vec::new(),
            outputs: BTreeMap::new(),
            kinds: HashMap::new(),
        }
    }

    pub fn stack_name(&self) -> &str {
        &self.stack_name
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    fn declare(&mut self, logical_id: &str, kind: NodeKind) -> Result<()> {
        if self.kinds.contains_key(logical_id) {
            return Err(CloudError::DuplicateLogicalId(logical_id.to_string()));
        }
        self.kinds.insert(logical_id.to_string(), kind);
        Ok(())
    }

    pub fn kind_of(&self, logical_id: &str) -> Option<NodeKind> {
        self.kinds.get(logical_id).copied()
    }

    pub fn is_declared(&self, logical_id: &str) -> bool {
        self.kinds.contains_key(logical_id)
    }

    pub fn add_parameter(&mut self, name: impl Into<String>, parameter: Parameter) -> Result<()> {
        let name = name.into();
        self.declare(&name, NodeKind::Parameter)?;
        self.parameters.insert(name, parameter);
        Ok(())
    }

    /// Mappings are looked up with `Fn::FindInMap`, not `Ref`, and are not
    /// graph nodes
    pub fn add_mapping(&mut self, name: impl Into<String>, mapping: Value) {
        self.mappings.insert(name.into(), mapping);
    }

    /// Register an existing resource referenced by identifier
    pub fn import(&mut self, external: ExternalResource) -> Result<()> {
        self.declare(&external.logical_id, NodeKind::Import)?;
        debug!(
            logical_id = %external.logical_id,
            identifier = %external.identifier,
            "Imported external resource"
        );
        self.imports.push(external);
        Ok(())
    }

    fn check_references(&self, from: &str, refs: &[String]) -> Result<()> {
        for target in refs {
            if !self.is_declared(target) {
                return Err(CloudError::DanglingReference {
                    from: from.to_string(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }

    /// Declare a resource; everything it references must already exist
    pub fn add(&mut self, resource: Resource) -> Result<()> {
        if self.is_declared(&resource.logical_id) {
            return Err(CloudError::DuplicateLogicalId(resource.logical_id));
        }
        self.check_references(&resource.logical_id, &resource.references())?;
        self.declare(&resource.logical_id, NodeKind::Resource)?;

        debug!(
            logical_id = %resource.logical_id,
            resource_type = %resource.resource_type,
            "Declared resource"
        );
        self.resources.push(resource);
        Ok(())
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    pub fn resource_mut(&mut self, logical_id: &str) -> Result<&mut Resource> {
        self.resources
            .iter_mut()
            .find(|r| r.logical_id == logical_id)
            .ok_or_else(|| CloudError::ResourceNotFound(logical_id.to_string()))
    }

    /// Resources in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter()
    }

    pub fn imports(&self) -> impl Iterator<Item = &ExternalResource> {
        self.imports.iter()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Append `value` to the list property `key` of resource `logical_id`
    pub fn attach(&mut self, logical_id: &str, key: &str, value: Value) -> Result<()> {
        self.check_references(logical_id, &collect_references(&value))?;

        let resource = self.resource_mut(logical_id)?;
        match resource.properties.get_mut(key) {
            None => {
                resource.properties.insert(key.to_string(), json!([value]));
            }
            Some(Value::Array(items)) => items.push(value),
            Some(_) => {
                return Err(CloudError::InvalidProperty {
                    id: logical_id.to_string(),
                    key: key.to_string(),
                    message: "not a list".to_string(),
                });
            }
        }
        debug!(logical_id = %logical_id, key = %key, "Attached value");
        Ok(())
    }

    /// `from` must be created after `to`
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<()> {
        if self.kind_of(to) != Some(NodeKind::Resource) {
            return Err(CloudError::DanglingReference {
                from: from.to_string(),
                target: to.to_string(),
            });
        }
        self.resource_mut(from)?.add_dependency(to);
        Ok(())
    }

    pub fn add_output(&mut self, name: impl Into<String>, output: Output) -> Result<()> {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(CloudError::DuplicateLogicalId(name));
        }
        self.check_references(&name, &collect_references(&output.value))?;
        self.outputs.insert(name, output);
        Ok(())
    }

    /// Outgoing edges of a node (resources, parameters and imports)
    pub fn references(&self, logical_id: &str) -> Result<Vec<String>> {
        self.resource(logical_id)
            .map(Resource::references)
            .ok_or_else(|| CloudError::ResourceNotFound(logical_id.to_string()))
    }

    /// Outgoing edges restricted to declared resources
    fn resource_edges(&self, resource: &Resource) -> Vec<usize> {
        resource
            .references()
            .iter()
            .filter_map(|target| self.resources.iter().position(|r| &r.logical_id == target))
            .collect()
    }

    /// Kahn's algorithm; ties broken by declaration order
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let count = self.resources.len();
        let mut in_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        for (index, resource) in self.resources.iter().enumerate() {
            for dependency in self.resource_edges(resource) {
                in_degree[index] += 1;
                dependents[dependency].push(index);
            }
        }

        let mut ready: BTreeSet<usize> = (0..count).filter(|i| in_degree[*i] == 0).collect();
        let mut order = Vec::with_capacity(count);

        while let Some(index) = ready.pop_first() {
            order.push(self.resources[index].logical_id.clone());
            for &dependent in &dependents[index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != count {
            let remaining = self
                .resources
                .iter()
                .enumerate()
                .filter(|(i, _)| in_degree[*i] > 0)
                .map(|(_, r)| r.logical_id.clone())
                .collect();
            return Err(CloudError::DependencyCycle(remaining));
        }

        Ok(order)
    }

    /// No dangling references anywhere, no cycles
    pub fn validate(&self) -> Result<()> {
        for resource in &self.resources {
            self.check_references(&resource.logical_id, &resource.references())?;
        }
        for (name, output) in &self.outputs {
            self.check_references(name, &collect_references(&output.value))?;
        }
        self.topological_order()?;
        Ok(())
    }

    /// Apply stack-wide tags with a provider-specific tagger
    pub fn apply_tags<F>(&mut self, tags: &Tags, tagger: F)
    where
        F: Fn(&mut Resource, &Tags),
    {
        for resource in &mut self.resources {
            tagger(resource, tags);
        }
    }

    /// Render to a CloudFormation template
    ///
    /// Imports are inlined: `Ref` becomes the identifier, `Fn::GetAtt` the
    /// recorded attribute value.
    pub fn to_template(&self) -> Result<Template> {
        self.validate()?;

        let mut resources = BTreeMap::new();
        for resource in &self.resources {
            let mut properties = BTreeMap::new();
            for (key, value) in &resource.properties {
                properties.insert(key.clone(), self.inline_imports(value)?);
            }
            let mut depends_on = resource.depends_on.clone();
            depends_on.sort();
            resources.insert(
                resource.logical_id.clone(),
                TemplateResource {
                    resource_type: resource.resource_type.clone(),
                    properties,
                    depends_on,
                },
            );
        }

        let mut outputs = BTreeMap::new();
        for (name, output) in &self.outputs {
            let mut rendered = output.clone();
            rendered.value = self.inline_imports(&output.value)?;
            outputs.insert(name.clone(), rendered);
        }

        let mut metadata = BTreeMap::new();
        if !self.imports.is_empty() {
            let lookups: serde_json::Map<String, Value> = self
                .imports
                .iter()
                .map(|i| {
                    (
                        i.logical_id.clone(),
                        json!({ "Type": i.resource_type, "Identifier": i.identifier }),
                    )
                })
                .collect();
            metadata.insert("stackflow:lookups".to_string(), Value::Object(lookups));
        }

        Ok(Template {
            format_version: FORMAT_VERSION.to_string(),
            description: self.description.clone(),
            metadata,
            parameters: self.parameters.clone(),
            mappings: self.mappings.clone(),
            resources,
            outputs,
        })
    }

    fn find_import(&self, logical_id: &str) -> Option<&ExternalResource> {
        self.imports.iter().find(|i| i.logical_id == logical_id)
    }

    fn inline_imports(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Object(map) => {
                if map.len() == 1 {
                    if let Some(Value::String(target)) = map.get("Ref")
                        && let Some(import) = self.find_import(target)
                    {
                        return Ok(Value::String(import.identifier.clone()));
                    }
                    if let Some(Value::Array(args)) = map.get("Fn::GetAtt")
                        && let (Some(Value::String(target)), Some(Value::String(attribute))) =
                            (args.first(), args.get(1))
                        && let Some(import) = self.find_import(target)
                    {
                        return import.attributes.get(attribute).cloned().ok_or_else(|| {
                            CloudError::UnknownAttribute {
                                id: target.clone(),
                                attribute: attribute.clone(),
                            }
                        });
                    }
                    if let Some(args) = map.get("Fn::Sub") {
                        return self.inline_sub(args);
                    }
                }
                let mut inlined = serde_json::Map::new();
                for (k, v) in map {
                    inlined.insert(k.clone(), self.inline_imports(v)?);
                }
                Ok(Value::Object(inlined))
            }
            Value::Array(items) => Ok(Value::Array(
                items
                    .iter()
                    .map(|v| self.inline_imports(v))
                    .collect::<Result<Vec<_>>>()?,
            )),
            other => Ok(other.clone()),
        }
    }

    /// Inline imports inside `Fn::Sub`, both the string and `[template, vars]` forms
    ///
    /// `${Import}` becomes the identifier and `${Import.Attr}` the recorded
    /// attribute. Local variable names shadow imports.
    fn inline_sub(&self, args: &Value) -> Result<Value> {
        let (template, mut vars) = match args {
            Value::String(template) => (template.as_str(), serde_json::Map::new()),
            Value::Array(parts) => match (parts.first(), parts.get(1)) {
                (Some(Value::String(template)), Some(Value::Object(vars))) => {
                    let mut inlined = serde_json::Map::new();
                    for (name, value) in vars {
                        inlined.insert(name.clone(), self.inline_imports(value)?);
                    }
                    (template.as_str(), inlined)
                }
                (Some(Value::String(template)), None) => {
                    (template.as_str(), serde_json::Map::new())
                }
                _ => return Ok(json!({ "Fn::Sub": self.inline_imports(args)? })),
            },
            other => return Ok(json!({ "Fn::Sub": self.inline_imports(other)? })),
        };
        let locals: BTreeSet<String> = vars.keys().cloned().collect();

        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            rendered.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                rendered.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let inner = &after[..end];
            let (name, attribute) = match inner.split_once('.') {
                Some((name, attribute)) => (name.trim(), Some(attribute.trim())),
                None => (inner.trim(), None),
            };
            match self.find_import(name) {
                Some(import) if !inner.starts_with('!') && !locals.contains(name) => {
                    rendered.push_str(&splice_import(import, attribute, &mut vars)?);
                }
                _ => rendered.push_str(&rest[start..start + end + 3]),
            }
            rest = &after[end + 1..];
        }
        rendered.push_str(rest);

        if vars.is_empty() {
            Ok(json!({ "Fn::Sub": rendered }))
        } else {
            Ok(json!({ "Fn::Sub": [rendered, vars] }))
        }
    }
}

/// Text standing in for one `${Import[.Attr]}` placeholder
///
/// Literal strings are spliced escaped, nested string-form `Fn::Sub`s are
/// spliced as-is, anything else becomes a local variable.
fn splice_import(
    import: &ExternalResource,
    attribute: Option<&str>,
    vars: &mut serde_json::Map<String, Value>,
) -> Result<String> {
    let Some(attribute) = attribute else {
        return Ok(escape_sub_literal(&import.identifier));
    };
    let value = import
        .attributes
        .get(attribute)
        .ok_or_else(|| CloudError::UnknownAttribute {
            id: import.logical_id.clone(),
            attribute: attribute.to_string(),
        })?;

    match value {
        Value::String(literal) => Ok(escape_sub_literal(literal)),
        Value::Object(map) if map.len() == 1 && map.get("Fn::Sub").is_some_and(Value::is_string) => {
            Ok(map["Fn::Sub"].as_str().unwrap_or_default().to_string())
        }
        other => {
            let local = format!("{}{}", import.logical_id, attribute.replace('.', ""));
            vars.insert(local.clone(), other.clone());
            Ok(format!("${{{}}}", local))
        }
    }
}

fn escape_sub_literal(literal: &str) -> String {
    literal.replace("${", "${!")
}
