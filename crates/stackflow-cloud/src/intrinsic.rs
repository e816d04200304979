//! CloudFormation intrinsic functions
//!
//! Property values are plain `serde_json::Value`s. References between
//! nodes are expressed with `Ref`, `Fn::GetAtt` and `Fn::Sub`; this module
//! builds those values and walks them to find the edges of the graph.

use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Pseudo parameters provided by CloudFormation itself
pub mod pseudo {
    pub const ACCOUNT_ID: &str = "AWS::AccountId";
    pub const PARTITION: &str = "AWS::Partition";
    pub const REGION: &str = "AWS::Region";
    pub const STACK_NAME: &str = "AWS::StackName";
    pub const URL_SUFFIX: &str = "AWS::URLSuffix";
}

pub fn is_pseudo_parameter(name: &str) -> bool {
    name.starts_with("AWS::")
}

/// `{"Ref": id}`
pub fn reference(id: &str) -> Value {
    json!({ "Ref": id })
}

/// `{"Fn::GetAtt": [id, attribute]}`
pub fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

/// `{"Fn::Join": [delimiter, parts]}`
pub fn join(delimiter: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [delimiter, parts] })
}

/// `{"Fn::Sub": template}`
pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

/// `{"Fn::Base64": value}`
pub fn base64(value: Value) -> Value {
    json!({ "Fn::Base64": value })
}

/// `{"Fn::FindInMap": [map, top_level_key, second_level_key]}`
pub fn find_in_map(map: &str, top_level_key: Value, second_level_key: &str) -> Value {
    json!({ "Fn::FindInMap": [map, top_level_key, second_level_key] })
}

/// Logical ids referenced by a value, in first-seen order
///
/// Pseudo parameters are skipped; `${Name.Attr}` in `Fn::Sub` counts as
/// a reference to `Name`.
pub fn collect_references(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    walk_references(value, &mut found);
    found
}

fn walk_references(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    push_unique(found, target);
                    return;
                }
                if let Some(Value::Array(args)) = map.get("Fn::GetAtt")
                    && let Some(Value::String(target)) = args.first()
                {
                    push_unique(found, target);
                    return;
                }
                if let Some(args) = map.get("Fn::Sub") {
                    match args {
                        Value::String(template) => {
                            for name in sub_variables(template) {
                                push_unique(found, &name);
                            }
                        }
                        Value::Array(parts) => {
                            // [template, { local: value }] - locals are not graph edges
                            let locals: Vec<&String> = parts
                                .get(1)
                                .and_then(Value::as_object)
                                .map(|m| m.keys().collect())
                                .unwrap_or_default();
                            if let Some(Value::String(template)) = parts.first() {
                                for name in sub_variables(template) {
                                    if !locals.contains(&&name) {
                                        push_unique(found, &name);
                                    }
                                }
                            }
                            if let Some(vars) = parts.get(1) {
                                walk_references(vars, found);
                            }
                        }
                        _ => {}
                    }
                    return;
                }
            }
            for v in map.values() {
                walk_references(v, found);
            }
        }
        Value::Array(items) => {
            for v in items {
                walk_references(v, found);
            }
        }
        _ => {}
    }
}

fn push_unique(found: &mut Vec<String>, name: &str) {
    if !is_pseudo_parameter(name) && !found.iter().any(|f| f == name) {
        found.push(name.to_string());
    }
}

/// Variable names used in an `Fn::Sub` template (`${!Literal}` excluded)
fn sub_variables(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let inner = &after[..end];
        if !inner.starts_with('!') {
            let name = inner.split('.').next().unwrap_or(inner).trim();
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
        rest = &after[end + 1..];
    }
    names
}

/// Replace `Ref`s to the given names with literal values
///
/// Used both for resolving parameters and for inlining imports.
pub fn substitute_refs(value: &mut Value, values: &BTreeMap<String, Value>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1
                && let Some(Value::String(target)) = map.get("Ref")
                && let Some(replacement) = values.get(target)
            {
                *value = replacement.clone();
                return;
            }
            for v in map.values_mut() {
                substitute_refs(v, values);
            }
        }
        Value::Array(items) => {
            for v in items {
                substitute_refs(v, values);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_references() {
        let value = json!({
            "Cluster": reference("ApplicationCluster"),
            "Role": get_att("ExecutionRole", "Arn"),
            "Region": reference(pseudo::REGION),
            "Again": reference("ApplicationCluster"),
        });

        let refs = collect_references(&value);
        // serde_json の Map はキー順
        assert_eq!(refs, vec!["ApplicationCluster", "ExecutionRole"]);
    }

    #[test]
    fn test_collect_references_in_sub() {
        let value = sub("arn:${AWS::Partition}:logs:${LogGroup.Arn}:${!Literal}");
        assert_eq!(collect_references(&value), vec!["LogGroup"]);

        let with_locals = json!({
            "Fn::Sub": ["${Prefix}-${Cluster}", { "Prefix": reference("Repo") }]
        });
        assert_eq!(collect_references(&with_locals), vec!["Cluster", "Repo"]);
    }

    #[test]
    fn test_nested_references() {
        let value = join(
            "",
            vec![get_att("Repo", "RepositoryUri"), json!(":"), reference("ImageTag")],
        );
        assert_eq!(collect_references(&value), vec!["Repo", "ImageTag"]);
    }

    #[test]
    fn test_find_in_map_only_references_arguments() {
        let value = find_in_map("AmiMap", reference(pseudo::REGION), "ami");
        assert!(collect_references(&value).is_empty());
    }

    #[test]
    fn test_substitute_refs() {
        let mut value = join("", vec![json!("repo:"), reference("ImageTag")]);
        let values = BTreeMap::from([("ImageTag".to_string(), json!("42"))]);

        substitute_refs(&mut value, &values);
        assert_eq!(value, json!({ "Fn::Join": ["", ["repo:", "42"]] }));
    }

    #[test]
    fn test_substitute_leaves_unknown_refs() {
        let mut value = reference("Other");
        substitute_refs(&mut value, &BTreeMap::new());
        assert_eq!(value, reference("Other"));
    }
}
