//! stack ノードのパース

use super::{first_string, required};
use crate::error::{Result, StackError};
use crate::model::StackSettings;
use kdl::KdlNode;

/// stack ノードをパース
pub fn parse_stack_settings(node: &KdlNode) -> Result<StackSettings> {
    let name = first_string(node)
        .ok_or_else(|| StackError::InvalidConfig("stack requires a name".to_string()))?;

    let mut account = None;
    let mut region = None;
    let mut settings = StackSettings {
        name,
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "account" => account = first_string(child),
                "region" => region = first_string(child),
                "application" => {
                    if let Some(app) = first_string(child) {
                        settings.application = app;
                    }
                }
                "environment" | "env" => {
                    if let Some(env) = first_string(child) {
                        settings.environment = env;
                    }
                }
                other => {
                    tracing::warn!(field = %other, "Ignoring unknown field in stack block");
                }
            }
        }
    }

    settings.account = required(account, "stack", "account")?;
    settings.region = required(region, "stack", "region")?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stack_settings() {
        let kdl = r#"
            stack "UatApplicationStack" {
                account "123456789012"
                region "ap-south-1"
                application "billing"
                environment "stg"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let settings = parse_stack_settings(node).unwrap();
        assert_eq!(settings.name, "UatApplicationStack");
        assert_eq!(settings.account, "123456789012");
        assert_eq!(settings.region, "ap-south-1");
        assert_eq!(settings.application, "billing");
        assert_eq!(settings.environment, "stg");
    }

    #[test]
    fn test_parse_stack_settings_defaults_tags() {
        let kdl = r#"
            stack "UatApplicationStack" {
                account "123456789012"
                region "ap-south-1"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let settings = parse_stack_settings(node).unwrap();
        assert_eq!(settings.application, "sample-app");
        assert_eq!(settings.environment, "uat");
    }

    #[test]
    fn test_parse_stack_without_region() {
        let kdl = r#"
            stack "UatApplicationStack" {
                account "123456789012"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let err = parse_stack_settings(node).unwrap_err();
        assert!(matches!(err, StackError::MissingField { ref field, .. } if field == "region"));
    }

    #[test]
    fn test_parse_stack_without_name() {
        let kdl = r#"
            stack {
                account "123456789012"
                region "ap-south-1"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        assert!(parse_stack_settings(node).is_err());
    }
}
