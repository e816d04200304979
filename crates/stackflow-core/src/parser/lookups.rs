//! lookups ノードのパース

use super::{first_string, required};
use crate::error::Result;
use crate::model::ExternalLookups;
use kdl::KdlNode;

/// lookups ノードをパース
pub fn parse_lookups(node: &KdlNode) -> Result<ExternalLookups> {
    let mut repository = None;
    let mut log_group = None;
    let mut certificate = None;
    let mut machine_image = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "repository" | "ecr-repository" => repository = first_string(child),
                "log-group" | "log_group" => log_group = first_string(child),
                "certificate" | "certificate-arn" => certificate = first_string(child),
                "machine-image" | "machine_image" | "ami" => machine_image = first_string(child),
                other => {
                    tracing::warn!(field = %other, "Ignoring unknown field in lookups block");
                }
            }
        }
    }

    Ok(ExternalLookups {
        repository: required(repository, "lookups", "repository")?,
        log_group: required(log_group, "lookups", "log-group")?,
        certificate_arn: required(certificate, "lookups", "certificate")?,
        machine_image: required(machine_image, "lookups", "machine-image")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StackError;

    #[test]
    fn test_parse_lookups() {
        let kdl = r#"
            lookups {
                repository "sample-api"
                log-group "/ecs/sample-api"
                certificate "arn:aws:acm:ap-south-1:123456789012:certificate/abcd-1234"
                machine-image "ami-0123456789abcdef0"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let lookups = parse_lookups(node).unwrap();
        assert_eq!(lookups.repository, "sample-api");
        assert_eq!(lookups.log_group, "/ecs/sample-api");
        assert!(lookups.certificate_arn.ends_with("abcd-1234"));
        assert_eq!(lookups.machine_image, "ami-0123456789abcdef0");
    }

    #[test]
    fn test_parse_lookups_ami_alias() {
        let kdl = r#"
            lookups {
                repository "sample-api"
                log-group "/ecs/sample-api"
                certificate "arn:aws:acm:ap-south-1:123456789012:certificate/abcd"
                ami "ami-0123456789abcdef0"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let lookups = parse_lookups(node).unwrap();
        assert_eq!(lookups.machine_image, "ami-0123456789abcdef0");
    }

    #[test]
    fn test_parse_lookups_missing_certificate() {
        let kdl = r#"
            lookups {
                repository "sample-api"
                log-group "/ecs/sample-api"
                machine-image "ami-0123456789abcdef0"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let err = parse_lookups(node).unwrap_err();
        assert!(
            matches!(err, StackError::MissingField { ref field, .. } if field == "certificate")
        );
    }

    #[test]
    fn test_parse_lookups_empty_string_is_missing() {
        let kdl = r#"
            lookups {
                repository ""
                log-group "/ecs/sample-api"
                certificate "arn:aws:acm:ap-south-1:123456789012:certificate/abcd"
                machine-image "ami-0123456789abcdef0"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        assert!(parse_lookups(node).is_err());
    }
}
