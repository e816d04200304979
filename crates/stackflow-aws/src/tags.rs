//! Stack-wide tagging
//!
//! Each resource type takes tags in its own shape; types that cannot be
//! tagged are left alone.

use crate::resources::{autoscaling, ec2, ecs, elbv2, iam};
use serde_json::{Value, json};
use stackflow_cloud::{Resource, Tags};
use stackflow_core::StackSettings;

pub const APPLICATION_TAG: &str = "Application";
pub const ENVIRONMENT_TAG: &str = "Environment";
pub const MANAGED_BY_TAG: &str = "ManagedBy";

/// Value of the ManagedBy tag
pub const MANAGED_BY: &str = "stackflow";

/// Types with a plain `Tags: [{Key, Value}]` list
const LIST_TAGGED: &[&str] = &[
    ecs::CLUSTER,
    ecs::CAPACITY_PROVIDER,
    ecs::TASK_DEFINITION,
    ecs::SERVICE,
    elbv2::LOAD_BALANCER,
    elbv2::TARGET_GROUP,
    iam::ROLE,
];

/// Application / Environment / ManagedBy
pub fn stack_tags(settings: &StackSettings) -> Tags {
    Tags::new()
        .with(APPLICATION_TAG, &settings.application)
        .with(ENVIRONMENT_TAG, &settings.environment)
        .with(MANAGED_BY_TAG, MANAGED_BY)
}

/// Tagger passed to `ResourceGraph::apply_tags`
pub fn tag_resource(resource: &mut Resource, tags: &Tags) {
    let resource_type = resource.resource_type.as_str();

    if LIST_TAGGED.contains(&resource_type) {
        let merged = tags.merged_into(resource.property("Tags"), &[]);
        resource.set_property("Tags", merged);
    } else if resource_type == autoscaling::AUTO_SCALING_GROUP {
        let merged = tags.merged_into(
            resource.property("Tags"),
            &[("PropagateAtLaunch", json!(true))],
        );
        resource.set_property("Tags", merged);
    } else if resource_type == ec2::LAUNCH_TEMPLATE {
        tag_launch_template(resource, tags);
    }
}

fn tag_launch_template(resource: &mut Resource, tags: &Tags) {
    let tag_list = tags.merged_into(None, &[]);

    resource.set_property(
        "TagSpecifications",
        json!([{ "ResourceType": "launch-template", "Tags": tag_list }]),
    );

    if let Some(Value::Object(data)) = resource.properties.get_mut("LaunchTemplateData") {
        data.insert(
            "TagSpecifications".to_string(),
            json!([
                { "ResourceType": "instance", "Tags": tag_list },
                { "ResourceType": "volume", "Tags": tag_list },
            ]),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags() -> Tags {
        stack_tags(&StackSettings::default())
    }

    #[test]
    fn test_stack_tags() {
        let tags = tags();
        assert_eq!(tags.get("Application"), Some("sample-app"));
        assert_eq!(tags.get("Environment"), Some("uat"));
        assert_eq!(tags.get("ManagedBy"), Some("stackflow"));
    }

    #[test]
    fn test_list_tagged_resource() {
        let mut cluster = ecs::cluster("Cluster", "uat-application-cluster");
        tag_resource(&mut cluster, &tags());

        let list = cluster.property("Tags").unwrap().as_array().unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], json!({ "Key": "Application", "Value": "sample-app" }));
    }

    #[test]
    fn test_auto_scaling_group_propagates() {
        let mut asg = autoscaling::auto_scaling_group("Asg", "Lt", &[], 1, "Stack/Asg");
        tag_resource(&mut asg, &tags());

        let list = asg.property("Tags").unwrap().as_array().unwrap();
        assert_eq!(list.len(), 4);
        assert!(list.iter().all(|t| t["PropagateAtLaunch"] == true));
        assert!(list.iter().any(|t| t["Key"] == "Name"));
    }

    #[test]
    fn test_launch_template_tag_specifications() {
        let mut lt = ec2::launch_template(
            "Lt",
            &ec2::LaunchTemplateSpec {
                instance_type: "t3a.medium",
                instance_profile: "Profile",
                instance_role: "Role",
                security_group: "Sg",
                cluster: "Cluster",
            },
        );
        tag_resource(&mut lt, &tags());

        assert_eq!(
            lt.property("TagSpecifications").unwrap()[0]["ResourceType"],
            "launch-template"
        );
        let data = lt.property("LaunchTemplateData").unwrap();
        assert_eq!(data["TagSpecifications"][0]["ResourceType"], "instance");
        assert_eq!(data["TagSpecifications"][1]["ResourceType"], "volume");
        assert!(lt.property("Tags").is_none());
    }

    #[test]
    fn test_untaggable_types_are_skipped() {
        let mut rule = elbv2::host_header_rule(
            "Rule",
            "Listener",
            10,
            &["api.example.com"],
            elbv2::forward_action("Tg"),
        );
        let before = rule.clone();
        tag_resource(&mut rule, &tags());
        assert_eq!(rule, before);

        let mut profile = iam::instance_profile("Profile", "Role");
        tag_resource(&mut profile, &tags());
        assert!(profile.property("Tags").is_none());
    }
}
