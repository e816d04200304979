//! Auto Scaling group for the container instances

use serde_json::json;
use stackflow_cloud::Resource;
use stackflow_cloud::intrinsic::{get_att, reference};

pub const AUTO_SCALING_GROUP: &str = "AWS::AutoScaling::AutoScalingGroup";

/// Fixed-size group: min = max = desired = `capacity`
pub fn auto_scaling_group(
    logical_id: &str,
    launch_template: &str,
    subnets: &[String],
    capacity: u32,
    name_tag: &str,
) -> Resource {
    // CloudFormation takes the sizes as strings
    let size = capacity.to_string();

    Resource::new(logical_id, AUTO_SCALING_GROUP)
        .with_property("MinSize", json!(size))
        .with_property("MaxSize", json!(size))
        .with_property("DesiredCapacity", json!(size))
        .with_property(
            "LaunchTemplate",
            json!({
                "LaunchTemplateId": reference(launch_template),
                "Version": get_att(launch_template, "LatestVersionNumber"),
            }),
        )
        .with_property("VPCZoneIdentifier", json!(subnets))
        .with_property(
            "Tags",
            json!([{ "Key": "Name", "Value": name_tag, "PropagateAtLaunch": true }]),
        )
}
