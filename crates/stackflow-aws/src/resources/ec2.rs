//! EC2 launch template and security group ingress rules

use serde_json::json;
use stackflow_cloud::Resource;
use stackflow_cloud::intrinsic::{base64, find_in_map, get_att, pseudo, reference, sub};

pub const LAUNCH_TEMPLATE: &str = "AWS::EC2::LaunchTemplate";
pub const SECURITY_GROUP_INGRESS: &str = "AWS::EC2::SecurityGroupIngress";

/// Mapping holding the machine image per region
pub const AMI_MAPPING: &str = "AmiMap";
pub const AMI_MAPPING_KEY: &str = "ami";

/// Inputs of the container instance launch template
#[derive(Debug, Clone)]
pub struct LaunchTemplateSpec<'a> {
    pub instance_type: &'a str,
    pub instance_profile: &'a str,
    pub instance_role: &'a str,
    pub security_group: &'a str,
    pub cluster: &'a str,
}

/// Launch template with IMDSv2 required and ECS agent registration
pub fn launch_template(logical_id: &str, spec: &LaunchTemplateSpec<'_>) -> Resource {
    let user_data = format!(
        "#!/bin/bash\necho ECS_CLUSTER=${{{}}} >> /etc/ecs/ecs.config",
        spec.cluster
    );

    Resource::new(logical_id, LAUNCH_TEMPLATE)
        .with_property(
            "LaunchTemplateData",
            json!({
                "ImageId": find_in_map(AMI_MAPPING, reference(pseudo::REGION), AMI_MAPPING_KEY),
                "InstanceType": spec.instance_type,
                "IamInstanceProfile": { "Arn": get_att(spec.instance_profile, "Arn") },
                "SecurityGroupIds": [get_att(spec.security_group, "GroupId")],
                "MetadataOptions": { "HttpTokens": "required" },
                "UserData": base64(sub(&user_data)),
            }),
        )
        .with_dependency(spec.instance_role)
}

/// Open a port on a security group to the internet
pub fn ingress_from_anywhere(logical_id: &str, security_group: &str, port: u16) -> Resource {
    Resource::new(logical_id, SECURITY_GROUP_INGRESS)
        .with_property("GroupId", get_att(security_group, "GroupId"))
        .with_property("IpProtocol", json!("tcp"))
        .with_property("CidrIp", json!("0.0.0.0/0"))
        .with_property("FromPort", json!(port))
        .with_property("ToPort", json!(port))
        .with_property(
            "Description",
            json!(format!("Allow from anyone on port {}", port)),
        )
}

/// Allow traffic from one security group to another on a port
pub fn ingress_from_group(
    logical_id: &str,
    security_group: &str,
    source_security_group: &str,
    port: u16,
) -> Resource {
    Resource::new(logical_id, SECURITY_GROUP_INGRESS)
        .with_property("GroupId", get_att(security_group, "GroupId"))
        .with_property("IpProtocol", json!("tcp"))
        .with_property(
            "SourceSecurityGroupId",
            get_att(source_security_group, "GroupId"),
        )
        .with_property("FromPort", json!(port))
        .with_property("ToPort", json!(port))
        .with_property("Description", json!("Load balancer to target"))
}
