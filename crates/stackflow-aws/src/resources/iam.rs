//! IAM roles for container instances and tasks

use serde_json::{Value, json};
use stackflow_cloud::Resource;
use stackflow_cloud::intrinsic::{get_att, reference, sub};

pub const ROLE: &str = "AWS::IAM::Role";
pub const INSTANCE_PROFILE: &str = "AWS::IAM::InstanceProfile";

const EC2_CONTAINER_SERVICE_POLICY: &str =
    "arn:${AWS::Partition}:iam::aws:policy/service-role/AmazonEC2ContainerServiceforEC2Role";

fn assume_role_policy(service: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Action": "sts:AssumeRole",
            "Effect": "Allow",
            "Principal": { "Service": service }
        }]
    })
}

/// Role assumed by the ECS container instances
pub fn instance_role(logical_id: &str) -> Resource {
    Resource::new(logical_id, ROLE)
        .with_property("AssumeRolePolicyDocument", assume_role_policy("ec2.amazonaws.com"))
        .with_property("ManagedPolicyArns", json!([sub(EC2_CONTAINER_SERVICE_POLICY)]))
}

pub fn instance_profile(logical_id: &str, role: &str) -> Resource {
    Resource::new(logical_id, INSTANCE_PROFILE).with_property("Roles", json!([reference(role)]))
}

/// Role ECS uses to pull the image and write logs
///
/// `repository` and `log_group` are logical ids whose `Arn` attribute
/// scopes the grants.
pub fn task_execution_role(logical_id: &str, repository: &str, log_group: &str) -> Resource {
    let policy = json!({
        "PolicyName": format!("{}DefaultPolicy", logical_id),
        "PolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [
                {
                    "Action": [
                        "ecr:BatchCheckLayerAvailability",
                        "ecr:BatchGetImage",
                        "ecr:GetDownloadUrlForLayer"
                    ],
                    "Effect": "Allow",
                    "Resource": get_att(repository, "Arn")
                },
                {
                    "Action": "ecr:GetAuthorizationToken",
                    "Effect": "Allow",
                    "Resource": "*"
                },
                {
                    "Action": ["logs:CreateLogStream", "logs:PutLogEvents"],
                    "Effect": "Allow",
                    "Resource": get_att(log_group, "Arn")
                }
            ]
        }
    });

    Resource::new(logical_id, ROLE)
        .with_property(
            "AssumeRolePolicyDocument",
            assume_role_policy("ecs-tasks.amazonaws.com"),
        )
        .with_property("Policies", json!([policy]))
}

/// Role assumed by the application inside the task (no grants)
pub fn task_role(logical_id: &str) -> Resource {
    Resource::new(logical_id, ROLE).with_property(
        "AssumeRolePolicyDocument",
        assume_role_policy("ecs-tasks.amazonaws.com"),
    )
}
