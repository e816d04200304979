//! ECS cluster, capacity provider, task definition and service

use serde_json::{Value, json};
use stackflow_cloud::Resource;
use stackflow_cloud::intrinsic::{get_att, pseudo, reference};

pub const CLUSTER: &str = "AWS::ECS::Cluster";
pub const CAPACITY_PROVIDER: &str = "AWS::ECS::CapacityProvider";
pub const CLUSTER_CAPACITY_PROVIDER_ASSOCIATIONS: &str =
    "AWS::ECS::ClusterCapacityProviderAssociations";
pub const TASK_DEFINITION: &str = "AWS::ECS::TaskDefinition";
pub const SERVICE: &str = "AWS::ECS::Service";

pub fn cluster(logical_id: &str, cluster_name: &str) -> Resource {
    Resource::new(logical_id, CLUSTER).with_property("ClusterName", json!(cluster_name))
}

/// Capacity provider wrapping an Auto Scaling group
pub fn capacity_provider(logical_id: &str, auto_scaling_group: &str) -> Resource {
    Resource::new(logical_id, CAPACITY_PROVIDER).with_property(
        "AutoScalingGroupProvider",
        json!({
            "AutoScalingGroupArn": reference(auto_scaling_group),
            "ManagedScaling": { "Status": "ENABLED", "TargetCapacity": 100 },
            "ManagedTerminationProtection": "DISABLED",
        }),
    )
}

/// Empty association; capacity providers are attached afterwards
pub fn cluster_capacity_provider_associations(logical_id: &str, cluster: &str) -> Resource {
    Resource::new(logical_id, CLUSTER_CAPACITY_PROVIDER_ASSOCIATIONS)
        .with_property("Cluster", reference(cluster))
        .with_property("CapacityProviders", json!([]))
        .with_property("DefaultCapacityProviderStrategy", json!([]))
}

/// `{"CapacityProvider": .., "Weight": ..}`
pub fn capacity_provider_strategy(capacity_provider: &str, weight: u32) -> Value {
    json!({ "CapacityProvider": reference(capacity_provider), "Weight": weight })
}

/// EC2 task definition in awsvpc mode with no containers yet
pub fn task_definition(
    logical_id: &str,
    family: &str,
    execution_role: &str,
    task_role: &str,
) -> Resource {
    Resource::new(logical_id, TASK_DEFINITION)
        .with_property("Family", json!(family))
        .with_property("NetworkMode", json!("awsvpc"))
        .with_property("RequiresCompatibilities", json!(["EC2"]))
        .with_property("ExecutionRoleArn", get_att(execution_role, "Arn"))
        .with_property("TaskRoleArn", get_att(task_role, "Arn"))
        .with_property("ContainerDefinitions", json!([]))
}

/// One container of a task definition
#[derive(Debug, Clone)]
pub struct ContainerSpec<'a> {
    pub name: &'a str,
    /// Image reference (usually an `Fn::Join` of repository URI and tag)
    pub image: Value,
    pub memory_reservation_mib: u32,
    /// Logical id of the log group
    pub log_group: &'a str,
    pub log_stream_prefix: &'a str,
    pub container_port: u16,
}

pub fn container_definition(spec: &ContainerSpec<'_>) -> Value {
    json!({
        "Name": spec.name,
        "Image": spec.image,
        "Essential": true,
        "MemoryReservation": spec.memory_reservation_mib,
        "LogConfiguration": {
            "LogDriver": "awslogs",
            "Options": {
                "awslogs-group": reference(spec.log_group),
                "awslogs-stream-prefix": spec.log_stream_prefix,
                "awslogs-region": reference(pseudo::REGION),
            }
        },
        "PortMappings": [{ "ContainerPort": spec.container_port, "Protocol": "tcp" }],
    })
}

/// Inputs of the ECS service
#[derive(Debug, Clone)]
pub struct ServiceSpec<'a> {
    pub service_name: &'a str,
    pub cluster: &'a str,
    pub task_definition: &'a str,
    pub capacity_provider: &'a str,
    pub security_group: &'a str,
    pub subnets: &'a [String],
    pub desired_count: u32,
}

/// Service with the deployment circuit breaker (rollback) and tags
/// propagated from the service
pub fn service(logical_id: &str, spec: &ServiceSpec<'_>) -> Resource {
    Resource::new(logical_id, SERVICE)
        .with_property("ServiceName", json!(spec.service_name))
        .with_property("Cluster", reference(spec.cluster))
        .with_property("TaskDefinition", reference(spec.task_definition))
        .with_property("DesiredCount", json!(spec.desired_count))
        .with_property(
            "CapacityProviderStrategy",
            json!([capacity_provider_strategy(spec.capacity_provider, 1)]),
        )
        .with_property("DeploymentController", json!({ "Type": "ECS" }))
        .with_property(
            "DeploymentConfiguration",
            json!({
                "DeploymentCircuitBreaker": { "Enable": true, "Rollback": true },
                "MaximumPercent": 200,
                "MinimumHealthyPercent": 50,
            }),
        )
        .with_property(
            "NetworkConfiguration",
            json!({
                "AwsvpcConfiguration": {
                    "AssignPublicIp": "DISABLED",
                    "SecurityGroups": [get_att(spec.security_group, "GroupId")],
                    "Subnets": spec.subnets,
                }
            }),
        )
        .with_property("PropagateTags", json!("SERVICE"))
        .with_property("EnableECSManagedTags", json!(false))
        .with_property("SchedulingStrategy", json!("REPLICA"))
}

/// Entry of the service's LoadBalancers list
pub fn load_balancer_target(container_name: &str, container_port: u16, target_group: &str) -> Value {
    json!({
        "ContainerName": container_name,
        "ContainerPort": container_port,
        "TargetGroupArn": reference(target_group),
    })
}
