//! Application load balancer, target group, listeners and rules

use serde_json::{Value, json};
use stackflow_cloud::Resource;
use stackflow_cloud::intrinsic::{get_att, reference};

pub const LOAD_BALANCER: &str = "AWS::ElasticLoadBalancingV2::LoadBalancer";
pub const TARGET_GROUP: &str = "AWS::ElasticLoadBalancingV2::TargetGroup";
pub const LISTENER: &str = "AWS::ElasticLoadBalancingV2::Listener";
pub const LISTENER_RULE: &str = "AWS::ElasticLoadBalancingV2::ListenerRule";

/// Internet-facing application load balancer
pub fn load_balancer(
    logical_id: &str,
    name: &str,
    security_group: &str,
    subnets: &[String],
) -> Resource {
    Resource::new(logical_id, LOAD_BALANCER)
        .with_property("Name", json!(name))
        .with_property("Scheme", json!("internet-facing"))
        .with_property("Type", json!("application"))
        .with_property("SecurityGroups", json!([get_att(security_group, "GroupId")]))
        .with_property("Subnets", json!(subnets))
        .with_property(
            "LoadBalancerAttributes",
            json!([{ "Key": "deletion_protection.enabled", "Value": "false" }]),
        )
}

/// HTTP health check of a target group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck<'a> {
    pub path: &'a str,
    pub healthy_http_codes: &'a str,
    pub interval_seconds: u32,
}

/// HTTP target group of IP targets
pub fn target_group(
    logical_id: &str,
    vpc: &str,
    port: u16,
    health_check: &HealthCheck<'_>,
) -> Resource {
    Resource::new(logical_id, TARGET_GROUP)
        .with_property("Port", json!(port))
        .with_property("Protocol", json!("HTTP"))
        .with_property("TargetType", json!("ip"))
        .with_property("VpcId", reference(vpc))
        .with_property("HealthCheckPath", json!(health_check.path))
        .with_property(
            "HealthCheckIntervalSeconds",
            json!(health_check.interval_seconds),
        )
        .with_property(
            "Matcher",
            json!({ "HttpCode": health_check.healthy_http_codes }),
        )
        .with_property(
            "TargetGroupAttributes",
            json!([{ "Key": "stickiness.enabled", "Value": "false" }]),
        )
}

/// Redirect action (HTTP 302, like the console default)
pub fn redirect_action(protocol: &str, port: u16) -> Value {
    json!({
        "Type": "redirect",
        "RedirectConfig": {
            "Protocol": protocol,
            "Port": port.to_string(),
            "StatusCode": "HTTP_302",
        }
    })
}

pub fn fixed_response_action(status_code: u16, content_type: &str, body: &str) -> Value {
    json!({
        "Type": "fixed-response",
        "FixedResponseConfig": {
            "StatusCode": status_code.to_string(),
            "ContentType": content_type,
            "MessageBody": body,
        }
    })
}

pub fn forward_action(target_group: &str) -> Value {
    json!({ "Type": "forward", "TargetGroupArn": reference(target_group) })
}

/// Plain HTTP listener
pub fn http_listener(logical_id: &str, load_balancer: &str, port: u16, default_action: Value) -> Resource {
    Resource::new(logical_id, LISTENER)
        .with_property("LoadBalancerArn", reference(load_balancer))
        .with_property("Port", json!(port))
        .with_property("Protocol", json!("HTTP"))
        .with_property("DefaultActions", json!([default_action]))
}

/// TLS-terminating listener
pub fn https_listener(
    logical_id: &str,
    load_balancer: &str,
    port: u16,
    certificate: &str,
    default_action: Value,
) -> Resource {
    Resource::new(logical_id, LISTENER)
        .with_property("LoadBalancerArn", reference(load_balancer))
        .with_property("Port", json!(port))
        .with_property("Protocol", json!("HTTPS"))
        .with_property(
            "Certificates",
            json!([{ "CertificateArn": reference(certificate) }]),
        )
        .with_property("DefaultActions", json!([default_action]))
}

/// Host-header rule on a listener
pub fn host_header_rule(
    logical_id: &str,
    listener: &str,
    priority: u32,
    host_headers: &[&str],
    action: Value,
) -> Resource {
    Resource::new(logical_id, LISTENER_RULE)
        .with_property("ListenerArn", reference(listener))
        .with_property("Priority", json!(priority))
        .with_property(
            "Conditions",
            json!([{ "Field": "host-header", "HostHeaderConfig": { "Values": host_headers } }]),
        )
        .with_property("Actions", json!([action]))
}
