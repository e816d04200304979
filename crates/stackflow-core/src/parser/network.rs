//! network ノードのパース

use super::{all_strings, first_string, required};
use crate::error::{Result, StackError};
use crate::model::{NetworkContext, SecurityGroupRole};
use kdl::KdlNode;

/// network ノードをパース
///
/// ```kdl
/// network {
///     vpc "vpc-0123456789abcdef0"
///     security-group "ecs" "sg-..."
///     security-group "alb" "sg-..."
///     private-subnets "subnet-..." "subnet-..."
///     public-subnets "subnet-..." "subnet-..."
/// }
/// ```
pub fn parse_network(node: &KdlNode) -> Result<NetworkContext> {
    let mut vpc = None;
    let mut ecs_sg = None;
    let mut alb_sg = None;
    let mut network = NetworkContext::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "vpc" | "vpc-id" | "vpc_id" => vpc = first_string(child),
                "security-group" | "security_group" => {
                    let args = all_strings(child);
                    let [role, id] = args.as_slice() else {
                        return Err(StackError::InvalidConfig(
                            "security-group requires a role and an id: security-group \"ecs\" \"sg-...\""
                                .to_string(),
                        ));
                    };
                    let role: SecurityGroupRole =
                        role.parse().map_err(StackError::InvalidConfig)?;
                    match role {
                        SecurityGroupRole::Ecs => ecs_sg = Some(id.clone()),
                        SecurityGroupRole::Alb => alb_sg = Some(id.clone()),
                    }
                }
                "private-subnets" | "private_subnets" => {
                    network.private_subnets = all_strings(child);
                }
                "public-subnets" | "public_subnets" => {
                    network.public_subnets = all_strings(child);
                }
                other => {
                    tracing::warn!(field = %other, "Ignoring unknown field in network block");
                }
            }
        }
    }

    network.vpc_id = required(vpc, "network", "vpc")?;
    network.ecs_security_group = required(ecs_sg, "network", "security-group \"ecs\"")?;
    network.alb_security_group = required(alb_sg, "network", "security-group \"alb\"")?;

    Ok(network)
}
