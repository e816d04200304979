//! VPC lookup against the EC2 API
//!
//! A subnet is public when its route table (explicitly associated, or the
//! VPC's main table otherwise) routes through an internet gateway.

use crate::error::{AwsError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ec2::Client;
use aws_sdk_ec2::types::Filter;
use stackflow_cloud::{CloudError, NetworkLookup, VpcContext, VpcLookupRequest};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

/// Subnet as seen by the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetInfo {
    pub subnet_id: String,
    pub availability_zone: String,
}

/// Route table as seen by the classifier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTableInfo {
    pub is_main: bool,
    pub subnet_ids: Vec<String>,
    pub routes_to_internet_gateway: bool,
}

/// Split subnets into private and public
///
/// Output lists are sorted by availability zone, then subnet id.
pub fn classify_subnets(
    vpc_id: &str,
    vpc_cidr_block: Option<String>,
    subnets: &[SubnetInfo],
    route_tables: &[RouteTableInfo],
) -> VpcContext {
    let main_is_public = route_tables
        .iter()
        .find(|t| t.is_main)
        .is_some_and(|t| t.routes_to_internet_gateway);

    let is_public = |subnet_id: &str| {
        route_tables
            .iter()
            .find(|t| t.subnet_ids.iter().any(|s| s == subnet_id))
            .map(|t| t.routes_to_internet_gateway)
            .unwrap_or(main_is_public)
    };

    let mut sorted: Vec<&SubnetInfo> = subnets.iter().collect();
    sorted.sort_by(|a, b| {
        (a.availability_zone.as_str(), a.subnet_id.as_str())
            .cmp(&(b.availability_zone.as_str(), b.subnet_id.as_str()))
    });

    let mut context = VpcContext {
        vpc_id: vpc_id.to_string(),
        vpc_cidr_block,
        ..Default::default()
    };
    let mut zones = BTreeSet::new();
    for subnet in sorted {
        zones.insert(subnet.availability_zone.clone());
        if is_public(&subnet.subnet_id) {
            context.public_subnet_ids.push(subnet.subnet_id.clone());
        } else {
            context.private_subnet_ids.push(subnet.subnet_id.clone());
        }
    }
    context.availability_zones = zones.into_iter().collect();
    context
}

/// EC2-backed [`NetworkLookup`]
pub struct Ec2NetworkLookup {
    client: Client,
}

impl Ec2NetworkLookup {
    /// Loads credentials from the environment for `region`
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_client(Client::new(&config))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    fn vpc_filter(vpc_id: &str) -> Filter {
        Filter::builder().name("vpc-id").values(vpc_id).build()
    }

    /// Describe the VPC, its subnets and route tables
    #[instrument(skip(self))]
    pub async fn describe(&self, vpc_id: &str) -> Result<VpcContext> {
        let vpcs = self
            .client
            .describe_vpcs()
            .vpc_ids(vpc_id)
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))?;
        let vpc = vpcs.vpcs().first().ok_or_else(|| AwsError::NotFound {
            resource_type: "VPC",
            resource_id: vpc_id.to_string(),
        })?;
        let cidr = vpc.cidr_block().map(str::to_string);

        let subnets: Vec<SubnetInfo> = self
            .client
            .describe_subnets()
            .filters(Self::vpc_filter(vpc_id))
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))?
            .subnets()
            .iter()
            .filter_map(|s| {
                Some(SubnetInfo {
                    subnet_id: s.subnet_id()?.to_string(),
                    availability_zone: s.availability_zone().unwrap_or_default().to_string(),
                })
            })
            .collect();
        debug!(count = subnets.len(), "Described subnets");

        let route_tables: Vec<RouteTableInfo> = self
            .client
            .describe_route_tables()
            .filters(Self::vpc_filter(vpc_id))
            .send()
            .await
            .map_err(|e| AwsError::from_sdk(&e))?
            .route_tables()
            .iter()
            .map(|table| RouteTableInfo {
                is_main: table.associations().iter().any(|a| a.main() == Some(true)),
                subnet_ids: table
                    .associations()
                    .iter()
                    .filter_map(|a| a.subnet_id().map(str::to_string))
                    .collect(),
                routes_to_internet_gateway: table
                    .routes()
                    .iter()
                    .any(|r| r.gateway_id().is_some_and(|g| g.starts_with("igw-"))),
            })
            .collect();
        debug!(count = route_tables.len(), "Described route tables");

        let context = classify_subnets(vpc_id, cidr, &subnets, &route_tables);
        info!(
            private = context.private_subnet_ids.len(),
            public = context.public_subnet_ids.len(),
            "VPC lookup complete"
        );
        Ok(context)
    }
}

#[async_trait]
impl NetworkLookup for Ec2NetworkLookup {
    fn name(&self) -> &str {
        "ec2"
    }

    async fn lookup_vpc(&self, request: &VpcLookupRequest) -> stackflow_cloud::Result<VpcContext> {
        self.describe(&request.vpc_id).await.map_err(|e| {
            let message = match e.suggestion() {
                Some(hint) => format!("{} ({})", e, hint),
                None => e.to_string(),
            };
            CloudError::LookupFailed(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subnet(id: &str, az: &str) -> SubnetInfo {
        SubnetInfo {
            subnet_id: id.to_string(),
            availability_zone: az.to_string(),
        }
    }

    fn subnets() -> Vec<SubnetInfo> {
        vec![
            subnet("subnet-0d", "ap-south-1b"),
            subnet("subnet-0a", "ap-south-1a"),
            subnet("subnet-0c", "ap-south-1b"),
            subnet("subnet-0b", "ap-south-1a"),
        ]
    }

    #[test]
    fn test_classify_by_internet_gateway_route() {
        let tables = vec![
            RouteTableInfo {
                subnet_ids: vec!["subnet-0a".to_string(), "subnet-0d".to_string()],
                routes_to_internet_gateway: true,
                ..Default::default()
            },
            RouteTableInfo {
                subnet_ids: vec!["subnet-0b".to_string(), "subnet-0c".to_string()],
                ..Default::default()
            },
        ];

        let context = classify_subnets("vpc-1", None, &subnets(), &tables);
        assert_eq!(context.public_subnet_ids, vec!["subnet-0a", "subnet-0d"]);
        assert_eq!(context.private_subnet_ids, vec!["subnet-0b", "subnet-0c"]);
        assert_eq!(context.availability_zones, vec!["ap-south-1a", "ap-south-1b"]);
        assert!(context.is_usable());
    }

    #[test]
    fn test_unassociated_subnets_follow_main_table() {
        let tables = vec![
            RouteTableInfo {
                is_main: true,
                ..Default::default()
            },
            RouteTableInfo {
                subnet_ids: vec!["subnet-0a".to_string()],
                routes_to_internet_gateway: true,
                ..Default::default()
            },
        ];

        let context = classify_subnets(
            "vpc-1",
            Some("10.0.0.0/16".to_string()),
            &subnets(),
            &tables,
        );
        assert_eq!(context.public_subnet_ids, vec!["subnet-0a"]);
        assert_eq!(
            context.private_subnet_ids,
            vec!["subnet-0b", "subnet-0c", "subnet-0d"]
        );
        assert_eq!(context.vpc_cidr_block.as_deref(), Some("10.0.0.0/16"));
    }

    #[test]
    fn test_no_route_tables_means_private() {
        let context = classify_subnets("vpc-1", None, &subnets(), &[]);
        assert!(context.public_subnet_ids.is_empty());
        assert_eq!(context.private_subnet_ids.len(), 4);
        assert!(!context.is_usable());
    }
}
