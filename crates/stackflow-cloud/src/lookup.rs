//! Network lookups
//!
//! A lookup resolves an existing VPC to the subnets the stack places
//! resources in. Results are cached (see [`crate::context`]) so synthesis
//! itself stays offline.

use crate::error::{CloudError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What to look up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcLookupRequest {
    pub account: String,
    pub region: String,
    pub vpc_id: String,
}

impl VpcLookupRequest {
    pub fn new(
        account: impl Into<String>,
        region: impl Into<String>,
        vpc_id: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
            vpc_id: vpc_id.into(),
        }
    }

    /// Key in the context cache
    pub fn cache_key(&self) -> String {
        format!(
            "vpc-provider:account={}:region={}:vpc-id={}",
            self.account, self.region, self.vpc_id
        )
    }
}

/// Result of a VPC lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpcContext {
    pub vpc_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpc_cidr_block: Option<String>,

    /// Availability zones, sorted
    #[serde(default)]
    pub availability_zones: Vec<String>,

    /// Subnets without a route to an internet gateway
    #[serde(default)]
    pub private_subnet_ids: Vec<String>,

    /// Subnets with a route to an internet gateway
    #[serde(default)]
    pub public_subnet_ids: Vec<String>,
}

impl VpcContext {
    pub fn is_usable(&self) -> bool {
        !self.private_subnet_ids.is_empty() && !self.public_subnet_ids.is_empty()
    }
}

/// Network lookup abstraction
///
/// Implemented by the EC2 API lookup and by a static lookup that returns
/// subnets written in the stack file.
#[async_trait]
pub trait NetworkLookup: Send + Sync {
    /// Returns the lookup name (e.g., "ec2", "static")
    fn name(&self) -> &str;

    async fn lookup_vpc(&self, request: &VpcLookupRequest) -> Result<VpcContext>;
}

/// Lookup answering from a fixed context
pub struct StaticNetworkLookup {
    context: VpcContext,
}

impl StaticNetworkLookup {
    pub fn new(context: VpcContext) -> Self {
        Self { context }
    }
}

#[async_trait]
impl NetworkLookup for StaticNetworkLookup {
    fn name(&self) -> &str {
        "static"
    }

    async fn lookup_vpc(&self, request: &VpcLookupRequest) -> Result<VpcContext> {
        if request.vpc_id != self.context.vpc_id {
            return Err(CloudError::LookupFailed(format!(
                "VPC {} is not configured (have {})",
                request.vpc_id, self.context.vpc_id
            )));
        }
        Ok(self.context.clone())
    }
}
