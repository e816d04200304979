//! AWS side of stackflow
//!
//! Resource constructors for the services the application stack uses, the
//! stack builder itself, stack-wide tagging, and the EC2-backed VPC lookup.

pub mod error;
pub mod lookup;
pub mod resources;
pub mod stack;
pub mod tags;

pub use error::{AwsError, Result};
pub use lookup::{Ec2NetworkLookup, RouteTableInfo, SubnetInfo, classify_subnets};
pub use stack::{ApplicationStack, IMAGE_TAG_PARAMETER, ids};
pub use tags::{stack_tags, tag_resource};
