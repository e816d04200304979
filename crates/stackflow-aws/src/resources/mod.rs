//! CloudFormation resource constructors, one module per service
//!
//! Constructors take logical ids for everything they reference and return
//! a [`stackflow_cloud::Resource`]; wiring happens in the stack builder.

pub mod autoscaling;
pub mod ec2;
pub mod ecs;
pub mod elbv2;
pub mod iam;
