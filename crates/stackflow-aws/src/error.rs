//! AWS stack error types

use stackflow_cloud::CloudError;
use thiserror::Error;

/// Errors raised while building the stack or talking to AWS
#[derive(Debug, Error)]
pub enum AwsError {
    /// Structural graph error (dangling reference, duplicate id, cycle)
    #[error(transparent)]
    Graph(#[from] CloudError),

    /// Neither the stack file nor the context cache lists subnets
    #[error(
        "No subnets known for {vpc_id}: list private-subnets/public-subnets in the network block or run `stackflow lookup`"
    )]
    MissingSubnets { vpc_id: String },

    /// Cached lookup belongs to another VPC
    #[error("Cached network context is for {found}, stack uses {expected}")]
    VpcContextMismatch { expected: String, found: String },

    #[error("Resource not found: {resource_type} '{resource_id}'")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    /// Generic AWS SDK error with code and message
    #[error("AWS error: {message}")]
    Sdk {
        code: Option<String>,
        message: String,
    },
}

impl AwsError {
    /// Build from any SDK error carrying error metadata
    pub fn from_sdk<E>(error: &E) -> Self
    where
        E: aws_sdk_ec2::error::ProvideErrorMetadata + std::fmt::Display,
    {
        AwsError::Sdk {
            code: error.code().map(str::to_string),
            message: error
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            AwsError::Sdk { code: Some(c), .. } => match c.as_str() {
                "UnauthorizedOperation" | "AccessDenied" => {
                    Some("The lookup needs ec2:DescribeVpcs, ec2:DescribeSubnets and ec2:DescribeRouteTables")
                }
                "AuthFailure" | "ExpiredToken" => Some("Refresh your AWS credentials"),
                _ => None,
            },
            AwsError::MissingSubnets { .. } => Some("Run `stackflow lookup` to cache the VPC's subnets"),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_is_transparent() {
        let err: AwsError = CloudError::DuplicateLogicalId("ApplicationCluster".to_string()).into();
        assert_eq!(err.to_string(), "Logical id already declared: ApplicationCluster");
    }

    #[test]
    fn test_suggestions() {
        let denied = AwsError::Sdk {
            code: Some("UnauthorizedOperation".to_string()),
            message: "denied".to_string(),
        };
        assert!(denied.suggestion().unwrap().contains("DescribeSubnets"));
        assert!(
            AwsError::MissingSubnets {
                vpc_id: "vpc-1".to_string()
            }
            .suggestion()
            .is_some()
        );
    }
}
