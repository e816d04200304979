//! モデル定義
//!
//! スタック定義ファイルから読み込まれるデータモデルを定義します。
//! 各モデルは機能ごとにモジュールに分離されています。

mod image_tag;
mod lookups;
mod network;
mod stack;

// Re-exports
pub use image_tag::*;
pub use lookups::*;
pub use network::*;
pub use stack::*;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_definition() -> StackDefinition {
        StackDefinition {
            settings: StackSettings {
                name: "UatApplicationStack".to_string(),
                account: "123456789012".to_string(),
                region: "ap-south-1".to_string(),
                ..Default::default()
            },
            network: NetworkContext {
                vpc_id: "vpc-0123456789abcdef0".to_string(),
                ecs_security_group: "sg-0123456789abcdef0".to_string(),
                alb_security_group: "sg-0fedcba9876543210".to_string(),
                private_subnets: vec!["subnet-0aaaaaaaaaaaaaaaa".to_string()],
                public_subnets: vec![],
            },
            lookups: ExternalLookups {
                repository: "sample-api".to_string(),
                log_group: "/ecs/sample-api".to_string(),
                certificate_arn: "arn:aws:acm:ap-south-1:123456789012:certificate/abcd".to_string(),
                machine_image: "ami-0123456789abcdef0".to_string(),
            },
            variables: Default::default(),
        }
    }

    #[test]
    fn test_settings_defaults() {
        let settings = StackSettings::default();
        assert_eq!(settings.application, "sample-app");
        assert_eq!(settings.environment, "uat");
    }

    #[test]
    fn test_security_group_lookup_by_role() {
        let definition = sample_definition();
        assert_eq!(
            definition.network.security_group(SecurityGroupRole::Ecs),
            "sg-0123456789abcdef0"
        );
        assert_eq!(
            definition.network.security_group(SecurityGroupRole::Alb),
            "sg-0fedcba9876543210"
        );
    }

    #[test]
    fn test_has_explicit_subnets() {
        let mut definition = sample_definition();
        assert!(!definition.network.has_explicit_subnets());

        definition.network.public_subnets = vec!["subnet-0bbbbbbbbbbbbbbbb".to_string()];
        assert!(definition.network.has_explicit_subnets());
    }

    #[test]
    fn test_definition_serialization() {
        let definition = sample_definition();

        let json = serde_json::to_string(&definition).unwrap();
        assert!(json.contains("UatApplicationStack"));
        assert!(json.contains("vpc-0123456789abcdef0"));

        let deserialized: StackDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.settings.name, definition.settings.name);
        assert_eq!(deserialized.lookups.repository, "sample-api");
    }
}
