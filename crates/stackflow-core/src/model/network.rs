//! 既存ネットワークへの参照

use serde::{Deserialize, Serialize};

/// セキュリティグループの役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityGroupRole {
    /// コンテナインスタンス / タスク側
    Ecs,
    /// ロードバランサー側
    Alb,
}

impl std::str::FromStr for SecurityGroupRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ecs" | "compute" => Ok(SecurityGroupRole::Ecs),
            "alb" | "load-balancer" => Ok(SecurityGroupRole::Alb),
            other => Err(format!(
                "不明なセキュリティグループの役割: {} (ecs / alb のいずれか)",
                other
            )),
        }
    }
}

impl std::fmt::Display for SecurityGroupRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SecurityGroupRole::Ecs => write!(f, "ecs"),
            SecurityGroupRole::Alb => write!(f, "alb"),
        }
    }
}

/// 既存 VPC とセキュリティグループ
///
/// いずれもこのスタックでは作成しない。サブネットが空の場合は
/// lookup コマンドで取得したコンテキストキャッシュを使う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkContext {
    /// VPC ID
    pub vpc_id: String,

    /// ECS 側セキュリティグループ ID
    pub ecs_security_group: String,

    /// ALB 側セキュリティグループ ID
    pub alb_security_group: String,

    /// プライベートサブネット（ASG / サービス配置先）
    pub private_subnets: Vec<String>,

    /// パブリックサブネット（internet-facing ALB 配置先）
    pub public_subnets: Vec<String>,
}

impl NetworkContext {
    pub fn security_group(&self, role: SecurityGroupRole) -> &str {
        match role {
            SecurityGroupRole::Ecs => &self.ecs_security_group,
            SecurityGroupRole::Alb => &self.alb_security_group,
        }
    }

    /// サブネットがスタック定義で明示されているか
    pub fn has_explicit_subnets(&self) -> bool {
        !self.private_subnets.is_empty() && !self.public_subnets.is_empty()
    }
}
