use serde::{Deserialize, Serialize};

/// 名前・ARN で参照する既存リソース
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalLookups {
    /// ECR リポジトリ名
    pub repository: String,

    /// CloudWatch Logs ロググループ名
    pub log_group: String,

    /// ACM 証明書 ARN
    pub certificate_arn: String,

    /// コンテナインスタンスの AMI ID（stack.region 用）
    pub machine_image: String,
}
