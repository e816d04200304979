//! スタック全体の定義

use super::{ExternalLookups, NetworkContext};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// スタック定義ファイル 1 つ分の内容
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackDefinition {
    /// stack ブロック
    pub settings: StackSettings,

    /// network ブロック（既存 VPC / セキュリティグループ）
    pub network: NetworkContext,

    /// lookups ブロック（既存リソースの参照）
    pub lookups: ExternalLookups,

    /// variables ブロック（テンプレート展開後に残った値）
    pub variables: HashMap<String, String>,
}

/// スタックの配置先とタグ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackSettings {
    /// CloudFormation スタック名
    pub name: String,

    /// AWS アカウント ID (12桁)
    pub account: String,

    /// リージョン（ap-south-1 など）
    pub region: String,

    /// Application タグ
    pub application: String,

    /// Environment タグ。クラスタ名・ALB 名のプレフィックスにもなる
    pub environment: String,
}

impl Default for StackSettings {
    fn default() -> Self {
        Self {
            name: String::new(),
            account: String::new(),
            region: String::new(),
            application: "sample-app".to_string(),
            environment: "uat".to_string(),
        }
    }
}
