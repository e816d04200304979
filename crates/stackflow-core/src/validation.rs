//! 識別子の形式検証
//!
//! 既存リソースが実在するかどうかはここでは確認しない（デプロイ時に
//! CloudFormation が検出する）。ここで弾くのは形式として明らかに誤った値だけ。

use crate::error::{Result, StackError};
use crate::model::StackDefinition;
use regex::Regex;
use std::sync::LazyLock;

static ACCOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{12}$").unwrap());
static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").unwrap());
static STACK_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9-]{0,127}$").unwrap());
static ENVIRONMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,15}$").unwrap());
static CERTIFICATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:acm:([a-z0-9-]+):\d{12}:certificate/[A-Za-z0-9-]+$").unwrap()
});
static REPOSITORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9]+(?:[._-][a-z0-9]+)*/)*[a-z0-9]+(?:[._-][a-z0-9]+)*$").unwrap()
});
static LOG_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\.\-_/#A-Za-z0-9]{1,512}$").unwrap());
/// イメージタグの形式（CloudFormation パラメータの AllowedPattern にも使う）
pub const IMAGE_TAG_PATTERN: &str = r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$";

static IMAGE_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(IMAGE_TAG_PATTERN).unwrap());

/// 検証で見つかった問題 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// 項目名（network.vpc など）
    pub field: String,
    /// 実際の値
    pub value: String,
    /// 期待する形式
    pub expected: String,
}

impl ValidationIssue {
    fn new(field: &str, value: &str, expected: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: '{}' ({})", self.field, self.value, self.expected)
    }
}

/// `<prefix>-` に続く 8 桁または 17 桁の16進数
pub fn is_valid_resource_id(prefix: &str, value: &str) -> bool {
    let Some(hex) = value
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };
    (hex.len() == 8 || hex.len() == 17)
        && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

pub fn is_valid_image_tag(value: &str) -> bool {
    IMAGE_TAG_RE.is_match(value)
}

/// 証明書 ARN のリージョン部分
pub fn certificate_region(arn: &str) -> Option<&str> {
    CERTIFICATE_RE
        .captures(arn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// スタック定義全体を検証して問題を列挙
pub fn validate_definition(definition: &StackDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let settings = &definition.settings;
    let network = &definition.network;
    let lookups = &definition.lookups;

    if !STACK_NAME_RE.is_match(&settings.name) {
        issues.push(ValidationIssue::new(
            "stack",
            &settings.name,
            "英字で始まる英数字と '-' で128文字以内",
        ));
    }
    if !ACCOUNT_RE.is_match(&settings.account) {
        issues.push(ValidationIssue::new(
            "stack.account",
            &settings.account,
            "12桁の数字",
        ));
    }
    if !REGION_RE.is_match(&settings.region) {
        issues.push(ValidationIssue::new(
            "stack.region",
            &settings.region,
            "ap-south-1 のようなリージョンコード",
        ));
    }
    if settings.application.trim().is_empty() {
        issues.push(ValidationIssue::new(
            "stack.application",
            &settings.application,
            "空でない文字列",
        ));
    }
    if !ENVIRONMENT_RE.is_match(&settings.environment) {
        issues.push(ValidationIssue::new(
            "stack.environment",
            &settings.environment,
            "英小文字・数字・'-' で16文字以内（リソース名のプレフィックスになるため）",
        ));
    }

    if !is_valid_resource_id("vpc", &network.vpc_id) {
        issues.push(ValidationIssue::new(
            "network.vpc",
            &network.vpc_id,
            "vpc-xxxxxxxx 形式",
        ));
    }
    for (field, value) in [
        ("network.security-group ecs", &network.ecs_security_group),
        ("network.security-group alb", &network.alb_security_group),
    ] {
        if !is_valid_resource_id("sg", value) {
            issues.push(ValidationIssue::new(field, value, "sg-xxxxxxxx 形式"));
        }
    }
    for (field, subnets) in [
        ("network.private-subnets", &network.private_subnets),
        ("network.public-subnets", &network.public_subnets),
    ] {
        for subnet in subnets {
            if !is_valid_resource_id("subnet", subnet) {
                issues.push(ValidationIssue::new(field, subnet, "subnet-xxxxxxxx 形式"));
            }
        }
    }

    if lookups.repository.len() < 2
        || lookups.repository.len() > 256
        || !REPOSITORY_RE.is_match(&lookups.repository)
    {
        issues.push(ValidationIssue::new(
            "lookups.repository",
            &lookups.repository,
            "ECR リポジトリ名",
        ));
    }
    if !LOG_GROUP_RE.is_match(&lookups.log_group) {
        issues.push(ValidationIssue::new(
            "lookups.log-group",
            &lookups.log_group,
            "CloudWatch Logs ロググループ名",
        ));
    }
    match certificate_region(&lookups.certificate_arn) {
        None => issues.push(ValidationIssue::new(
            "lookups.certificate",
            &lookups.certificate_arn,
            "arn:aws:acm:<region>:<account>:certificate/<id> 形式",
        )),
        Some(region) if REGION_RE.is_match(&settings.region) && region != settings.region => {
            issues.push(ValidationIssue::new(
                "lookups.certificate",
                &lookups.certificate_arn,
                &format!("ALB と同じリージョン ({}) の証明書", settings.region),
            ))
        }
        Some(_) => {}
    }
    if !is_valid_resource_id("ami", &lookups.machine_image) {
        issues.push(ValidationIssue::new(
            "lookups.machine-image",
            &lookups.machine_image,
            "ami-xxxxxxxx 形式",
        ));
    }

    issues
}

/// 問題が1件でもあればエラー
pub fn ensure_valid(definition: &StackDefinition) -> Result<()> {
    let issues = validate_definition(definition);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(StackError::Validation(issues))
    }
}
