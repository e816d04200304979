use crate::validation::ValidationIssue;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("必須項目がありません: {block} ブロックの {field}")]
    MissingField { block: String, field: String },

    #[error("{0} ブロックがありません")]
    MissingBlock(String),

    #[error("テンプレートエラー: {file}\n理由: {message}")]
    TemplateError { file: PathBuf, message: String },

    #[error("テンプレート展開エラー: {0}")]
    TemplateRenderError(String),

    #[error("必須パラメータ {0} が指定されていません")]
    MissingParameter(String),

    #[error("識別子の検証に失敗しました:\n{}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, StackError>;
