//! テンプレート展開機能
//!
//! Teraを使用してスタック定義ファイルの `{{ VAR }}` を展開します。

use crate::error::{Result, StackError};
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

/// 変数コンテキスト
pub type Variables = HashMap<String, serde_json::Value>;

/// テンプレートに渡してよい環境変数のプレフィックス
const ALLOWED_ENV_PREFIXES: &[&str] = &["STACKFLOW_", "CI_"];

/// プレフィックス以外で個別に許可する環境変数（認証情報は含めない）
const ALLOWED_ENV_NAMES: &[&str] = &["AWS_REGION", "AWS_DEFAULT_REGION", "AWS_ACCOUNT_ID"];

fn is_allowed_env(key: &str) -> bool {
    ALLOWED_ENV_PREFIXES
        .iter()
        .any(|prefix| key.starts_with(prefix))
        || ALLOWED_ENV_NAMES.contains(&key)
}

/// テンプレートプロセッサ
pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    /// 新しいテンプレートプロセッサを作成
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    /// 変数を追加
    pub fn add_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), &value);
    }

    /// 複数の変数を追加
    pub fn add_variables(&mut self, variables: Variables) {
        for (key, value) in variables {
            self.context.insert(key, &value);
        }
    }

    /// 環境変数を追加（STACKFLOW_*, CI_* と AWS_REGION などの一部のみ）
    #[tracing::instrument(skip(self))]
    pub fn add_env_variables(&mut self) {
        let mut count = 0;

        for (key, value) in std::env::vars() {
            if is_allowed_env(&key) {
                debug!(key = %key, "Adding environment variable");
                self.context.insert(key, &serde_json::Value::String(value));
                count += 1;
            }
        }

        info!(env_var_count = count, "Added filtered environment variables");
    }

    /// .env ファイルから変数を読み込んで追加
    ///
    /// .env は明示的に置かれたファイルなのでプレフィックス制限はかけない。
    #[tracing::instrument(skip(self))]
    pub fn add_env_file_variables(&mut self, env_file_path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(env_file_path).map_err(|e| StackError::IoError {
            path: env_file_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut count = 0;
        for line in content.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().trim_start_matches("export ").trim();
                let value = strip_quotes(value.trim());

                debug!(key = %key, "Adding variable from .env file");
                self.context
                    .insert(key, &serde_json::Value::String(value.to_string()));
                count += 1;
            }
        }

        info!(
            env_file = %env_file_path.display(),
            variable_count = count,
            "Loaded variables from .env file"
        );

        Ok(())
    }

    /// 文字列をテンプレートとして展開
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera
            .render_str(template, &self.context)
            .map_err(|e| StackError::TemplateRenderError(extract_tera_error_detail(&e)))
    }

    /// ファイルを読み込んでテンプレート展開
    pub fn render_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.render_str(&content).map_err(|e| match e {
            StackError::TemplateRenderError(message) => StackError::TemplateError {
                file: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// KDLファイルから変数定義を抽出
///
/// ファイル全体は `{{ ... }}` を含むため、そのままではKDLとしてパースできない。
/// 行頭の `variables {` を探し、対応する `}` までを取り出してパースする。
/// コメント行の `variables {` は対象外。
pub fn extract_variables(kdl_content: &str) -> Result<Variables> {
    use regex::Regex;

    let re = Regex::new(r"(?m)^[ \t]*variables[ \t]*\{")
        .map_err(|e| StackError::InvalidConfig(format!("正規表現のコンパイルエラー: {}", e)))?;

    let mut all_vars = HashMap::new();

    for header in re.find_iter(kdl_content) {
        let rest = &kdl_content[header.end()..];
        let var_content = block_body(rest).ok_or_else(|| {
            StackError::InvalidConfig("variables ブロックが閉じられていません".to_string())
        })?;

        let dummy_kdl = format!("extracted {{\n{}\n}}", var_content);
        let doc: kdl::KdlDocument = dummy_kdl.parse().map_err(|e| {
            StackError::InvalidConfig(format!("KDL パースエラー (変数抽出ブロック): {}", e))
        })?;

        if let Some(node) = doc.nodes().first()
            && let Some(children) = node.children()
        {
            for var_node in children.nodes() {
                let key = var_node.name().value().to_string();
                if let Some(entry) = var_node.entries().first() {
                    all_vars.insert(key, kdl_value_to_json(entry.value()));
                }
            }
        }
    }

    Ok(all_vars)
}

/// 開き `{` の直後から対応する `}` の手前までを返す
///
/// 文字列リテラルと `//` コメント内の括弧は数えない。
fn block_body(content: &str) -> Option<&str> {
    let mut depth = 1usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = content.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// クォートを除去するヘルパー関数
fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Teraエラーから詳細情報を抽出
fn extract_tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    let mut details = vec![e.to_string()];
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }

    let full_error = details.join(" | ");

    if full_error.contains("not found in context")
        && let Some(start) = full_error.find("Variable `")
        && let Some(end) = full_error[start..].find("` not found")
    {
        let var_name = &full_error[start + 10..start + end];
        return format!(
            "未定義の変数: `{}`\nヒント: variables ブロックで定義するか、.env ファイルか STACKFLOW_* 環境変数で渡してください",
            var_name
        );
    }

    full_error
}

fn kdl_value_to_json(value: &kdl::KdlValue) -> serde_json::Value {
    if let Some(s) = value.as_string() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        serde_json::Value::Number((i as i64).into())
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}
