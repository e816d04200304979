//! KDLパーサー
//!
//! stackflow のスタック定義ファイル (stack.kdl) をパースします。
//! ブロックごとのパース処理はモジュールに分離されています。

mod lookups;
mod network;
mod stack;

use lookups::parse_lookups;
use network::parse_network;
use stack::parse_stack_settings;

use crate::error::{Result, StackError};
use crate::model::StackDefinition;
use kdl::{KdlDocument, KdlNode};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてStackDefinitionを生成
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackDefinition> {
    let content = fs::read_to_string(path.as_ref())?;
    parse_stack_string(&content)
}

/// KDL文字列をパース
///
/// 形式の検証 (`validation::ensure_valid`) はここでは行わない。
pub fn parse_stack_string(content: &str) -> Result<StackDefinition> {
    let doc: KdlDocument = content.parse()?;

    let mut settings = None;
    let mut network = None;
    let mut lookups = None;
    let mut variables: HashMap<String, String> = HashMap::new();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                settings = Some(parse_stack_settings(node)?);
            }
            "network" => {
                network = Some(parse_network(node)?);
            }
            "lookups" => {
                lookups = Some(parse_lookups(node)?);
            }
            "variables" => {
                // テンプレート展開で使われた後も参照用に保持
                if let Some(vars) = node.children() {
                    for var in vars.nodes() {
                        let key = var.name().value().to_string();
                        let value = first_string(var).unwrap_or_default();
                        variables.insert(key, value);
                    }
                }
            }
            other => {
                tracing::warn!(node = %other, "Ignoring unknown top-level node");
            }
        }
    }

    Ok(StackDefinition {
        settings: settings.ok_or_else(|| StackError::MissingBlock("stack".to_string()))?,
        network: network.ok_or_else(|| StackError::MissingBlock("network".to_string()))?,
        lookups: lookups.ok_or_else(|| StackError::MissingBlock("lookups".to_string()))?,
        variables,
    })
}

/// 最初の引数を文字列として取得
pub(crate) fn first_string(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// 全ての文字列引数を取得
pub(crate) fn all_strings(node: &KdlNode) -> Vec<String> {
    node.entries()
        .iter()
        .filter(|e| e.name().is_none())
        .filter_map(|e| e.value().as_string().map(|s| s.to_string()))
        .collect()
}

/// 必須の文字列フィールド
pub(crate) fn required(value: Option<String>, block: &str, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StackError::MissingField {
            block: block.to_string(),
            field: field.to_string(),
        })
}
