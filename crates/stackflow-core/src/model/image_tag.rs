use crate::error::{Result, StackError};
use crate::validation;
use serde::{Deserialize, Serialize};

/// デプロイ時に CI から渡されるイメージタグ
///
/// スタック内で唯一デプロイごとに変わる値。テンプレートには
/// `ImageTag` パラメータへの Ref として埋め込まれ、値そのものは
/// パラメータファイルにのみ書き出される。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageTag(String);

impl ImageTag {
    /// タグ文字列を検証して生成
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(StackError::MissingParameter("ImageTag".to_string()));
        }
        if !validation::is_valid_image_tag(value) {
            return Err(StackError::InvalidConfig(format!(
                "イメージタグ '{}' は無効です（英数字・'_'・'.'・'-' で最大128文字、先頭は英数字か '_'）",
                value
            )));
        }
        Ok(Self(value.to_string()))
    }

    /// 未指定ならエラーにする
    pub fn required(value: Option<&str>) -> Result<Self> {
        match value {
            Some(v) => Self::parse(v),
            None => Err(StackError::MissingParameter("ImageTag".to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ImageTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
