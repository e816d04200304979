//! stackflow のスタック定義
//!
//! stack.kdl を読み込み、テンプレート展開・パース・形式検証を行って
//! [`StackDefinition`] を生成します。リソースグラフの構築は
//! `stackflow-aws` の責務です。

pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod template;
pub mod validation;

pub use error::{Result, StackError};
pub use loader::{load_stack, load_stack_unchecked};
pub use model::*;
pub use parser::{parse_stack_file, parse_stack_string};
pub use validation::{IMAGE_TAG_PATTERN, ValidationIssue, ensure_valid, validate_definition};
