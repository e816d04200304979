use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "スタック定義ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: stack.kdl, stack.local.kdl, .stack.kdl, .stack.local.kdl\n\
        - ./.stackflow/ ディレクトリ\n\
        - ~/.config/stackflow/stack.kdl\n\
        または STACKFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    StackFileNotFound,

    #[error("STACKFLOW_CONFIG_PATH が存在しないファイルを指しています: {0}")]
    ConfiguredPathMissing(PathBuf),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
