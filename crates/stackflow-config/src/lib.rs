pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};
use tracing::debug;

/// スタック定義ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "STACKFLOW_CONFIG_PATH";

/// プロジェクト内の設定ディレクトリ名
pub const PROJECT_DIR: &str = ".stackflow";

/// 検索するファイル名（優先順）
const CANDIDATES: [&str; 4] = [
    "stack.local.kdl",
    ".stack.local.kdl",
    "stack.kdl",
    ".stack.kdl",
];

/// stackflowの設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("stackflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// スタック定義ファイル (stack.kdl) を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 STACKFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. ./.stackflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/stackflow/stack.kdl (グローバル設定)
pub fn find_stack_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(&config_path);
        if path.exists() {
            debug!(path = %path.display(), "Using stack file from environment");
            return Ok(path);
        }
        return Err(ConfigError::ConfiguredPathMissing(path));
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_stack_file_in(&current_dir) {
        return Ok(path);
    }

    // 4. グローバル設定ファイル
    if let Some(config_dir) = dirs::config_dir() {
        let global_config = config_dir.join("stackflow").join("stack.kdl");
        if global_config.exists() {
            debug!(path = %global_config.display(), "Using global stack file");
            return Ok(global_config);
        }
    }

    Err(ConfigError::StackFileNotFound)
}

/// 指定ディレクトリとその .stackflow/ 内だけを検索
pub fn find_stack_file_in(dir: &Path) -> Option<PathBuf> {
    for filename in &CANDIDATES {
        let path = dir.join(filename);
        if path.exists() {
            return Some(path);
        }
    }

    let project_dir = dir.join(PROJECT_DIR);
    if project_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = project_dir.join(filename);
            if path.exists() {
                return Some(path);
            }
        }
    }

    None
}

/// スタック定義ファイルが置かれたプロジェクトルート
///
/// .stackflow/ 内のファイルならその親ディレクトリを返す
pub fn project_root_of(stack_file: &Path) -> PathBuf {
    let parent = stack_file.parent().unwrap_or(Path::new("."));
    if parent.file_name().and_then(|n| n.to_str()) == Some(PROJECT_DIR) {
        parent.parent().unwrap_or(parent).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let result = get_config_dir();
        assert!(result.is_ok());

        let config_dir = result.unwrap();
        assert!(config_dir.ends_with("stackflow"));
        assert!(config_dir.exists());
    }

    #[test]
    fn test_find_in_dir_plain() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("stack.kdl"), "// test").unwrap();

        let found = find_stack_file_in(temp_dir.path()).unwrap();
        assert!(found.ends_with("stack.kdl"));
    }

    #[test]
    fn test_find_in_dir_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("stack.kdl"), "// global").unwrap();
        fs::write(temp_dir.path().join("stack.local.kdl"), "// local").unwrap();

        // stack.local.kdl が優先される
        let found = find_stack_file_in(temp_dir.path()).unwrap();
        assert!(found.ends_with("stack.local.kdl"));
    }

    #[test]
    fn test_find_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(PROJECT_DIR);
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("stack.kdl"), "// in project dir").unwrap();

        let found = find_stack_file_in(temp_dir.path()).unwrap();
        assert!(found.ends_with(".stackflow/stack.kdl"));
        assert_eq!(project_root_of(&found), temp_dir.path());
    }

    #[test]
    fn test_find_in_empty_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(find_stack_file_in(temp_dir.path()).is_none());
    }

    #[test]
    fn test_project_root_of_plain_file() {
        let root = project_root_of(Path::new("/srv/app/stack.kdl"));
        assert_eq!(root, PathBuf::from("/srv/app"));
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("stack.kdl"), "// test").unwrap();
        std::env::set_current_dir(&temp_dir).unwrap();

        let result = find_stack_file();
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().ends_with("stack.kdl"));
    }

    #[test]
    #[serial]
    fn test_find_stack_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, config_path.to_str().unwrap());
        }

        let result = find_stack_file();

        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_stack_file_env_var_missing_file() {
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, "/nonexistent/stack.kdl");
        }

        let result = find_stack_file();

        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }

        assert!(matches!(result, Err(ConfigError::ConfiguredPathMissing(_))));
    }
}
