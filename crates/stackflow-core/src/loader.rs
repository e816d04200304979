//! 統合ローダー
//!
//! 変数収集、テンプレート展開、パース、検証を統合

use crate::error::Result;
use crate::model::StackDefinition;
use crate::parser::parse_stack_string;
use crate::template::{TemplateProcessor, extract_variables};
use crate::validation::ensure_valid;
use std::path::Path;
use tracing::{debug, info, instrument};

/// スタック定義ファイルをロードして検証済みのStackDefinitionを生成
///
/// 以下の処理を実行:
/// 1. variables ブロックの収集
/// 2. .env（プロジェクトルート）の読み込み
/// 3. STACKFLOW_* / CI_* と AWS_REGION などの環境変数の追加（最優先）
/// 4. テンプレート展開
/// 5. KDLパース
/// 6. 識別子の形式検証
#[instrument(skip_all, fields(stack_file = %stack_file.display()))]
pub fn load_stack(stack_file: &Path, project_root: &Path) -> Result<StackDefinition> {
    let definition = load_stack_unchecked(stack_file, project_root)?;

    debug!("Validating identifiers");
    ensure_valid(&definition)?;

    info!(
        stack = %definition.settings.name,
        region = %definition.settings.region,
        "Stack definition loaded"
    );
    Ok(definition)
}

/// 形式検証を行わずにロード
#[instrument(skip_all, fields(stack_file = %stack_file.display()))]
pub fn load_stack_unchecked(stack_file: &Path, project_root: &Path) -> Result<StackDefinition> {
    debug!("Step 1: Preparing template processor");
    let mut processor = prepare_template_processor(stack_file, project_root)?;

    debug!("Step 2: Expanding templates");
    let expanded = processor.render_file(stack_file)?;
    info!(content_size = expanded.len(), "Template expansion complete");

    debug!("Step 3: Parsing KDL");
    parse_stack_string(&expanded)
}

/// テンプレートプロセッサを準備
fn prepare_template_processor(stack_file: &Path, project_root: &Path) -> Result<TemplateProcessor> {
    let mut processor = TemplateProcessor::new();

    processor.add_variable(
        "PROJECT_ROOT",
        serde_json::Value::String(project_root.to_string_lossy().to_string()),
    );

    // 1. ファイル内の variables ブロック
    let content = std::fs::read_to_string(stack_file).map_err(|e| {
        crate::error::StackError::IoError {
            path: stack_file.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    processor.add_variables(extract_variables(&content)?);

    // 2. .env（variables を上書き）
    let env_file = project_root.join(".env");
    if env_file.is_file() {
        processor.add_env_file_variables(&env_file)?;
    }

    // 3. 環境変数（最優先）
    processor.add_env_variables();

    Ok(processor)
}
