use anyhow::Context;
use colored::Colorize;
use stackflow_aws::{ApplicationStack, AwsError};
use stackflow_cloud::{ContextStore, NetworkLookup, StaticNetworkLookup};
use stackflow_core::StackDefinition;
use std::path::{Path, PathBuf};

/// 読み込んだスタック定義とその場所
pub struct Project {
    pub stack_file: PathBuf,
    pub root: PathBuf,
    pub definition: StackDefinition,
}

impl Project {
    /// スタック定義を検索・ロードし、識別子の形式も検証する
    pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
        let (stack_file, root) = locate(file)?;
        let definition = stackflow_core::load_stack(&stack_file, &root)?;
        Ok(Self {
            stack_file,
            root,
            definition,
        })
    }

    /// 形式検証なしでロード（validate コマンド用）
    pub fn load_unchecked(file: Option<&Path>) -> anyhow::Result<Self> {
        let (stack_file, root) = locate(file)?;
        let definition = stackflow_core::load_stack_unchecked(&stack_file, &root)?;
        Ok(Self {
            stack_file,
            root,
            definition,
        })
    }

    /// 相対パスはプロジェクトルート基準で解決
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// スタック定義のサブネット、なければコンテキストキャッシュからスタックを組み立てる
    pub async fn application_stack(&self) -> anyhow::Result<ApplicationStack> {
        let stack = ApplicationStack::new(self.definition.clone());

        let context = match stack.configured_vpc_context() {
            Some(context) => context,
            None => {
                let cache = ContextStore::new(&self.root)
                    .load()
                    .await
                    .context("コンテキストキャッシュの読み込みに失敗しました")?;
                match cache.vpc(&stack.lookup_request()) {
                    Some(context) => context,
                    None => return Ok(stack),
                }
            }
        };

        let lookup = StaticNetworkLookup::new(context);
        let context = lookup.lookup_vpc(&stack.lookup_request()).await?;
        tracing::debug!(vpc = %context.vpc_id, lookup = lookup.name(), "Resolved VPC context");
        Ok(stack.with_vpc_context(context))
    }

    pub fn print_header(&self) {
        println!(
            "スタック定義: {}",
            self.stack_file.display().to_string().cyan()
        );
    }
}

fn locate(file: Option<&Path>) -> anyhow::Result<(PathBuf, PathBuf)> {
    let stack_file = match file {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "スタック定義ファイルが見つかりません: {}",
                    path.display()
                );
            }
            path.to_path_buf()
        }
        None => stackflow_config::find_stack_file()?,
    };
    let root = stackflow_config::project_root_of(&stack_file);
    Ok((stack_file, root))
}

/// AWS 側のエラーに対処方法を添える
pub fn with_hint(error: AwsError) -> anyhow::Error {
    match error.suggestion() {
        Some(hint) => anyhow::anyhow!("{}\nヒント: {}", error, hint),
        None => error.into(),
    }
}
