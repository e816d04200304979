mod commands;
mod project;

use clap::{Parser, Subcommand};
use stackflow_cloud::{DEFAULT_OUT_DIR, TemplateFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stackflow")]
#[command(about = "書いたスタック定義が、そのままデプロイ可能なテンプレートになる。", long_about = None)]
struct Cli {
    /// スタック定義ファイル（省略時は stack.kdl を検索、STACKFLOW_CONFIG_PATH でも指定可）
    #[arg(short = 'f', long = "file", global = true)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// CloudFormation テンプレートとパラメータファイルを書き出す
    Synth {
        /// デプロイするイメージタグ（ビルド番号など）
        #[arg(short = 't', long, env = "IMAGE_TAG")]
        image_tag: Option<String>,
        /// テンプレート形式 (json, yaml)
        #[arg(long, default_value = "json")]
        format: TemplateFormat,
        /// 出力ディレクトリ（相対パスはプロジェクトルート基準）
        #[arg(short, long, env = "STACKFLOW_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
        out: PathBuf,
    },
    /// スタック定義とリソースグラフを検証
    Validate {
        /// イメージタグも検証する
        #[arg(short = 't', long, env = "IMAGE_TAG")]
        image_tag: Option<String>,
    },
    /// 前回の合成結果との差分を表示
    Diff {
        /// 比較するイメージタグ（前回のパラメータファイルがあれば解決後の値で比較）
        #[arg(short = 't', long, env = "IMAGE_TAG")]
        image_tag: Option<String>,
        /// 出力ディレクトリ（相対パスはプロジェクトルート基準）
        #[arg(short, long, env = "STACKFLOW_OUT_DIR", default_value = DEFAULT_OUT_DIR)]
        out: PathBuf,
        /// 差分があれば終了コード 1 で終了
        #[arg(long)]
        fail: bool,
    },
    /// リソースの構築順序と依存関係を表示
    Graph,
    /// EC2 API で VPC のサブネットを調べてコンテキストキャッシュに保存
    Lookup,
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout はコマンド出力用なのでログは stderr へ
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let file = cli.file.as_deref();

    match cli.command {
        Commands::Synth {
            image_tag,
            format,
            out,
        } => {
            let project = project::Project::load(file)?;
            commands::synth::handle(&project, image_tag.as_deref(), format, &out).await?;
        }
        Commands::Validate { image_tag } => {
            // 形式エラーは一覧表示したいので未検証のままロード
            let project = project::Project::load_unchecked(file)?;
            commands::validate::handle(&project, image_tag.as_deref()).await?;
        }
        Commands::Diff {
            image_tag,
            out,
            fail,
        } => {
            let project = project::Project::load(file)?;
            commands::diff::handle(&project, image_tag.as_deref(), &out, fail).await?;
        }
        Commands::Graph => {
            let project = project::Project::load(file)?;
            commands::graph::handle(&project).await?;
        }
        Commands::Lookup => {
            let project = project::Project::load(file)?;
            commands::lookup::handle(&project).await?;
        }
        Commands::Version => {
            println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
