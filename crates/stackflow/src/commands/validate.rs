use crate::project::{Project, with_hint};
use colored::Colorize;
use stackflow_core::ImageTag;

pub async fn handle(project: &Project, image_tag: Option<&str>) -> anyhow::Result<()> {
    println!("{}", "スタック定義を検証中...".blue());
    project.print_header();

    let issues = stackflow_core::validate_definition(&project.definition);
    if !issues.is_empty() {
        eprintln!();
        eprintln!("{}", "✗ 識別子の形式エラー".red().bold());
        for issue in &issues {
            eprintln!("  - {}", issue);
        }
        std::process::exit(1);
    }

    if let Some(tag) = image_tag
        && let Err(e) = ImageTag::parse(tag)
    {
        eprintln!();
        eprintln!("{}", "✗ イメージタグエラー".red().bold());
        eprintln!("  {}", e);
        std::process::exit(1);
    }

    let stack = project.application_stack().await?;
    let graph = match stack.build() {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ リソースグラフの構築に失敗しました".red().bold());
            eprintln!("  {}", with_hint(e));
            std::process::exit(1);
        }
    };

    let definition = &project.definition;
    println!("{}", "✓ スタック定義は正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  スタック: {}", definition.settings.name.cyan());
    println!(
        "  アカウント / リージョン: {} / {}",
        definition.settings.account, definition.settings.region
    );
    println!(
        "  アプリケーション / 環境: {} / {}",
        definition.settings.application, definition.settings.environment
    );
    println!("  VPC: {}", definition.network.vpc_id);
    if !definition.network.has_explicit_subnets() {
        println!("    (サブネットはコンテキストキャッシュから取得)");
    }
    println!("  リソース: {}個", graph.len());
    println!("  外部参照: {}個", graph.imports().count());
    if let Some(tag) = image_tag {
        println!("  イメージタグ: {}", tag.cyan());
    }

    Ok(())
}
