use crate::project::{Project, with_hint};
use colored::Colorize;
use stackflow_aws::ApplicationStack;
use stackflow_cloud::{OutputStore, TemplateFormat};
use stackflow_core::ImageTag;
use std::path::Path;

pub async fn handle(
    project: &Project,
    image_tag: Option<&str>,
    format: TemplateFormat,
    out: &Path,
) -> anyhow::Result<()> {
    println!("{}", "スタックを合成中...".blue());
    project.print_header();

    // テンプレートを書く前にタグを検証
    let image_tag = image_tag.map(ImageTag::parse).transpose()?;

    let stack = project.application_stack().await?;
    let template = stack.synth().map_err(with_hint)?;
    let parameters = image_tag.as_ref().map(ApplicationStack::parameter_values);

    let store = OutputStore::new(project.resolve(out));
    let written = store
        .write(stack.stack_name(), &template, format, parameters.as_ref())
        .await?;

    println!();
    println!("{}", "✓ 合成が完了しました".green().bold());
    println!(
        "  テンプレート: {}",
        written.template.display().to_string().cyan()
    );
    match (&written.parameters, &image_tag) {
        (Some(path), Some(tag)) => {
            println!(
                "  パラメータ:   {} (ImageTag={})",
                path.display().to_string().cyan(),
                tag
            );
        }
        _ => {
            println!(
                "  {}",
                "⚠ イメージタグが未指定のためパラメータファイルは書き出していません (--image-tag または IMAGE_TAG)"
                    .yellow()
            );
        }
    }
    println!("  リソース:     {}個", template.resources.len());

    Ok(())
}
