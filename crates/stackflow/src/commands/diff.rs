use crate::project::{Project, with_hint};
use colored::Colorize;
use stackflow_aws::ApplicationStack;
use stackflow_cloud::{ActionType, OutputStore, Plan};
use stackflow_core::ImageTag;
use std::path::Path;

pub async fn handle(
    project: &Project,
    image_tag: Option<&str>,
    out: &Path,
    fail: bool,
) -> anyhow::Result<()> {
    println!("{}", "前回の合成結果と比較中...".blue());
    project.print_header();

    let image_tag = image_tag.map(ImageTag::parse).transpose()?;
    let stack = project.application_stack().await?;
    let next = stack.synth().map_err(with_hint)?;

    let store = OutputStore::new(project.resolve(out));
    let previous = store.load_previous(stack.stack_name()).await?;
    let previous_parameters = store.load_previous_parameters(stack.stack_name()).await?;

    // 両方のタグが分かるときはデプロイ時に見える値で比較する
    let plan = match (&previous, &previous_parameters, &image_tag) {
        (Some(previous), Some(old_values), Some(tag)) => {
            let new_values = ApplicationStack::parameter_values(tag);
            Plan::between(
                Some(&previous.resolved(old_values)?),
                &next.resolved(&new_values)?,
            )
        }
        _ => Plan::between(previous.as_ref(), &next),
    };

    println!();
    if previous.is_none() {
        println!(
            "{}",
            format!(
                "前回の合成結果がありません ({})。すべて新規作成として表示します。",
                store.out_dir().display()
            )
            .yellow()
        );
        println!();
    }

    if !plan.has_changes {
        println!("{}", "✓ 差分はありません".green().bold());
        return Ok(());
    }

    for action in &plan.actions {
        match action.action_type {
            ActionType::Create => {
                println!("  {} {} ({})", "+".green(), action.id.green(), action.resource_type);
            }
            ActionType::Update => {
                let replacement = action
                    .details
                    .get("replacement")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if replacement {
                    println!(
                        "  {} {} ({}) {}",
                        "±".yellow(),
                        action.id.yellow(),
                        action.resource_type,
                        "置き換え".red()
                    );
                } else {
                    println!(
                        "  {} {} ({})",
                        "~".yellow(),
                        action.id.yellow(),
                        action.resource_type
                    );
                    for property in action.changed_properties() {
                        println!("      └ {}", property);
                    }
                }
            }
            ActionType::Delete => {
                println!("  {} {} ({})", "-".red(), action.id.red(), action.resource_type);
            }
            ActionType::NoOp => {}
        }
    }

    println!();
    println!("{}", plan.summary().to_string().bold());

    if fail {
        std::process::exit(1);
    }
    Ok(())
}
