use crate::project::{Project, with_hint};
use colored::Colorize;
use stackflow_cloud::NodeKind;

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    let stack = project.application_stack().await?;
    let graph = stack.build().map_err(with_hint)?;

    println!("{}", "外部参照:".bold());
    for import in graph.imports() {
        println!(
            "  {} {} = {}",
            import.logical_id.cyan(),
            format!("({})", import.resource_type).dimmed(),
            import.identifier
        );
    }

    println!();
    println!("{}", "構築順序:".bold());
    for (index, id) in graph.topological_order()?.iter().enumerate() {
        let resource_type = graph
            .resource(id)
            .map(|r| r.resource_type.as_str())
            .unwrap_or_default();
        println!(
            "  {:>2}. {} {}",
            index + 1,
            id.green(),
            format!("({})", resource_type).dimmed()
        );

        for target in graph.references(id)? {
            let marker = match graph.kind_of(&target) {
                Some(NodeKind::Parameter) => "param",
                Some(NodeKind::Import) => "lookup",
                _ => "",
            };
            if marker.is_empty() {
                println!("      └ {}", target);
            } else {
                println!("      └ {} {}", target, format!("[{}]", marker).dimmed());
            }
        }
    }

    Ok(())
}
