use crate::project::Project;
use colored::Colorize;
use stackflow_aws::{ApplicationStack, Ec2NetworkLookup};
use stackflow_cloud::{ContextStore, NetworkLookup};

pub async fn handle(project: &Project) -> anyhow::Result<()> {
    let settings = &project.definition.settings;
    let request = ApplicationStack::new(project.definition.clone()).lookup_request();

    println!(
        "{}",
        format!("VPC {} を調べています ({})...", request.vpc_id, settings.region).blue()
    );

    let lookup = Ec2NetworkLookup::new(&settings.region).await;
    let context = lookup.lookup_vpc(&request).await?;

    if !context.is_usable() {
        println!(
            "{}",
            "⚠ プライベート / パブリックの両方のサブネットが必要です。スタック定義で明示してください。"
                .yellow()
        );
    }

    let store = ContextStore::new(&project.root);
    let mut cache = store.load().await?;
    cache.set_vpc(&request, &context)?;
    store.save(&cache).await?;

    println!("{}", "✓ コンテキストキャッシュを更新しました".green().bold());
    println!("  {}", store.context_path().display().to_string().cyan());
    if let Some(cidr) = &context.vpc_cidr_block {
        println!("  CIDR: {}", cidr);
    }
    println!("  AZ: {}", context.availability_zones.join(", "));
    println!("  プライベートサブネット:");
    for subnet in &context.private_subnet_ids {
        println!("    - {}", subnet);
    }
    println!("  パブリックサブネット:");
    for subnet in &context.public_subnet_ids {
        println!("    - {}", subnet);
    }
    if project.definition.network.has_explicit_subnets() {
        println!(
            "{}",
            "  (スタック定義にサブネットが明示されているため、合成ではそちらが優先されます)".dimmed()
        );
    }

    Ok(())
}
