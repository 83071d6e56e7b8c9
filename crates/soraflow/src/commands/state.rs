use crate::utils;
use colored::Colorize;
use soraflow_engine::StateStore;
use std::path::Path;

pub async fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    let (stack, project_root) = utils::load_stack(file)?;
    println!("スタック: {}", stack.name.cyan());

    let store = StateStore::new(&project_root);
    let state = store.load().await?;

    println!();
    if state.resources.is_empty() {
        println!("{}", "記録済みのリソースはありません".dimmed());
        return Ok(());
    }

    println!("{}", "RESOURCE\tPROVIDER ID\tUPDATED".bold());
    let mut keys: Vec<&String> = state.resources.keys().collect();
    keys.sort();
    for key in keys {
        let record = &state.resources[key];
        println!(
            "{}\t{}\t{}",
            key.cyan(),
            record.provider_id,
            record.updated_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}
