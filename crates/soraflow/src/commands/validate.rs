use crate::utils;
use colored::Colorize;
use soraflow_core::DependencyGraph;
use std::path::Path;

pub fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "スタック定義を検証中...".blue().bold());
    let (stack, _project_root) = utils::load_stack(file)?;

    let count = stack.resources.len();
    let graph = DependencyGraph::from_nodes(stack.resources)?;
    let order = graph.topological_order()?;

    println!();
    println!(
        "{}",
        format!("✓ 検証OK ({count} リソース)").green().bold()
    );

    if !order.is_empty() {
        println!();
        println!("{}", "適用順序:".bold());
        for (position, node) in order.iter().enumerate() {
            println!("  {}. {}", position + 1, node.key().cyan());
        }
    }
    Ok(())
}
