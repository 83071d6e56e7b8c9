use crate::utils;
use colored::Colorize;
use soraflow_core::DependencyGraph;
use soraflow_engine::StateStore;
use std::path::Path;

pub async fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "実行プランを作成中...".blue().bold());
    let (stack, project_root) = utils::load_stack(file)?;
    println!("スタック: {}", stack.name.cyan());

    let graph = DependencyGraph::from_nodes(stack.resources)?;
    let store = StateStore::new(&project_root);
    let state = store.load().await?;
    let plan = soraflow_engine::synthesize(&graph, &state)?;

    println!();
    utils::print_plan(&plan);

    if !plan.has_changes {
        println!();
        println!(
            "{}",
            "変更はありません。宣言と記録済みの状態は一致しています。".green()
        );
    }
    Ok(())
}
