use crate::utils;
use colored::Colorize;
use soraflow_cloud_google::GoogleCloudProvider;
use soraflow_core::DependencyGraph;
use soraflow_engine::{Executor, Provider, StateStore};
use std::path::Path;

const DEFAULT_REGION: &str = "us-central1";

pub async fn handle(file: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    println!("{}", "スタックを破棄します...".yellow().bold());
    let (stack, project_root) = utils::load_stack(file)?;
    println!(
        "スタック: {} (プロジェクト: {})",
        stack.name.cyan(),
        stack.project
    );

    let region = stack
        .region
        .clone()
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let store = StateStore::new(&project_root);
    let lock = store.acquire_lock().await?;
    let result = run_destroy(&stack.project, &region, &store, yes).await;
    lock.release().await?;
    result
}

async fn run_destroy(
    project: &str,
    region: &str,
    store: &StateStore,
    yes: bool,
) -> anyhow::Result<()> {
    let mut state = store.load().await?;

    // 空の宣言に対するプラン = 記録済みリソース全削除（依存の逆順）
    let empty = DependencyGraph::new();
    let plan = soraflow_engine::synthesize(&empty, &state)?;

    if !plan.has_changes {
        println!();
        println!("{}", "記録済みのリソースはありません。".dimmed());
        return Ok(());
    }

    println!();
    utils::print_plan(&plan);

    if !yes {
        println!();
        println!(
            "{}",
            "⚠ 警告: 上記のリソースをすべて削除します".red().bold()
        );
        println!("  データは復旧できません。実行するには --yes を指定してください。");
        return Ok(());
    }

    let provider = GoogleCloudProvider::new(project, region);
    let auth = provider.check_auth().await?;
    if !auth.authenticated {
        anyhow::bail!(
            "Google Cloud の認証に失敗しました: {}",
            auth.error.unwrap_or_default()
        );
    }

    println!();
    println!("{}", "リソースを削除中...".red());
    let report = Executor::new(&provider, store).apply(&plan, &mut state).await?;

    println!();
    for outcome in &report.succeeded {
        println!("  ✓ {} を削除しました", outcome.key.cyan());
    }

    if let Some(failed) = &report.failed {
        println!("  ✗ {}: {}", failed.key.red(), failed.message);
        println!();
        anyhow::bail!(
            "リソース '{}' の削除に失敗しました。再実行すると残りを削除します。",
            failed.key
        );
    }

    println!();
    println!("{}", "✓ スタックを破棄しました".red().bold());
    Ok(())
}
