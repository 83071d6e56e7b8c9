use crate::utils;
use colored::Colorize;
use soraflow_cloud_google::GoogleCloudProvider;
use soraflow_core::DependencyGraph;
use soraflow_engine::{Executor, OpKind, Provider, StateStore};
use std::path::Path;

const DEFAULT_REGION: &str = "us-central1";

pub async fn handle(file: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    println!("{}", "スタックを適用します...".blue().bold());
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
    let graph = DependencyGraph::from_nodes(stack.resources)?;

    let store = StateStore::new(&project_root);
    let lock = store.acquire_lock().await?;
    let result = run_apply(&stack.project, &region, &graph, &store, yes).await;
    lock.release().await?;
    result
}

async fn run_apply(
    project: &str,
    region: &str,
    graph: &DependencyGraph,
    store: &StateStore,
    yes: bool,
) -> anyhow::Result<()> {
    let mut state = store.load().await?;
    let plan = soraflow_engine::synthesize(graph, &state)?;

    println!();
    utils::print_plan(&plan);

    if !plan.has_changes {
        println!();
        println!("{}", "変更はありません。".green());
        return Ok(());
    }

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!("{}", "警告: 上記のプランをクラウドに適用します。".yellow());
        println!("実行するには --yes オプションを指定してください");
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
    println!(
        "アカウント: {}",
        auth.account_info.unwrap_or_default().cyan()
    );

    println!();
    println!("{}", "リソースを適用中...".blue());
    let report = Executor::new(&provider, store).apply(&plan, &mut state).await?;

    println!();
    for outcome in &report.succeeded {
        if outcome.op == OpKind::NoOp {
            continue;
        }
        println!("  ✓ {} ({})", outcome.key.cyan(), outcome.message);
    }

    if let Some(failed) = &report.failed {
        println!("  ✗ {}: {}", failed.key.red(), failed.message);
        for key in &report.halted {
            println!("  - {} {}", key.dimmed(), "(未適用)".dimmed());
        }
        println!();
        anyhow::bail!(
            "リソース '{}' の適用に失敗しました。適用済みの状態は保存されているため、再実行すると失敗地点から再開します。",
            failed.key
        );
    }

    println!();
    println!(
        "{}",
        format!("✓ 適用完了 ({} ms)", report.duration_ms)
            .green()
            .bold()
    );
    Ok(())
}
