use colored::Colorize;
use soraflow_engine::{DiffValue, OpKind, Plan};
use std::path::{Path, PathBuf};

/// スタック定義をロードして (宣言, プロジェクトルート) を返す
///
/// プロジェクトルート（状態ファイルの置き場所）はスタック定義ファイルの
/// あるディレクトリ。
pub fn load_stack(file: Option<&Path>) -> anyhow::Result<(soraflow_core::StackDecl, PathBuf)> {
    let stack_path = match file {
        Some(path) => path.to_path_buf(),
        None => soraflow_config::find_stack_file()?,
    };
    let stack = soraflow_core::parse_stack_file(&stack_path)?;
    let project_root = stack_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    println!("  定義: {}", stack_path.display().to_string().dimmed());
    Ok((stack, project_root))
}

/// プランを人間向けに表示
pub fn print_plan(plan: &Plan) {
    for operation in &plan.operations {
        match operation.op {
            OpKind::Create => {
                println!("  {} {}", "+".green().bold(), operation.key().green());
                for diff in &operation.diff {
                    println!("      {} = {}", diff.attr, diff.after);
                }
            }
            OpKind::Update => {
                println!("  {} {}", "~".yellow().bold(), operation.key().yellow());
                for diff in &operation.diff {
                    let before = diff
                        .before
                        .as_ref()
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "(未設定)".to_string());
                    if matches!(diff.after, DiffValue::Removed) {
                        println!("      {}: {} -> {}", diff.attr, before, "(削除)".dimmed());
                    } else {
                        println!("      {}: {} -> {}", diff.attr, before, diff.after);
                    }
                }
            }
            OpKind::Delete => {
                println!("  {} {}", "-".red().bold(), operation.key().red());
            }
            OpKind::NoOp => {
                println!("  {} {}", "·".dimmed(), operation.key().dimmed());
            }
        }
    }

    println!();
    println!("プラン: {}", plan.summary());
}
