mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sora")]
#[command(about = "書いたとおりの空へ。クラウドリソースを宣言でそろえる。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 実行プランを表示（dry-run、クラウドへの変更なし）
    Plan {
        /// スタック定義ファイル（省略時は stack.kdl を探索）
        #[arg(short = 'f', long = "file", env = "SORA_STACK_PATH")]
        file: Option<PathBuf>,
    },
    /// スタックを適用（作成・更新・削除）
    Up {
        /// スタック定義ファイル（省略時は stack.kdl を探索）
        #[arg(short = 'f', long = "file", env = "SORA_STACK_PATH")]
        file: Option<PathBuf>,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// 記録済みの全リソースを破棄
    Down {
        /// スタック定義ファイル（省略時は stack.kdl を探索）
        #[arg(short = 'f', long = "file", env = "SORA_STACK_PATH")]
        file: Option<PathBuf>,
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
    },
    /// スタック定義を検証（グラフ構築と順序付けのみ）
    Validate {
        /// スタック定義ファイル（省略時は stack.kdl を探索）
        #[arg(short = 'f', long = "file", env = "SORA_STACK_PATH")]
        file: Option<PathBuf>,
    },
    /// 記録済みの状態を表示
    State {
        /// スタック定義ファイル（省略時は stack.kdl を探索）
        #[arg(short = 'f', long = "file", env = "SORA_STACK_PATH")]
        file: Option<PathBuf>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログはstderrに出力（RUST_LOGで制御）
    tracing_subscriber::fmt::init();

    match cli.command {
        Commands::Version => {
            println!("soraflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Plan { file } => commands::plan::handle(file.as_deref()).await,
        Commands::Up { file, yes } => commands::up::handle(file.as_deref(), yes).await,
        Commands::Down { file, yes } => commands::down::handle(file.as_deref(), yes).await,
        Commands::Validate { file } => commands::validate::handle(file.as_deref()),
        Commands::State { file } => commands::state::handle(file.as_deref()).await,
    }
}
