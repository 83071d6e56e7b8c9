pub mod error;

pub use error::*;

use std::path::PathBuf;

/// SoraFlowの設定ディレクトリを取得
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("soraflow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// スタック定義ファイル（stack.kdl）を探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 SORA_STACK_PATH (直接パス指定)
/// 2. カレントディレクトリ: stack.local.kdl, .stack.local.kdl, stack.kdl, .stack.kdl
/// 3. ./.soraflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/soraflow/stack.kdl (グローバル設定)
pub fn find_stack_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(stack_path) = std::env::var("SORA_STACK_PATH") {
        let path = PathBuf::from(stack_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    let candidates = [
        "stack.local.kdl",
        ".stack.local.kdl",
        "stack.kdl",
        ".stack.kdl",
    ];

    // 2. カレントディレクトリで検索
    for filename in &candidates {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.soraflow/ ディレクトリで検索
    let stack_dir = current_dir.join(".soraflow");
    if stack_dir.is_dir() {
        for filename in &candidates {
            let path = stack_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定ファイル (~/.config/soraflow/stack.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global_stack = config_dir.join("soraflow").join("stack.kdl");
        if global_stack.exists() {
            return Ok(global_stack);
        }
    }

    // どのスタック定義も見つからなかった
    Err(ConfigError::StackFileNotFound)
}
