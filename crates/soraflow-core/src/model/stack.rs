//! スタック定義モデル

use super::node::ResourceNode;

/// スタック - 1つのデプロイ単位となるリソース宣言の集合
///
/// `resources` は宣言順を保持する。独立なリソース同士の適用順序は
/// この宣言順で決まる。
#[derive(Debug, Clone, PartialEq)]
pub struct StackDecl {
    /// スタック名
    pub name: String,

    /// 対象プロジェクトID（未指定時はスタック名）
    pub project: String,

    /// デフォルトリージョン
    pub region: Option<String>,

    /// 宣言されたリソースノード（宣言順）
    pub resources: Vec<ResourceNode>,
}
