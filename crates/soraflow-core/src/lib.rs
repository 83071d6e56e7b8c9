//! SoraFlow Core
//!
//! リソースノード・属性参照モデル、依存グラフ、スタック定義の
//! KDLパーサーを提供します。
//!
//! リソース宣言は他リソースの出力への参照（`AttrRef`）を持つことができ、
//! `DependencyGraph` が参照からエッジを解決して決定的な適用順序を
//! 生成します。プランの合成と適用は soraflow-engine の責務です。

pub mod error;
pub mod graph;
pub mod model;
pub mod parser;

pub use error::{Result, StackError};
pub use graph::DependencyGraph;
pub use model::{AttrRef, AttrValue, ResourceNode, StackDecl, kind};
pub use parser::{parse_stack_file, parse_stack_string};
