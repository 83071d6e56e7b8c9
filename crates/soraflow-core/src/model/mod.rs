//! リソースグラフモデル
//!
//! SoraFlowで管理するクラウドリソースの宣言（ノード、属性値、参照、
//! スタック）の定義

pub mod kind;
mod node;
mod stack;
mod value;

pub use node::ResourceNode;
pub use stack::StackDecl;
pub use value::{AttrRef, AttrValue};
