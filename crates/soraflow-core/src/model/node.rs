//! リソースノードモデル

use super::value::AttrValue;
use std::collections::BTreeMap;

/// リソースノード - 1つのクラウドリソースの desired 状態宣言
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    /// リソース種別（service-account, secret など）
    pub kind: String,

    /// リソース名（同一種別内で一意）
    pub name: String,

    /// desired 属性（具体値、または他ノード出力への参照）
    pub attrs: BTreeMap<String, AttrValue>,
}

impl ResourceNode {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            attrs: BTreeMap::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// ノードキー（kind:name）
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}
