//! 属性値モデル
//!
//! リソースの desired 属性を表す値ツリー。他リソースの出力への参照は
//! 具体値と型レベルで区別され、参照先が実体化された後に解決される。

use crate::error::{Result, StackError};
use std::collections::BTreeMap;
use std::fmt;

/// 他リソースが生成する出力への参照
///
/// `node` は "kind:name" 形式のノードキー、`output` は出力名。
/// 参照先リソースが実体化されるまで値は確定しない。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttrRef {
    pub node: String,
    pub output: String,
}

impl AttrRef {
    pub fn new(node: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            output: output.into(),
        }
    }

    /// "kind:name.output" 形式の文字列をパース
    pub fn parse(s: &str) -> Result<Self> {
        let Some((node, output)) = s.rsplit_once('.') else {
            return Err(StackError::InvalidReference(s.to_string()));
        };
        if output.is_empty() || !node.contains(':') || node.starts_with(':') {
            return Err(StackError::InvalidReference(s.to_string()));
        }
        Ok(Self::new(node, output))
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.output)
    }
}

/// リソースの desired 属性値
///
/// 具体値（文字列・整数・真偽値・リスト・マップ）と参照を型レベルで
/// 区別する。「まだ分からない値」をグローバル変数で代用しないための型。
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    String(String),
    Integer(i64),
    Bool(bool),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
    Ref(AttrRef),
}

impl AttrValue {
    /// 値ツリーに含まれる参照を再帰的に収集する
    ///
    /// グラフのエッジ解決と独立にテストできるよう、純粋な走査として実装。
    pub fn collect_refs<'a>(&'a self, acc: &mut Vec<&'a AttrRef>) {
        match self {
            AttrValue::Ref(reference) => acc.push(reference),
            AttrValue::List(items) => {
                for item in items {
                    item.collect_refs(acc);
                }
            }
            AttrValue::Map(entries) => {
                for value in entries.values() {
                    value.collect_refs(acc);
                }
            }
            _ => {}
        }
    }

    /// 参照をルックアップで解決しながら `serde_json::Value` へ変換
    ///
    /// 解決できない参照に最初に出会った時点で、その参照を `Err` で返す。
    pub fn resolve_with<F>(&self, lookup: &F) -> std::result::Result<serde_json::Value, AttrRef>
    where
        F: Fn(&AttrRef) -> Option<serde_json::Value>,
    {
        match self {
            AttrValue::String(s) => Ok(serde_json::Value::String(s.clone())),
            AttrValue::Integer(i) => Ok(serde_json::Value::from(*i)),
            AttrValue::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            AttrValue::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(item.resolve_with(lookup)?);
                }
                Ok(serde_json::Value::Array(values))
            }
            AttrValue::Map(entries) => {
                let mut map = serde_json::Map::new();
                for (key, value) in entries {
                    map.insert(key.clone(), value.resolve_with(lookup)?);
                }
                Ok(serde_json::Value::Object(map))
            }
            AttrValue::Ref(reference) => lookup(reference).ok_or_else(|| reference.clone()),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Integer(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<AttrRef> for AttrValue {
    fn from(reference: AttrRef) -> Self {
        AttrValue::Ref(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_ref_parse() {
        let reference = AttrRef::parse("secret:account.secret_id").unwrap();
        assert_eq!(reference.node, "secret:account");
        assert_eq!(reference.output, "secret_id");
    }

    #[test]
    fn test_attr_ref_parse_invalid() {
        assert!(AttrRef::parse("secret:account").is_err());
        assert!(AttrRef::parse("account.secret_id").is_err());
        assert!(AttrRef::parse("secret:account.").is_err());
    }

    #[test]
    fn test_collect_refs_nested() {
        let mut env = BTreeMap::new();
        env.insert(
            "ACCOUNT".to_string(),
            AttrValue::Ref(AttrRef::new("secret:account", "secret_id")),
        );
        let value = AttrValue::Map(env);

        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].node, "secret:account");
    }

    #[test]
    fn test_resolve_with_lookup() {
        let value = AttrValue::Ref(AttrRef::new("secret:account", "secret_id"));
        let resolved = value
            .resolve_with(&|r| {
                (r.node == "secret:account" && r.output == "secret_id")
                    .then(|| serde_json::json!("projects/x/secrets/account"))
            })
            .unwrap();
        assert_eq!(resolved, serde_json::json!("projects/x/secrets/account"));
    }

    #[test]
    fn test_resolve_with_reports_unresolved() {
        let value = AttrValue::List(vec![
            AttrValue::from("concrete"),
            AttrValue::Ref(AttrRef::new("pubsub-topic:t", "id")),
        ]);
        let missing = value.resolve_with(&|_| None).unwrap_err();
        assert_eq!(missing.node, "pubsub-topic:t");
    }
}
