//! 属性値のパース
//!
//! 値が1つならスカラー、複数ならリスト、子ブロックを持つ場合はマップ。
//! `(ref)"kind:name.output"` の型注釈付き文字列は参照になる。

use crate::error::{Result, StackError};
use crate::model::{AttrRef, AttrValue};
use kdl::{KdlEntry, KdlNode};
use std::collections::BTreeMap;

pub(super) fn parse_attr(node: &KdlNode) -> Result<AttrValue> {
    if let Some(children) = node.children() {
        let mut map = BTreeMap::new();
        for child in children.nodes() {
            map.insert(child.name().value().to_string(), parse_attr(child)?);
        }
        return Ok(AttrValue::Map(map));
    }

    let mut values = node
        .entries()
        .iter()
        .filter(|e| e.name().is_none())
        .map(parse_entry)
        .collect::<Result<Vec<_>>>()?;

    match values.len() {
        0 => Err(StackError::InvalidConfig(format!(
            "属性 {} に値がありません",
            node.name().value()
        ))),
        1 => Ok(values.remove(0)),
        _ => Ok(AttrValue::List(values)),
    }
}

fn parse_entry(entry: &KdlEntry) -> Result<AttrValue> {
    let is_ref = entry.ty().is_some_and(|t| t.value() == "ref");
    if let Some(s) = entry.value().as_string() {
        if is_ref {
            return Ok(AttrValue::Ref(AttrRef::parse(s)?));
        }
        return Ok(AttrValue::String(s.to_string()));
    }
    if let Some(i) = entry.value().as_integer() {
        return Ok(AttrValue::Integer(i as i64));
    }
    if let Some(b) = entry.value().as_bool() {
        return Ok(AttrValue::Bool(b));
    }
    Err(StackError::InvalidConfig(format!(
        "未対応の属性値です: {}",
        entry.value()
    )))
}
