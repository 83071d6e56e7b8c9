//! KDLパーサー
//!
//! スタック定義（stack.kdl）をパースして StackDecl を生成します。
//! リソースノードは汎用的にパースされ、種別ごとの意味付けは
//! プロバイダの責務とします。

mod attr;

use crate::error::{Result, StackError};
use crate::model::{ResourceNode, StackDecl};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;

/// KDLファイルをパースして StackDecl を生成
pub fn parse_stack_file<P: AsRef<Path>>(path: P) -> Result<StackDecl> {
    tracing::debug!("Parsing stack file: {}", path.as_ref().display());
    let content = fs::read_to_string(path.as_ref())?;
    parse_stack_string(&content)
}

/// KDL文字列をパース
pub fn parse_stack_string(content: &str) -> Result<StackDecl> {
    let doc: KdlDocument = content.parse()?;

    let mut meta: Option<(String, Option<String>, Option<String>)> = None;
    let mut resources = Vec::new();

    for node in doc.nodes() {
        match node.name().value() {
            "stack" => {
                if meta.is_some() {
                    return Err(StackError::InvalidConfig(
                        "stack ノードは1つだけ定義できます".to_string(),
                    ));
                }
                meta = Some(parse_stack_meta(node)?);
            }
            // stack 以外のトップレベルノードはすべてリソース宣言
            _ => resources.push(parse_resource(node)?),
        }
    }

    let Some((name, project, region)) = meta else {
        return Err(StackError::InvalidConfig(
            "stack ノードが定義されていません".to_string(),
        ));
    };

    Ok(StackDecl {
        project: project.unwrap_or_else(|| name.clone()),
        name,
        region,
        resources,
    })
}

/// stack ノードをパース（スタック名とプロジェクトメタデータ）
fn parse_stack_meta(node: &KdlNode) -> Result<(String, Option<String>, Option<String>)> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| StackError::InvalidConfig("stack にはスタック名が必要です".to_string()))?
        .to_string();

    let mut project = None;
    let mut region = None;

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let value = child
                .entries()
                .first()
                .and_then(|e| e.value().as_string())
                .map(|s| s.to_string());
            match child.name().value() {
                "project" => project = value,
                "region" => region = value,
                other => {
                    return Err(StackError::InvalidConfig(format!(
                        "stack 内の未知のノードです: {other}"
                    )));
                }
            }
        }
    }

    Ok((name, project, region))
}

/// リソースノードをパース
///
/// ノード名が kind、最初の文字列引数が name。子ノードは属性として
/// 汎用的にパースされる。
fn parse_resource(node: &KdlNode) -> Result<ResourceNode> {
    let kind = node.name().value().to_string();
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| StackError::InvalidConfig(format!("{kind} にはリソース名が必要です")))?
        .to_string();

    let mut resource = ResourceNode::new(kind, name);
    if let Some(children) = node.children() {
        for child in children.nodes() {
            resource
                .attrs
                .insert(child.name().value().to_string(), attr::parse_attr(child)?);
        }
    }
    Ok(resource)
}
