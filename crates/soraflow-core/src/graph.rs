//! 依存グラフ
//!
//! リソースノードの集合と、属性参照から誘導される有向エッジ。
//! 非巡回性を検証し、決定的なトポロジカル順序を生成する。

use crate::error::{Result, StackError};
use crate::model::{ResourceNode, kind};
use std::collections::{BTreeSet, HashMap};

/// 依存グラフ
///
/// エッジは「依存する側 → 依存される側」。適用順序は依存される側が先。
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<ResourceNode>,
    index: HashMap<String, usize>,
    deps: Vec<BTreeSet<usize>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 宣言済みノード列からグラフを構築し、エッジを解決する
    pub fn from_nodes(nodes: impl IntoIterator<Item = ResourceNode>) -> Result<Self> {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node)?;
        }
        graph.resolve_edges()?;
        Ok(graph)
    }

    /// ノードを追加する
    ///
    /// 同じ (kind, name) が既に存在する場合は `DuplicateName`。
    pub fn add_node(&mut self, node: ResourceNode) -> Result<()> {
        let key = node.key();
        if self.index.contains_key(&key) {
            return Err(StackError::DuplicateName(key));
        }
        self.index.insert(key, self.nodes.len());
        self.nodes.push(node);
        self.deps.push(BTreeSet::new());
        Ok(())
    }

    /// 全ノードの属性ツリーを走査し、参照からエッジを解決する
    ///
    /// 参照先ノードが存在しない場合は `DanglingReference`、参照先種別が
    /// その出力を生成しない場合は `UnknownOutput`。どちらも構築時エラーで
    /// あり、プロバイダ呼び出しの前に検出される。
    pub fn resolve_edges(&mut self) -> Result<()> {
        let mut deps = vec![BTreeSet::new(); self.nodes.len()];
        for (i, node) in self.nodes.iter().enumerate() {
            let mut refs = Vec::new();
            for value in node.attrs.values() {
                value.collect_refs(&mut refs);
            }
            for reference in refs {
                let Some(&target) = self.index.get(&reference.node) else {
                    return Err(StackError::DanglingReference {
                        node: node.key(),
                        reference: reference.to_string(),
                    });
                };
                let target_kind = &self.nodes[target].kind;
                if !kind::produces(target_kind, &reference.output) {
                    return Err(StackError::UnknownOutput {
                        node: node.key(),
                        kind: target_kind.clone(),
                        output: reference.output.clone(),
                    });
                }
                // 自己参照も1ノードの循環としてエッジに残す
                deps[i].insert(target);
            }
        }
        self.deps = deps;
        Ok(())
    }

    /// トポロジカル順序を返す
    ///
    /// 各ノードは（推移的に）依存するすべてのノードの後に現れる。
    /// 独立なノード同士は宣言順を保ち、同一入力に対してプランが
    /// 再現可能になる。循環がある場合は経路全体を報告する。
    pub fn topological_order(&self) -> Result<Vec<&ResourceNode>> {
        let n = self.nodes.len();
        let mut emitted = vec![false; n];
        let mut order = Vec::with_capacity(n);

        while order.len() < n {
            let before = order.len();
            for i in 0..n {
                if emitted[i] {
                    continue;
                }
                if self.deps[i].iter().all(|&d| emitted[d]) {
                    emitted[i] = true;
                    order.push(&self.nodes[i]);
                }
            }
            if order.len() == before {
                return Err(StackError::CircularDependency(self.find_cycle(&emitted)));
            }
        }
        Ok(order)
    }

    /// 未出力ノードから循環経路を探して "a -> b -> a" 形式で返す
    fn find_cycle(&self, emitted: &[bool]) -> String {
        let Some(start) = (0..self.nodes.len()).find(|&i| !emitted[i]) else {
            return String::new();
        };

        let mut path: Vec<usize> = Vec::new();
        let mut position: HashMap<usize, usize> = HashMap::new();
        let mut current = start;
        loop {
            if let Some(&at) = position.get(&current) {
                let mut names: Vec<String> =
                    path[at..].iter().map(|&i| self.nodes[i].key()).collect();
                names.push(self.nodes[current].key());
                return names.join(" -> ");
            }
            position.insert(current, path.len());
            path.push(current);
            // 未出力ノードは必ず未出力の依存を1つ以上持つ
            match self.deps[current].iter().find(|&&d| !emitted[d]) {
                Some(&next) => current = next,
                None => return self.nodes[current].key(),
            }
        }
    }

    /// key が直接依存するノードキーの一覧
    pub fn dependencies_of(&self, key: &str) -> Vec<String> {
        self.index
            .get(key)
            .map(|&i| {
                self.deps[i]
                    .iter()
                    .map(|&d| self.nodes[d].key())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&ResourceNode> {
        self.index.get(key).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn nodes(&self) -> &[ResourceNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
