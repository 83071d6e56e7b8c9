//! Plan synthesis
//!
//! Pure diffing of the declared graph against recorded state. No I/O is
//! performed; the same (graph, state) input always yields the same plan,
//! which is what makes the dry-run output trustworthy.

use crate::error::Result;
use crate::operation::{AttrDiff, DiffValue, OpKind, Operation, Plan};
use crate::state::{ResourceRecord, StackState};
use serde_json::Value;
use soraflow_core::{AttrRef, AttrValue, DependencyGraph};
use std::collections::{BTreeMap, HashSet};

/// Plan-time resolution of one attribute
enum AttrResolution {
    /// Every reference resolved from stored outputs
    Known(Value),
    /// At least one reference points at a node without stored outputs;
    /// the value is only known once that node applies
    Pending(AttrRef),
}

/// Synthesize an ordered operation list from the graph and recorded state
///
/// One operation per declared node in topological order, classified as
/// Create/Update/NoOp; records no longer declared become Delete operations
/// appended last, dependents destroyed before their dependencies.
pub fn synthesize(graph: &DependencyGraph, state: &StackState) -> Result<Plan> {
    let order = graph.topological_order()?;

    let mut operations = Vec::with_capacity(order.len());
    for node in order {
        let key = node.key();
        let depends_on = graph.dependencies_of(&key);
        let resolutions = resolve_attrs(&node.attrs, state);

        let mut resolved = serde_json::Map::new();
        let mut pending = Vec::new();
        for (attr, resolution) in &resolutions {
            match resolution {
                AttrResolution::Known(value) => {
                    resolved.insert(attr.clone(), value.clone());
                }
                AttrResolution::Pending(reference) => pending.push(reference.clone()),
            }
        }

        let operation = match state.get_resource(&key) {
            None => Operation {
                op: OpKind::Create,
                kind: node.kind.clone(),
                name: node.name.clone(),
                desired: Some(node.attrs.clone()),
                diff: creation_diff(&resolutions),
                resolved,
                pending,
                depends_on,
                provider_id: None,
            },
            Some(record) => {
                let diff = update_diff(&record.applied_attrs, &resolutions);
                Operation {
                    op: if diff.is_empty() {
                        OpKind::NoOp
                    } else {
                        OpKind::Update
                    },
                    kind: node.kind.clone(),
                    name: node.name.clone(),
                    desired: Some(node.attrs.clone()),
                    resolved,
                    pending,
                    depends_on,
                    provider_id: Some(record.provider_id.clone()),
                    diff,
                }
            }
        };
        operations.push(operation);
    }

    // Records no longer declared are destroyed last, dependents first.
    let declared: HashSet<String> = graph.nodes().iter().map(|n| n.key()).collect();
    let mut doomed: Vec<&ResourceRecord> = state
        .resources
        .iter()
        .filter(|(key, _)| !declared.contains(*key))
        .map(|(_, record)| record)
        .collect();
    doomed.sort_by_key(|record| record.key());

    for record in delete_order(doomed) {
        operations.push(Operation {
            op: OpKind::Delete,
            kind: record.kind.clone(),
            name: record.name.clone(),
            desired: None,
            resolved: serde_json::Map::new(),
            pending: Vec::new(),
            depends_on: record.depends_on.clone(),
            provider_id: Some(record.provider_id.clone()),
            diff: Vec::new(),
        });
    }

    Ok(Plan::new(operations))
}

/// Resolve desired attributes against outputs already recorded in state
fn resolve_attrs(
    attrs: &BTreeMap<String, AttrValue>,
    state: &StackState,
) -> BTreeMap<String, AttrResolution> {
    attrs
        .iter()
        .map(|(attr, value)| {
            let resolution =
                match value.resolve_with(&|r| state.output(&r.node, &r.output).cloned()) {
                    Ok(resolved) => AttrResolution::Known(resolved),
                    Err(reference) => AttrResolution::Pending(reference),
                };
            (attr.clone(), resolution)
        })
        .collect()
}

fn creation_diff(resolutions: &BTreeMap<String, AttrResolution>) -> Vec<AttrDiff> {
    resolutions
        .iter()
        .map(|(attr, resolution)| AttrDiff {
            attr: attr.clone(),
            before: None,
            after: match resolution {
                AttrResolution::Known(value) => DiffValue::Known(value.clone()),
                AttrResolution::Pending(_) => DiffValue::Pending,
            },
        })
        .collect()
}

/// Structural comparison over fully-resolved values
///
/// A reference that resolved from stored outputs compares like any other
/// value, so an unchanged but newly-resolved attribute does not read as a
/// change. A still-pending reference always counts as a difference.
fn update_diff(
    applied: &serde_json::Map<String, Value>,
    resolutions: &BTreeMap<String, AttrResolution>,
) -> Vec<AttrDiff> {
    let mut diff = Vec::new();
    for (attr, resolution) in resolutions {
        let before = applied.get(attr);
        match resolution {
            AttrResolution::Known(value) => {
                if before != Some(value) {
                    diff.push(AttrDiff {
                        attr: attr.clone(),
                        before: before.cloned(),
                        after: DiffValue::Known(value.clone()),
                    });
                }
            }
            AttrResolution::Pending(_) => diff.push(AttrDiff {
                attr: attr.clone(),
                before: before.cloned(),
                after: DiffValue::Pending,
            }),
        }
    }
    for (attr, value) in applied {
        if !resolutions.contains_key(attr) {
            diff.push(AttrDiff {
                attr: attr.clone(),
                before: Some(value.clone()),
                after: DiffValue::Removed,
            });
        }
    }
    diff
}

/// Order doomed records so each is destroyed before anything it depends on
fn delete_order(mut doomed: Vec<&ResourceRecord>) -> Vec<&ResourceRecord> {
    let mut ordered = Vec::with_capacity(doomed.len());
    while !doomed.is_empty() {
        let next = doomed.iter().position(|candidate| {
            let key = candidate.key();
            !doomed
                .iter()
                .any(|other| other.key() != key && other.depends_on.contains(&key))
        });
        match next {
            Some(i) => ordered.push(doomed.remove(i)),
            // recorded dependencies can only cycle if the state file was
            // edited by hand; fall back to the stable base order
            None => ordered.append(&mut doomed),
        }
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use soraflow_core::ResourceNode;

    fn secret_node(name: &str) -> ResourceNode {
        ResourceNode::new("secret", name).with_attr("secret-id", name)
    }

    fn function_node() -> ResourceNode {
        ResourceNode::new("cloud-function", "auto-regist")
            .with_attr("entry-point", "EntryPoint")
            .with_attr(
                "account-secret",
                AttrRef::new("secret:account", "secret_id"),
            )
    }

    fn applied_secret(name: &str) -> ResourceRecord {
        ResourceRecord::new("secret", name, format!("projects/x/secrets/{name}"))
            .with_applied_attr("secret-id", serde_json::json!(name))
            .with_output("secret_id", serde_json::json!(name))
            .with_output("name", serde_json::json!(format!("projects/x/secrets/{name}")))
    }

    #[test]
    fn test_everything_created_on_empty_state() {
        let graph =
            DependencyGraph::from_nodes([function_node(), secret_node("account")]).unwrap();
        let plan = synthesize(&graph, &StackState::new()).unwrap();

        let keys: Vec<String> = plan.operations.iter().map(|o| o.key()).collect();
        assert_eq!(keys, vec!["secret:account", "cloud-function:auto-regist"]);
        assert!(plan.operations.iter().all(|o| o.op == OpKind::Create));

        // 関数の参照はまだ解決できないので pending に残る
        let function = &plan.operations[1];
        assert_eq!(function.pending.len(), 1);
        assert_eq!(function.pending[0].node, "secret:account");
        assert!(!function.resolved.contains_key("account-secret"));
    }

    #[test]
    fn test_matching_state_is_all_noop() {
        let graph =
            DependencyGraph::from_nodes([secret_node("account"), function_node()]).unwrap();

        let mut state = StackState::new();
        state.set_resource("secret:account".to_string(), applied_secret("account"));
        state.set_resource(
            "cloud-function:auto-regist".to_string(),
            ResourceRecord::new("cloud-function", "auto-regist", "fn-1")
                .with_applied_attr("entry-point", serde_json::json!("EntryPoint"))
                .with_applied_attr("account-secret", serde_json::json!("account"))
                .with_output("name", serde_json::json!("auto-regist")),
        );

        let plan = synthesize(&graph, &state).unwrap();
        assert!(!plan.has_changes);
        assert!(plan.operations.iter().all(|o| o.op == OpKind::NoOp));
    }

    #[test]
    fn test_changed_attribute_becomes_update() {
        let graph = DependencyGraph::from_nodes([secret_node("account")]).unwrap();

        let mut state = StackState::new();
        state.set_resource(
            "secret:account".to_string(),
            ResourceRecord::new("secret", "account", "projects/x/secrets/account")
                .with_applied_attr("secret-id", serde_json::json!("old-id")),
        );

        let plan = synthesize(&graph, &state).unwrap();
        let operation = &plan.operations[0];
        assert_eq!(operation.op, OpKind::Update);
        assert_eq!(operation.provider_id.as_deref(), Some("projects/x/secrets/account"));
        assert_eq!(operation.diff.len(), 1);
        assert_eq!(operation.diff[0].attr, "secret-id");
        assert_eq!(operation.diff[0].before, Some(serde_json::json!("old-id")));
    }

    #[test]
    fn test_removed_attribute_shows_in_diff() {
        let graph = DependencyGraph::from_nodes([secret_node("account")]).unwrap();

        let mut state = StackState::new();
        state.set_resource(
            "secret:account".to_string(),
            ResourceRecord::new("secret", "account", "p")
                .with_applied_attr("secret-id", serde_json::json!("account"))
                .with_applied_attr("replication", serde_json::json!("automatic")),
        );

        let plan = synthesize(&graph, &state).unwrap();
        let operation = &plan.operations[0];
        assert_eq!(operation.op, OpKind::Update);
        assert!(operation
            .diff
            .iter()
            .any(|d| d.attr == "replication" && matches!(d.after, DiffValue::Removed)));
    }

    #[test]
    fn test_pending_reference_counts_as_change() {
        // 関数は適用済みだが、参照先の secret は未実体化（出力なし）
        let graph =
            DependencyGraph::from_nodes([secret_node("account"), function_node()]).unwrap();

        let mut state = StackState::new();
        state.set_resource(
            "cloud-function:auto-regist".to_string(),
            ResourceRecord::new("cloud-function", "auto-regist", "fn-1")
                .with_applied_attr("entry-point", serde_json::json!("EntryPoint"))
                .with_applied_attr("account-secret", serde_json::json!("stale")),
        );

        let plan = synthesize(&graph, &state).unwrap();
        let function = plan
            .operations
            .iter()
            .find(|o| o.kind == "cloud-function")
            .unwrap();
        assert_eq!(function.op, OpKind::Update);
        assert!(function
            .diff
            .iter()
            .any(|d| d.attr == "account-secret" && matches!(d.after, DiffValue::Pending)));
    }

    #[test]
    fn test_deletes_come_last_in_reverse_dependency_order() {
        // 宣言は secret のみ。状態には function と topic も残っている。
        let graph = DependencyGraph::from_nodes([secret_node("account")]).unwrap();

        let mut state = StackState::new();
        state.set_resource("secret:account".to_string(), applied_secret("account"));
        state.set_resource(
            "pubsub-topic:scheduler-topic".to_string(),
            ResourceRecord::new("pubsub-topic", "scheduler-topic", "topic-1"),
        );
        let mut function = ResourceRecord::new("cloud-function", "auto-regist", "fn-1");
        function.depends_on = vec!["pubsub-topic:scheduler-topic".to_string()];
        state.set_resource("cloud-function:auto-regist".to_string(), function);

        let plan = synthesize(&graph, &state).unwrap();
        let keys: Vec<String> = plan.operations.iter().map(|o| o.key()).collect();
        assert_eq!(
            keys,
            vec![
                "secret:account",
                "cloud-function:auto-regist",
                "pubsub-topic:scheduler-topic"
            ]
        );
        // 依存される側（topic）は依存する側（function）の後に破棄される
        assert_eq!(plan.operations[1].op, OpKind::Delete);
        assert_eq!(plan.operations[2].op, OpKind::Delete);
        assert_eq!(plan.operations[0].op, OpKind::NoOp);
    }

    #[test]
    fn test_empty_graph_destroys_everything() {
        let graph = DependencyGraph::new();

        let mut state = StackState::new();
        state.set_resource("secret:account".to_string(), applied_secret("account"));
        let mut function = ResourceRecord::new("cloud-function", "auto-regist", "fn-1");
        function.depends_on = vec!["secret:account".to_string()];
        state.set_resource("cloud-function:auto-regist".to_string(), function);

        let plan = synthesize(&graph, &state).unwrap();
        let keys: Vec<String> = plan.operations.iter().map(|o| o.key()).collect();
        assert_eq!(keys, vec!["cloud-function:auto-regist", "secret:account"]);
        assert!(plan.operations.iter().all(|o| o.op == OpKind::Delete));
    }

    #[test]
    fn test_reference_resolved_from_stored_outputs_is_not_a_change() {
        // secret は更新対象だが出力は既知。関数の参照は stored output から
        // 解決され、値が変わらない限り Update にならない。
        let graph =
            DependencyGraph::from_nodes([secret_node("account"), function_node()]).unwrap();

        let mut state = StackState::new();
        state.set_resource("secret:account".to_string(), applied_secret("account"));
        state.set_resource(
            "cloud-function:auto-regist".to_string(),
            ResourceRecord::new("cloud-function", "auto-regist", "fn-1")
                .with_applied_attr("entry-point", serde_json::json!("EntryPoint"))
                .with_applied_attr("account-secret", serde_json::json!("account")),
        );

        let plan = synthesize(&graph, &state).unwrap();
        let function = plan
            .operations
            .iter()
            .find(|o| o.kind == "cloud-function")
            .unwrap();
        assert_eq!(function.op, OpKind::NoOp);
    }
}
