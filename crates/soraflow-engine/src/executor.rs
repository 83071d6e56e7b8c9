//! Plan executor
//!
//! Applies operations strictly in plan order. References still pending at
//! plan time resolve here, from the outputs of operations applied earlier
//! in the same run. A provider failure halts the run; state persisted for
//! the operations already applied makes the next run resume at the
//! failure point.

use crate::error::{EngineError, Result};
use crate::operation::{ApplyReport, OpKind, OpOutcome, OpStatus, Operation, Plan};
use crate::provider::Provider;
use crate::state::{ResourceRecord, StackState, StateStore};
use serde_json::Value;
use std::collections::HashMap;

/// Applies a plan through a provider, folding results into the state store
pub struct Executor<'a> {
    provider: &'a dyn Provider,
    store: &'a StateStore,
}

impl<'a> Executor<'a> {
    pub fn new(provider: &'a dyn Provider, store: &'a StateStore) -> Self {
        Self { provider, store }
    }

    /// Apply the plan, mutating and persisting `state` as operations land
    ///
    /// Returns `Ok` with a report even when a provider call fails (the
    /// report carries the failing node and the halted remainder). An `Err`
    /// means an internal defect or state I/O problem, not a resource
    /// failure.
    pub async fn apply(&self, plan: &Plan, state: &mut StackState) -> Result<ApplyReport> {
        let start = std::time::Instant::now();
        let mut report = ApplyReport::new();
        // Outputs produced by this run, keyed by node key.
        let mut run_outputs: HashMap<String, serde_json::Map<String, Value>> = HashMap::new();

        for (position, operation) in plan.operations.iter().enumerate() {
            let key = operation.key();
            if operation.op == OpKind::NoOp {
                report.add_success(key, OpKind::NoOp, "up to date".to_string());
                continue;
            }

            let outcome = match operation.op {
                OpKind::Create | OpKind::Update => {
                    self.apply_change(operation, state, &run_outputs).await
                }
                OpKind::Delete => self.apply_delete(operation, state).await,
                OpKind::NoOp => unreachable!("no-op filtered above"),
            };

            match outcome {
                Ok((message, outputs)) => {
                    tracing::info!(node = %key, op = %operation.op, status = %OpStatus::Applied, "operation applied");
                    if let Some(outputs) = outputs {
                        run_outputs.insert(key.clone(), outputs);
                    }
                    report.add_success(key, operation.op, message);
                }
                Err(EngineError::Provider { node, message }) => {
                    // Downstream nodes may depend on this node's outputs;
                    // nothing past this point is attempted.
                    tracing::warn!(node = %node, status = %OpStatus::Failed, "provider call failed, halting run");
                    report.failed = Some(OpOutcome {
                        key: node,
                        op: operation.op,
                        status: OpStatus::Failed,
                        message,
                    });
                    report.halted = plan.operations[position + 1..]
                        .iter()
                        .filter(|o| o.op != OpKind::NoOp)
                        .map(|o| o.key())
                        .collect();
                    break;
                }
                Err(other) => return Err(other),
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        Ok(report)
    }

    async fn apply_change(
        &self,
        operation: &Operation,
        state: &mut StackState,
        run_outputs: &HashMap<String, serde_json::Map<String, Value>>,
    ) -> Result<(String, Option<serde_json::Map<String, Value>>)> {
        let key = operation.key();
        let desired = operation.desired.as_ref().ok_or_else(|| {
            EngineError::State(format!("operation {key} has no desired attributes"))
        })?;

        tracing::debug!(node = %key, status = %OpStatus::Resolving, "resolving references");
        let mut resolved = serde_json::Map::new();
        for (attr, value) in desired {
            let lookup = |r: &soraflow_core::AttrRef| {
                run_outputs
                    .get(&r.node)
                    .and_then(|outputs| outputs.get(&r.output))
                    .or_else(|| state.output(&r.node, &r.output))
                    .cloned()
            };
            let value = value
                .resolve_with(&lookup)
                .map_err(|reference| EngineError::UnresolvedReference {
                    node: key.clone(),
                    reference: reference.to_string(),
                })?;
            resolved.insert(attr.clone(), value);
        }

        tracing::debug!(node = %key, status = %OpStatus::Applying, "calling provider");
        let previous = state.get_resource(&key).cloned();
        let realized = self
            .provider
            .realize(&operation.kind, &operation.name, &resolved, previous.as_ref())
            .await?;

        let mut record =
            ResourceRecord::new(&operation.kind, &operation.name, &realized.provider_id);
        record.applied_attrs = resolved;
        record.outputs = realized.outputs.clone();
        record.depends_on = operation.depends_on.clone();
        if let Some(previous) = previous {
            record.created_at = previous.created_at;
        }
        state.set_resource(key, record);
        self.store.save(state).await?;

        let message = match operation.op {
            OpKind::Create => format!("created ({})", realized.provider_id),
            _ => format!("updated ({})", realized.provider_id),
        };
        Ok((message, Some(realized.outputs)))
    }

    async fn apply_delete(
        &self,
        operation: &Operation,
        state: &mut StackState,
    ) -> Result<(String, Option<serde_json::Map<String, Value>>)> {
        let key = operation.key();
        let provider_id = operation.provider_id.as_deref().ok_or_else(|| {
            EngineError::State(format!("delete operation {key} has no provider id"))
        })?;

        tracing::debug!(node = %key, status = %OpStatus::Applying, "calling provider");
        self.provider
            .destroy(&operation.kind, &operation.name, provider_id)
            .await?;

        state.remove_resource(&key);
        self.store.save(state).await?;
        Ok(("destroyed".to_string(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::synthesize;
    use crate::provider::{AuthStatus, Realized};
    use async_trait::async_trait;
    use soraflow_core::{AttrRef, DependencyGraph, ResourceNode};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Scripted provider: realizes everything in memory, fails on request
    struct ScriptedProvider {
        fail_on: Option<String>,
        calls: Mutex<Vec<(String, serde_json::Map<String, Value>)>>,
        destroyed: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                fail_on: None,
                calls: Mutex::new(Vec::new()),
                destroyed: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(key: &str) -> Self {
            Self {
                fail_on: Some(key.to_string()),
                ..Self::new()
            }
        }

        fn call_keys(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn display_name(&self) -> &str {
            "Scripted"
        }

        async fn check_auth(&self) -> Result<AuthStatus> {
            Ok(AuthStatus::ok("test"))
        }

        async fn realize(
            &self,
            kind: &str,
            name: &str,
            attrs: &serde_json::Map<String, Value>,
            _previous: Option<&ResourceRecord>,
        ) -> Result<Realized> {
            let key = format!("{kind}:{name}");
            if self.fail_on.as_deref() == Some(key.as_str()) {
                return Err(EngineError::Provider {
                    node: key,
                    message: "scripted failure".to_string(),
                });
            }
            self.calls.lock().unwrap().push((key.clone(), attrs.clone()));

            let mut realized = Realized::new(format!("id-{name}"));
            for output in soraflow_core::kind::produced_outputs(kind).unwrap_or(&[]) {
                realized = realized.with_output(
                    *output,
                    serde_json::json!(format!("{output}-{name}")),
                );
            }
            Ok(realized)
        }

        async fn destroy(&self, kind: &str, name: &str, _provider_id: &str) -> Result<()> {
            let key = format!("{kind}:{name}");
            if self.fail_on.as_deref() == Some(key.as_str()) {
                return Err(EngineError::Provider {
                    node: key,
                    message: "scripted failure".to_string(),
                });
            }
            self.destroyed.lock().unwrap().push(key);
            Ok(())
        }
    }

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

    #[tokio::test]
    async fn test_outputs_propagate_to_later_operations() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());
        let provider = ScriptedProvider::new();

        let graph =
            DependencyGraph::from_nodes([function_node(), secret_node("account")]).unwrap();
        let mut state = store.load().await.unwrap();
        let plan = synthesize(&graph, &state).unwrap();

        let report = Executor::new(&provider, &store)
            .apply(&plan, &mut state)
            .await
            .unwrap();
        assert!(report.is_success());

        // Secret realized before the function that references it
        assert_eq!(
            provider.call_keys(),
            vec!["secret:account", "cloud-function:auto-regist"]
        );

        // The function saw the secret's realized output, exactly
        let calls = provider.calls.lock().unwrap();
        let (_, function_attrs) = &calls[1];
        assert_eq!(
            function_attrs.get("account-secret"),
            Some(&serde_json::json!("secret_id-account"))
        );

        // Both records persisted with their outputs
        let persisted = store.load().await.unwrap();
        assert_eq!(persisted.resources.len(), 2);
        assert_eq!(
            persisted.output("secret:account", "secret_id"),
            Some(&serde_json::json!("secret_id-account"))
        );
        let function = persisted.get_resource("cloud-function:auto-regist").unwrap();
        assert_eq!(function.depends_on, vec!["secret:account"]);
    }

    #[tokio::test]
    async fn test_failure_halts_and_preserves_completed_work() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());

        // A -> B -> C chain; B fails
        let a = ResourceNode::new("storage-bucket", "a").with_attr("location", "us-central1");
        let b = ResourceNode::new("storage-object", "b")
            .with_attr("bucket", AttrRef::new("storage-bucket:a", "name"));
        let c = ResourceNode::new("cloud-function", "c")
            .with_attr("source-object", AttrRef::new("storage-object:b", "name"));
        let graph = DependencyGraph::from_nodes([a, b, c]).unwrap();

        let provider = ScriptedProvider::failing_on("storage-object:b");
        let mut state = store.load().await.unwrap();
        let plan = synthesize(&graph, &state).unwrap();
        let report = Executor::new(&provider, &store)
            .apply(&plan, &mut state)
            .await
            .unwrap();

        assert!(!report.is_success());
        let failed = report.failed.as_ref().unwrap();
        assert_eq!(failed.key, "storage-object:b");
        assert_eq!(report.halted, vec!["cloud-function:c"]);

        // A applied and persisted; B and C absent
        let persisted = store.load().await.unwrap();
        assert!(persisted.get_resource("storage-bucket:a").is_some());
        assert!(persisted.get_resource("storage-object:b").is_none());
        assert!(persisted.get_resource("cloud-function:c").is_none());

        // The next run resumes at the failure point
        let retry = ScriptedProvider::new();
        let mut state = store.load().await.unwrap();
        let plan = synthesize(&graph, &state).unwrap();
        assert_eq!(plan.summary().no_change, 1);
        let report = Executor::new(&retry, &store)
            .apply(&plan, &mut state)
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(retry.call_keys(), vec!["storage-object:b", "cloud-function:c"]);
    }

    #[tokio::test]
    async fn test_second_apply_is_noop() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());
        let provider = ScriptedProvider::new();

        let graph =
            DependencyGraph::from_nodes([secret_node("account"), function_node()]).unwrap();

        let mut state = store.load().await.unwrap();
        let plan = synthesize(&graph, &state).unwrap();
        Executor::new(&provider, &store)
            .apply(&plan, &mut state)
            .await
            .unwrap();
        assert_eq!(provider.call_keys().len(), 2);

        // Re-synthesize against the updated state: nothing to do
        let state_after = store.load().await.unwrap();
        let second = synthesize(&graph, &state_after).unwrap();
        assert!(!second.has_changes);

        let mut state_after = state_after;
        Executor::new(&provider, &store)
            .apply(&second, &mut state_after)
            .await
            .unwrap();
        // No further provider calls were made
        assert_eq!(provider.call_keys().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());
        let provider = ScriptedProvider::new();

        // Apply a secret, then plan against an empty declaration
        let graph = DependencyGraph::from_nodes([secret_node("account")]).unwrap();
        let mut state = store.load().await.unwrap();
        let plan = synthesize(&graph, &state).unwrap();
        Executor::new(&provider, &store)
            .apply(&plan, &mut state)
            .await
            .unwrap();

        let empty = DependencyGraph::new();
        let mut state = store.load().await.unwrap();
        let plan = synthesize(&empty, &state).unwrap();
        assert_eq!(plan.summary().delete, 1);

        let report = Executor::new(&provider, &store)
            .apply(&plan, &mut state)
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(*provider.destroyed.lock().unwrap(), vec!["secret:account"]);
        assert!(store.load().await.unwrap().resources.is_empty());
    }

    #[tokio::test]
    async fn test_out_of_order_plan_is_an_internal_error() {
        let temp_dir = tempdir().unwrap();
        let store = StateStore::new(temp_dir.path());
        let provider = ScriptedProvider::new();

        // Hand-built plan with the function ahead of its dependency
        let function = function_node();
        let plan = Plan::new(vec![Operation {
            op: OpKind::Create,
            kind: function.kind.clone(),
            name: function.name.clone(),
            desired: Some(function.attrs.clone()),
            resolved: serde_json::Map::new(),
            pending: vec![AttrRef::new("secret:account", "secret_id")],
            depends_on: vec!["secret:account".to_string()],
            provider_id: None,
            diff: Vec::new(),
        }]);

        let mut state = StackState::new();
        let err = Executor::new(&provider, &store)
            .apply(&plan, &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedReference { .. }));
        // No provider call was made for the broken operation
        assert!(provider.call_keys().is_empty());
    }
}
