//! Operation types for planning and applying resource changes

use serde_json::Value;
use soraflow_core::{AttrRef, AttrValue};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of change a planned operation performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Destroy a resource no longer declared
    Delete,
    /// No changes needed
    NoOp,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Create => write!(f, "create"),
            OpKind::Update => write!(f, "update"),
            OpKind::Delete => write!(f, "delete"),
            OpKind::NoOp => write!(f, "no-op"),
        }
    }
}

/// A planned change for a single resource
#[derive(Debug, Clone)]
pub struct Operation {
    pub op: OpKind,

    /// Resource kind (e.g. "secret", "cloud-function")
    pub kind: String,

    /// Resource name
    pub name: String,

    /// Desired attributes from the declaration (None for deletes)
    pub desired: Option<BTreeMap<String, AttrValue>>,

    /// Plan-time resolution of `desired`: only attributes whose references
    /// all resolved from stored outputs appear here
    pub resolved: serde_json::Map<String, Value>,

    /// References that cannot resolve until an earlier operation applies
    pub pending: Vec<AttrRef>,

    /// Direct dependencies (node keys) from the graph, recorded into state
    /// on apply so deletes can be ordered after the declaration is gone
    pub depends_on: Vec<String>,

    /// Provider id of the existing resource (updates and deletes)
    pub provider_id: Option<String>,

    /// Per-attribute differences backing the human-readable plan output
    pub diff: Vec<AttrDiff>,
}

impl Operation {
    /// Full node key (kind:name)
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }
}

/// One attribute difference between last-applied and desired state
#[derive(Debug, Clone)]
pub struct AttrDiff {
    pub attr: String,

    /// Value recorded on the last successful apply, if any
    pub before: Option<Value>,

    /// Desired side of the diff
    pub after: DiffValue,
}

/// Desired side of a diff; values referencing not-yet-applied resources
/// are only known after apply
#[derive(Debug, Clone)]
pub enum DiffValue {
    Known(Value),
    Pending,
    Removed,
}

impl fmt::Display for DiffValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffValue::Known(value) => write!(f, "{value}"),
            DiffValue::Pending => write!(f, "(known after apply)"),
            DiffValue::Removed => write!(f, "(removed)"),
        }
    }
}

/// Ordered list of operations converging actual state to the declaration
#[derive(Debug, Clone)]
pub struct Plan {
    /// Operations in apply order (deletes last, reverse dependency order)
    pub operations: Vec<Operation>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(operations: Vec<Operation>) -> Self {
        let has_changes = operations.iter().any(|o| o.op != OpKind::NoOp);
        Self {
            operations,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            operations: Vec::new(),
            has_changes: false,
        }
    }

    /// Get operations by kind of change
    pub fn operations_by(&self, op: OpKind) -> Vec<&Operation> {
        self.operations.iter().filter(|o| o.op == op).collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.operations_by(OpKind::Create).len(),
            update: self.operations_by(OpKind::Update).len(),
            delete: self.operations_by(OpKind::Delete).len(),
            no_change: self.operations_by(OpKind::NoOp).len(),
        }
    }
}

/// Summary of planned operations
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

/// Lifecycle of an operation during apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Pending,
    Resolving,
    Applying,
    Applied,
    Failed,
}

impl fmt::Display for OpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpStatus::Pending => write!(f, "pending"),
            OpStatus::Resolving => write!(f, "resolving"),
            OpStatus::Applying => write!(f, "applying"),
            OpStatus::Applied => write!(f, "applied"),
            OpStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a single operation
#[derive(Debug, Clone)]
pub struct OpOutcome {
    /// Node key of the operation
    pub key: String,

    pub op: OpKind,

    pub status: OpStatus,

    /// Success message or error text
    pub message: String,
}

/// Result of applying a plan
///
/// A failed operation halts the run: everything applied before it stays
/// recorded, everything after it lands in `halted` untouched.
#[derive(Debug, Clone, Default)]
pub struct ApplyReport {
    /// Operations that reached `Applied`
    pub succeeded: Vec<OpOutcome>,

    /// The operation that failed, if any
    pub failed: Option<OpOutcome>,

    /// Keys of operations not attempted because an earlier one failed
    pub halted: Vec<String>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_none()
    }

    pub fn add_success(&mut self, key: String, op: OpKind, message: String) {
        self.succeeded.push(OpOutcome {
            key,
            op,
            status: OpStatus::Applied,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(kind: &str, name: &str) -> Operation {
        Operation {
            op: OpKind::NoOp,
            kind: kind.to_string(),
            name: name.to_string(),
            desired: Some(BTreeMap::new()),
            resolved: serde_json::Map::new(),
            pending: Vec::new(),
            depends_on: Vec::new(),
            provider_id: None,
            diff: Vec::new(),
        }
    }

    #[test]
    fn test_plan_has_changes() {
        let plan = Plan::new(vec![noop("secret", "account")]);
        assert!(!plan.has_changes);

        let mut create = noop("secret", "password");
        create.op = OpKind::Create;
        let plan = Plan::new(vec![noop("secret", "account"), create]);
        assert!(plan.has_changes);
    }

    #[test]
    fn test_plan_summary_display() {
        let mut create = noop("secret", "password");
        create.op = OpKind::Create;
        let plan = Plan::new(vec![noop("secret", "account"), create]);
        assert_eq!(
            plan.summary().to_string(),
            "1 to create, 0 to update, 0 to delete, 1 unchanged"
        );
    }

    #[test]
    fn test_operation_key() {
        assert_eq!(noop("secret", "account").key(), "secret:account");
    }
}
