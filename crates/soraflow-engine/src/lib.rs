//! SoraFlow Engine
//!
//! Plan synthesis and execution for declared resource graphs. The engine
//! diffs a dependency graph against recorded state, emits an ordered
//! Create/Update/Delete/NoOp plan, and applies it sequentially through a
//! provider, resolving deferred attribute references as dependencies land.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   sora CLI                       │
//! │              (sora plan/up/down)                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               soraflow-engine                    │
//! │  ┌──────────────┐  ┌──────────────┐             │
//! │  │ Plan Synth   │  │   Executor   │             │
//! │  │ (pure diff)  │  │ (sequential) │             │
//! │  └──────────────┘  └──────┬───────┘             │
//! │  ┌──────────────┐         │                     │
//! │  │  State Store │◄────────┤                     │
//! │  └──────────────┘         │                     │
//! └───────────────────────────┼─────────────────────┘
//!                             │ trait Provider
//!                    ┌────────▼────────┐
//!                    │  google-cloud   │
//!                    │    provider     │
//!                    └─────────────────┘
//! ```

pub mod error;
pub mod executor;
pub mod operation;
pub mod plan;
pub mod provider;
pub mod state;

// Re-exports
pub use error::{EngineError, Result};
pub use executor::Executor;
pub use operation::{
    ApplyReport, AttrDiff, DiffValue, OpKind, OpOutcome, OpStatus, Operation, Plan, PlanSummary,
};
pub use plan::synthesize;
pub use provider::{AuthStatus, Provider, Realized};
pub use state::{ResourceRecord, StackState, StateLock, StateStore};
