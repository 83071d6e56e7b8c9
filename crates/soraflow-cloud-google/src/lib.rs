//! Google Cloud provider for SoraFlow
//!
//! This crate implements the Provider trait for Google Cloud, realizing
//! the stack's resource kinds through the gcloud CLI.
//!
//! # Supported kinds
//!
//! - `service-account`: IAM service accounts
//! - `secret`: Secret Manager secret containers
//! - `storage-bucket` / `storage-object`: Cloud Storage
//! - `pubsub-topic`: Pub/Sub topics
//! - `cloud-function`: Cloud Functions (gen2)
//! - `scheduler-job`: Cloud Scheduler jobs (Pub/Sub target)
//!
//! # Requirements
//!
//! - `gcloud` CLI must be installed and authenticated
//! - The target project is taken from the stack declaration

pub mod error;
pub mod gcloud;
pub mod provider;

pub use error::{GoogleError, Result};
pub use gcloud::{DeployFunctionConfig, Gcloud, SchedulerJobConfig};
pub use provider::GoogleCloudProvider;
