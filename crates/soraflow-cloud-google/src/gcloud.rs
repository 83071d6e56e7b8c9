//! gcloud CLI wrapper
//!
//! Wraps the gcloud CLI commands for Google Cloud operations. Every call
//! is scoped to the stack's project and asks for JSON output.

use crate::error::{GoogleError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// gcloud CLI wrapper
pub struct Gcloud {
    project: String,
}

impl Gcloud {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
        }
    }

    /// Check if gcloud is installed and an account is active
    pub async fn check_auth(&self) -> Result<Option<String>> {
        let which = Command::new("which").arg("gcloud").output().await?;
        if !which.status.success() {
            return Err(GoogleError::GcloudNotFound);
        }

        let output = self
            .run(&["auth", "list", "--filter=status:ACTIVE"])
            .await?;
        let accounts: Vec<AccountInfo> = parse_json_list(&output)?;
        Ok(accounts.into_iter().next().map(|a| a.account))
    }

    /// Run a gcloud command and return stdout
    async fn run(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("gcloud");
        cmd.args(args);
        cmd.arg("--project").arg(&self.project);
        cmd.arg("--format=json");
        cmd.arg("--quiet");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(
            "Running: gcloud {} --project {}",
            args.join(" "),
            self.project
        );

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GoogleError::CommandFailed(stderr.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Create a service account
    pub async fn create_service_account(&self, account_id: &str) -> Result<ServiceAccountInfo> {
        let output = self
            .run(&["iam", "service-accounts", "create", account_id])
            .await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Describe a service account by email
    pub async fn describe_service_account(&self, email: &str) -> Result<ServiceAccountInfo> {
        let output = self
            .run(&["iam", "service-accounts", "describe", email])
            .await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Delete a service account
    pub async fn delete_service_account(&self, email: &str) -> Result<()> {
        self.run(&["iam", "service-accounts", "delete", email])
            .await?;
        Ok(())
    }

    /// Create a secret container (no version payload)
    pub async fn create_secret(&self, secret_id: &str, replication: &str) -> Result<SecretInfo> {
        let policy = format!("--replication-policy={replication}");
        let output = self
            .run(&["secrets", "create", secret_id, policy.as_str()])
            .await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Describe an existing secret
    pub async fn describe_secret(&self, secret_id: &str) -> Result<SecretInfo> {
        let output = self.run(&["secrets", "describe", secret_id]).await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Delete a secret and all its versions
    pub async fn delete_secret(&self, secret_id: &str) -> Result<()> {
        self.run(&["secrets", "delete", secret_id]).await?;
        Ok(())
    }

    /// Create a storage bucket
    pub async fn create_bucket(&self, name: &str, location: Option<&str>) -> Result<()> {
        let uri = format!("gs://{name}");
        let mut args = vec!["storage", "buckets", "create", uri.as_str()];
        let location_arg = location.map(|l| format!("--location={l}"));
        if let Some(ref location_arg) = location_arg {
            args.push(location_arg.as_str());
        }
        self.run(&args).await?;
        Ok(())
    }

    /// Delete a storage bucket
    pub async fn delete_bucket(&self, name: &str) -> Result<()> {
        let uri = format!("gs://{name}");
        self.run(&["storage", "buckets", "delete", uri.as_str()])
            .await?;
        Ok(())
    }

    /// Upload an object into a bucket
    pub async fn upload_object(&self, bucket: &str, name: &str, source: &str) -> Result<()> {
        let target = format!("gs://{bucket}/{name}");
        self.run(&["storage", "cp", source, target.as_str()]).await?;
        Ok(())
    }

    /// Describe an uploaded object
    pub async fn describe_object(&self, bucket: &str, name: &str) -> Result<ObjectInfo> {
        let target = format!("gs://{bucket}/{name}");
        let output = self
            .run(&["storage", "objects", "describe", target.as_str()])
            .await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Delete an object from a bucket
    pub async fn delete_object(&self, bucket: &str, name: &str) -> Result<()> {
        let target = format!("gs://{bucket}/{name}");
        self.run(&["storage", "rm", target.as_str()]).await?;
        Ok(())
    }

    /// Create a Pub/Sub topic
    pub async fn create_topic(&self, name: &str) -> Result<TopicInfo> {
        let output = self.run(&["pubsub", "topics", "create", name]).await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Delete a Pub/Sub topic
    pub async fn delete_topic(&self, name: &str) -> Result<()> {
        self.run(&["pubsub", "topics", "delete", name]).await?;
        Ok(())
    }

    /// Deploy (create or update) a Cloud Function
    ///
    /// `gcloud functions deploy` is itself idempotent, so the same call
    /// covers both create and update.
    pub async fn deploy_function(&self, config: &DeployFunctionConfig) -> Result<FunctionInfo> {
        let region = format!("--region={}", config.region);
        let runtime = format!("--runtime={}", config.runtime);
        let entry_point = format!("--entry-point={}", config.entry_point);
        let source = format!("--source=gs://{}/{}", config.source_bucket, config.source_object);
        let trigger = format!("--trigger-topic={}", config.trigger_topic);

        let mut args = vec![
            "functions",
            "deploy",
            config.name.as_str(),
            "--gen2",
            region.as_str(),
            runtime.as_str(),
            entry_point.as_str(),
            source.as_str(),
            trigger.as_str(),
        ];

        let service_account = config
            .service_account
            .as_ref()
            .map(|sa| format!("--service-account={sa}"));
        if let Some(ref service_account) = service_account {
            args.push(service_account.as_str());
        }

        let secrets = (!config.secret_env.is_empty()).then(|| {
            let pairs: Vec<String> = config
                .secret_env
                .iter()
                .map(|(env, secret)| format!("{env}={secret}:1"))
                .collect();
            format!("--set-secrets={}", pairs.join(","))
        });
        if let Some(ref secrets) = secrets {
            args.push(secrets.as_str());
        }

        let output = self.run(&args).await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Delete a Cloud Function
    pub async fn delete_function(&self, name: &str, region: &str) -> Result<()> {
        let region = format!("--region={region}");
        self.run(&["functions", "delete", name, "--gen2", region.as_str()])
            .await?;
        Ok(())
    }

    /// Create a Cloud Scheduler job publishing to a Pub/Sub topic
    pub async fn create_scheduler_job(&self, config: &SchedulerJobConfig) -> Result<JobInfo> {
        let location = format!("--location={}", config.region);
        let schedule = format!("--schedule={}", config.schedule);
        let topic = format!("--topic={}", config.topic);
        let body = format!("--message-body={}", config.message_body);

        let output = self
            .run(&[
                "scheduler",
                "jobs",
                "create",
                "pubsub",
                config.name.as_str(),
                location.as_str(),
                schedule.as_str(),
                topic.as_str(),
                body.as_str(),
            ])
            .await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Update an existing scheduler job in place
    pub async fn update_scheduler_job(&self, config: &SchedulerJobConfig) -> Result<JobInfo> {
        let location = format!("--location={}", config.region);
        let schedule = format!("--schedule={}", config.schedule);
        let topic = format!("--topic={}", config.topic);

        let output = self
            .run(&[
                "scheduler",
                "jobs",
                "update",
                "pubsub",
                config.name.as_str(),
                location.as_str(),
                schedule.as_str(),
                topic.as_str(),
            ])
            .await?;
        serde_json::from_str(&output).map_err(Into::into)
    }

    /// Delete a scheduler job
    pub async fn delete_scheduler_job(&self, name: &str, region: &str) -> Result<()> {
        let location = format!("--location={region}");
        self.run(&["scheduler", "jobs", "delete", name, location.as_str()])
            .await?;
        Ok(())
    }
}

/// Parse output that may be an empty string or an empty JSON list
fn parse_json_list<T: serde::de::DeserializeOwned>(output: &str) -> Result<Vec<T>> {
    if output.trim().is_empty() || output.trim() == "[]" {
        return Ok(Vec::new());
    }
    serde_json::from_str(output).map_err(Into::into)
}

/// Active account from `gcloud auth list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInfo {
    pub account: String,
}

/// Service account information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAccountInfo {
    pub email: String,

    #[serde(rename = "uniqueId")]
    pub unique_id: String,

    /// Full resource name (projects/…/serviceAccounts/…)
    pub name: String,
}

/// Secret information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretInfo {
    /// Full resource name (projects/…/secrets/…)
    pub name: String,
}

impl SecretInfo {
    /// The short secret id (last path segment of the resource name)
    pub fn secret_id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Object information from `gcloud storage objects describe`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub name: String,

    #[serde(rename = "md5Hash")]
    pub md5_hash: Option<String>,

    #[serde(rename = "mediaLink")]
    pub media_link: Option<String>,
}

/// Pub/Sub topic information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicInfo {
    /// Full resource name (projects/…/topics/…)
    pub name: String,
}

/// Cloud Function information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,

    pub state: Option<String>,

    #[serde(rename = "serviceConfig")]
    pub service_config: Option<FunctionServiceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionServiceConfig {
    pub uri: Option<String>,
}

/// Scheduler job information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    /// Full resource name (projects/…/locations/…/jobs/…)
    pub name: String,
}

/// Configuration for deploying a Cloud Function
#[derive(Debug, Clone)]
pub struct DeployFunctionConfig {
    pub name: String,
    pub region: String,
    pub runtime: String,
    pub entry_point: String,
    pub source_bucket: String,
    pub source_object: String,
    pub trigger_topic: String,
    pub service_account: Option<String>,
    /// ENV var name -> secret id
    pub secret_env: Vec<(String, String)>,
}

/// Configuration for a scheduler job
#[derive(Debug, Clone)]
pub struct SchedulerJobConfig {
    pub name: String,
    pub region: String,
    pub schedule: String,
    pub topic: String,
    pub message_body: String,
}
