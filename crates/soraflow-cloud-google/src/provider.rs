//! Google Cloud provider implementation
//!
//! Realizes the stack's resource kinds through the gcloud CLI. The engine
//! hands over fully resolved attributes; this provider decides what each
//! kind means on Google Cloud and which outputs it reports back.

use crate::error::{GoogleError, Result};
use crate::gcloud::{DeployFunctionConfig, Gcloud, SchedulerJobConfig};
use async_trait::async_trait;
use serde_json::Value;
use soraflow_engine::{AuthStatus, EngineError, Provider, Realized, ResourceRecord};

/// Google Cloud provider
pub struct GoogleCloudProvider {
    gcloud: Gcloud,
    region: String,
}

impl GoogleCloudProvider {
    pub fn new(project: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            gcloud: Gcloud::new(project),
            region: region.into(),
        }
    }

    async fn realize_kind(
        &self,
        kind: &str,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> Result<Realized> {
        match kind {
            "service-account" => self.realize_service_account(name, attrs, previous).await,
            "secret" => self.realize_secret(name, attrs, previous).await,
            "storage-bucket" => self.realize_bucket(name, attrs, previous).await,
            "storage-object" => self.realize_object(name, attrs).await,
            "pubsub-topic" => self.realize_topic(name, attrs, previous).await,
            "cloud-function" => self.realize_function(name, attrs).await,
            "scheduler-job" => self.realize_scheduler_job(name, attrs, previous).await,
            other => Err(GoogleError::UnsupportedKind(other.to_string())),
        }
    }

    async fn realize_service_account(
        &self,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> Result<Realized> {
        let account_id = attr_str_or(attrs, "account-id", name);
        let info = match previous {
            // service accounts carry no mutable attributes we manage
            Some(record) => {
                self.gcloud
                    .describe_service_account(&record.provider_id)
                    .await?
            }
            None => self.gcloud.create_service_account(account_id).await?,
        };
        Ok(Realized::new(&info.email)
            .with_output("email", Value::String(info.email.clone()))
            .with_output("unique_id", Value::String(info.unique_id))
            .with_output("name", Value::String(info.name)))
    }

    async fn realize_secret(
        &self,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> Result<Realized> {
        let secret_id = attr_str_or(attrs, "secret-id", name);
        let replication = attr_str_or(attrs, "replication", "automatic");
        let info = match previous {
            // the secret container is immutable; versions are managed out
            // of band by the operator
            Some(_) => self.gcloud.describe_secret(secret_id).await?,
            None => self.gcloud.create_secret(secret_id, replication).await?,
        };
        Ok(Realized::new(&info.name)
            .with_output("secret_id", Value::String(info.secret_id().to_string()))
            .with_output("name", Value::String(info.name.clone())))
    }

    async fn realize_bucket(
        &self,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> Result<Realized> {
        let bucket = attr_str_or(attrs, "name", name);
        let location = attr_str_opt(attrs, "location").unwrap_or(&self.region);
        if previous.is_none() {
            self.gcloud.create_bucket(bucket, Some(location)).await?;
        }
        Ok(Realized::new(bucket)
            .with_output("name", Value::String(bucket.to_string()))
            .with_output("url", Value::String(format!("gs://{bucket}")))
            .with_output(
                "self_link",
                Value::String(format!("https://www.googleapis.com/storage/v1/b/{bucket}")),
            ))
    }

    async fn realize_object(
        &self,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
    ) -> Result<Realized> {
        let bucket = attr_str(attrs, "bucket")?;
        let source = attr_str(attrs, "source")?;
        let object = attr_str_or(attrs, "name", name);

        // cp overwrites, so the same call covers create and update
        self.gcloud.upload_object(bucket, object, source).await?;
        let info = self.gcloud.describe_object(bucket, object).await?;

        let mut realized = Realized::new(format!("{bucket}/{object}"))
            .with_output("name", Value::String(object.to_string()));
        if let Some(md5) = info.md5_hash {
            realized = realized.with_output("md5hash", Value::String(md5));
        }
        if let Some(link) = info.media_link {
            realized = realized.with_output("media_link", Value::String(link));
        }
        Ok(realized)
    }

    async fn realize_topic(
        &self,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> Result<Realized> {
        let topic = attr_str_or(attrs, "name", name);
        let full_name = match previous {
            Some(record) => record.provider_id.clone(),
            None => self.gcloud.create_topic(topic).await?.name,
        };
        Ok(Realized::new(&full_name)
            .with_output("id", Value::String(full_name.clone()))
            .with_output("name", Value::String(topic.to_string())))
    }

    async fn realize_function(
        &self,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
    ) -> Result<Realized> {
        let region = attr_str_opt(attrs, "region").unwrap_or(&self.region);
        let config = DeployFunctionConfig {
            name: attr_str_or(attrs, "name", name).to_string(),
            region: region.to_string(),
            runtime: attr_str(attrs, "runtime")?.to_string(),
            entry_point: attr_str(attrs, "entry-point")?.to_string(),
            source_bucket: attr_str(attrs, "source-bucket")?.to_string(),
            source_object: attr_str(attrs, "source-object")?.to_string(),
            trigger_topic: attr_str(attrs, "trigger-topic")?.to_string(),
            service_account: attr_str_opt(attrs, "service-account").map(str::to_string),
            secret_env: secret_env_pairs(attrs),
        };

        let info = self.gcloud.deploy_function(&config).await?;
        let uri = info.service_config.and_then(|c| c.uri);

        let mut realized = Realized::new(format!("{}/{}", config.region, config.name))
            .with_output("name", Value::String(config.name.clone()));
        if let Some(uri) = uri {
            realized = realized.with_output("uri", Value::String(uri));
        }
        if let Some(state) = info.state {
            realized = realized.with_output("state", Value::String(state));
        }
        Ok(realized)
    }

    async fn realize_scheduler_job(
        &self,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> Result<Realized> {
        let region = attr_str_opt(attrs, "region").unwrap_or(&self.region);
        let config = SchedulerJobConfig {
            name: attr_str_or(attrs, "name", name).to_string(),
            region: region.to_string(),
            schedule: attr_str(attrs, "schedule")?.to_string(),
            topic: attr_str(attrs, "pubsub-target")?.to_string(),
            message_body: attr_str_or(attrs, "message-body", "{}").to_string(),
        };

        let info = match previous {
            Some(_) => self.gcloud.update_scheduler_job(&config).await?,
            None => self.gcloud.create_scheduler_job(&config).await?,
        };
        Ok(Realized::new(format!("{}/{}", config.region, config.name))
            .with_output("id", Value::String(info.name))
            .with_output("name", Value::String(config.name.clone())))
    }

    async fn destroy_kind(&self, kind: &str, provider_id: &str) -> Result<()> {
        match kind {
            "service-account" => self.gcloud.delete_service_account(provider_id).await,
            "secret" => {
                // provider id is the full resource name; gcloud wants the
                // short secret id
                let secret_id = provider_id.rsplit('/').next().unwrap_or(provider_id);
                self.gcloud.delete_secret(secret_id).await
            }
            "storage-bucket" => self.gcloud.delete_bucket(provider_id).await,
            "storage-object" => match provider_id.split_once('/') {
                Some((bucket, object)) => self.gcloud.delete_object(bucket, object).await,
                None => Err(GoogleError::CommandFailed(format!(
                    "malformed object id: {provider_id}"
                ))),
            },
            "pubsub-topic" => {
                let topic = provider_id.rsplit('/').next().unwrap_or(provider_id);
                self.gcloud.delete_topic(topic).await
            }
            "cloud-function" => match provider_id.split_once('/') {
                Some((region, function)) => self.gcloud.delete_function(function, region).await,
                None => Err(GoogleError::CommandFailed(format!(
                    "malformed function id: {provider_id}"
                ))),
            },
            "scheduler-job" => match provider_id.split_once('/') {
                Some((region, job)) => self.gcloud.delete_scheduler_job(job, region).await,
                None => Err(GoogleError::CommandFailed(format!(
                    "malformed job id: {provider_id}"
                ))),
            },
            other => Err(GoogleError::UnsupportedKind(other.to_string())),
        }
    }
}

#[async_trait]
impl Provider for GoogleCloudProvider {
    fn name(&self) -> &str {
        "google-cloud"
    }

    fn display_name(&self) -> &str {
        "Google Cloud"
    }

    async fn check_auth(&self) -> soraflow_engine::Result<AuthStatus> {
        match self.gcloud.check_auth().await {
            Ok(Some(account)) => Ok(AuthStatus::ok(account)),
            Ok(None) => Ok(AuthStatus::failed("gcloud にログインしていません")),
            Err(GoogleError::GcloudNotFound) => {
                Ok(AuthStatus::failed("gcloud がインストールされていません"))
            }
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn realize(
        &self,
        kind: &str,
        name: &str,
        attrs: &serde_json::Map<String, Value>,
        previous: Option<&ResourceRecord>,
    ) -> soraflow_engine::Result<Realized> {
        tracing::info!(kind, name, "realizing resource");
        self.realize_kind(kind, name, attrs, previous)
            .await
            .map_err(|e| EngineError::Provider {
                node: format!("{kind}:{name}"),
                message: e.to_string(),
            })
    }

    async fn destroy(
        &self,
        kind: &str,
        name: &str,
        provider_id: &str,
    ) -> soraflow_engine::Result<()> {
        tracing::info!(kind, name, "destroying resource");
        self.destroy_kind(kind, provider_id)
            .await
            .map_err(|e| EngineError::Provider {
                node: format!("{kind}:{name}"),
                message: e.to_string(),
            })
    }
}

/// Environment variable to secret id pairs from the `secret-env` attribute
fn secret_env_pairs(attrs: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    attrs
        .get("secret-env")
        .and_then(|v| v.as_object())
        .map(|env| {
            env.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn attr_str<'a>(attrs: &'a serde_json::Map<String, Value>, key: &str) -> Result<&'a str> {
    attrs
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GoogleError::MissingAttribute(key.to_string()))
}

fn attr_str_opt<'a>(attrs: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    attrs.get(key).and_then(|v| v.as_str())
}

fn attr_str_or<'a>(
    attrs: &'a serde_json::Map<String, Value>,
    key: &str,
    default: &'a str,
) -> &'a str {
    attr_str_opt(attrs, key).unwrap_or(default)
}
