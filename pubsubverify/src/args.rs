use std::time::Duration;

use clap::Parser;
use pubsubverify_backend::{
    model::SubscriptionBinding,
    runner::{
        Expectations, VerifySettings, DEFAULT_ACK_DEADLINE_SECONDS, DEFAULT_MAX_MESSAGES,
        DEFAULT_PROJECT_ID, DEFAULT_SUBSCRIPTION, DEFAULT_TOPIC,
    },
    BackendConfig,
};

/// Pulls one batch from a Pub/Sub subscription, prints every message and
/// acknowledges it.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Args {
    /// `host:port` of the Pub/Sub emulator.
    #[arg(long, env = "PUBSUB_EMULATOR_HOST", default_value = "localhost:8085")]
    emulator_host: String,

    /// Connect to Google Cloud with application default credentials instead
    /// of the emulator.
    #[arg(long)]
    google_cloud: bool,

    #[arg(long, env = "PUBSUB_PROJECT_ID", default_value = DEFAULT_PROJECT_ID)]
    project: String,

    #[arg(long, default_value = DEFAULT_TOPIC)]
    topic: String,

    #[arg(long, default_value = DEFAULT_SUBSCRIPTION)]
    subscription: String,

    #[arg(long, default_value_t = DEFAULT_MAX_MESSAGES,
          value_parser = clap::value_parser!(i32).range(1..=1000))]
    max_messages: i32,

    /// How long the pull may wait for messages.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// Ack deadline for a subscription created by this run.
    #[arg(long, default_value_t = DEFAULT_ACK_DEADLINE_SECONDS,
          value_parser = clap::value_parser!(i32).range(10..=600))]
    ack_deadline_secs: i32,

    /// Fail when the subscription cannot be created for any reason other
    /// than already existing.
    #[arg(long)]
    strict_subscription: bool,

    /// Publish a probe request before pulling and require it in the batch.
    #[arg(long)]
    publish_probe: bool,

    /// Tenant the probe request is published for.
    #[arg(long, default_value = "test-tenant")]
    tenant_id: String,

    /// Require a message carrying this request id.
    #[arg(long)]
    expect_request_id: Option<String>,

    /// Warn about messages for any other tenant.
    #[arg(long)]
    expect_tenant_id: Option<String>,

    /// Warn about messages without an ordering key.
    #[arg(long)]
    expect_ordering_key: bool,
}

impl Args {
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            emulator_host: (!self.google_cloud).then(|| self.emulator_host.clone()),
            project_id: self.project.clone(),
        }
    }

    pub fn verify_settings(&self) -> VerifySettings {
        VerifySettings {
            binding: SubscriptionBinding::new(&self.project, &self.topic, &self.subscription),
            max_messages: self.max_messages,
            timeout: Duration::from_secs(self.timeout_secs),
            ack_deadline_seconds: self.ack_deadline_secs,
            strict_subscription: self.strict_subscription,
            probe_tenant_id: self.publish_probe.then(|| self.tenant_id.clone()),
            expectations: Expectations {
                request_id: self.expect_request_id.clone(),
                tenant_id: self.expect_tenant_id.clone(),
                ordering_key: self.expect_ordering_key,
            },
        }
    }
}
