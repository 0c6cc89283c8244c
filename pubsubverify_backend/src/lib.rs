use google_cloud_gax::{
    conn::Environment,
    grpc::{Code, Status},
};
use google_cloud_pubsub::{
    client::{Client, ClientConfig},
    subscriber::ReceivedMessage,
    subscription::SubscriptionConfig,
};
use log::{debug, warn};

pub mod broker;
pub mod error;
pub mod model;
pub mod runner;

use broker::{Broker, SubscriptionStatus};
use error::BackendError;
use model::{PubsubMessage, PubsubMessageToPublish, SubscriptionBinding, SubscriptionName};

/// How to reach Pub/Sub. Passed explicitly instead of read from the
/// process environment by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// `host:port` of a Pub/Sub emulator. `None` connects to Google Cloud
    /// with application default credentials.
    pub emulator_host: Option<String>,
    pub project_id: String,
}

pub struct Backend {
    client: Client,
}

impl Backend {
    pub async fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = create_client(config).await?;
        Ok(Self { client })
    }
}

async fn create_client(config: &BackendConfig) -> Result<Client, BackendError> {
    let mut client_config = ClientConfig::default();

    if !use_emulator(config, &mut client_config) {
        client_config = client_config
            .with_auth()
            .await
            .map_err(|e| BackendError::Auth(e.to_string()))?;
    }

    client_config.project_id = Some(config.project_id.clone());

    Ok(Client::new(client_config).await?)
}

/// Points the client at the configured emulator. Returns `false` when
/// Google Cloud credentials are needed instead.
fn use_emulator(config: &BackendConfig, client_config: &mut ClientConfig) -> bool {
    match &config.emulator_host {
        Some(host) => {
            client_config.environment = Environment::Emulator(host.clone());
            true
        }
        None => {
            if let Environment::Emulator(host) = &client_config.environment {
                warn!("PUBSUB_EMULATOR_HOST={host} is set in the environment, the client will use the emulator");
            }
            false
        }
    }
}

fn subscription_status<T>(
    result: Result<T, Status>,
    subscription: &SubscriptionName,
) -> Result<SubscriptionStatus, BackendError> {
    match result {
        Ok(_) => Ok(SubscriptionStatus::Created),
        Err(status) if status.code() == Code::AlreadyExists => {
            Ok(SubscriptionStatus::AlreadyExists)
        }
        Err(status) => Err(BackendError::CreateSubscription {
            subscription: subscription.clone(),
            status,
        }),
    }
}

impl Broker for Backend {
    type AckHandle = ReceivedMessage;

    async fn ensure_subscription(
        &self,
        binding: &SubscriptionBinding,
        ack_deadline_seconds: i32,
    ) -> Result<SubscriptionStatus, BackendError> {
        let config = SubscriptionConfig {
            ack_deadline_seconds,
            ..Default::default()
        };

        let result = self
            .client
            .create_subscription(
                &binding.subscription_path(),
                &binding.topic_path(),
                config,
                None,
            )
            .await;

        subscription_status(result, &binding.subscription)
    }

    async fn pull(
        &self,
        binding: &SubscriptionBinding,
        max_messages: i32,
    ) -> Result<Vec<PubsubMessage<ReceivedMessage>>, BackendError> {
        let subscription = self.client.subscription(&binding.subscription_path());

        let messages = subscription
            .pull(max_messages, None)
            .await
            .map_err(|status| BackendError::Pull {
                subscription: binding.subscription.clone(),
                status,
            })?;

        debug!(
            "pulled {} message(s) from {}",
            messages.len(),
            binding.subscription_path()
        );

        Ok(messages.into_iter().map(PubsubMessage::from).collect())
    }

    async fn acknowledge(
        &self,
        _binding: &SubscriptionBinding,
        message_id: &str,
        handle: ReceivedMessage,
    ) -> Result<(), BackendError> {
        handle
            .ack()
            .await
            .map_err(|status| BackendError::Acknowledge {
                message_id: message_id.to_string(),
                status,
            })
    }

    async fn publish(
        &self,
        binding: &SubscriptionBinding,
        message: PubsubMessageToPublish,
    ) -> Result<String, BackendError> {
        let topic = self.client.topic(&binding.topic_path());
        let mut publisher = topic.new_publisher(None);

        let awaiter = publisher.publish(message.into()).await;
        let result = awaiter.get().await;
        publisher.shutdown().await;

        result.map_err(BackendError::Publish)
    }
}
