mod pubsub_message;
mod pubsub_message_to_publish;
mod request_payload;

pub use pubsub_message::PubsubMessage;
pub use pubsub_message_to_publish::PubsubMessageToPublish;
pub use request_payload::{RequestPayload, ABSENT};

use std::fmt;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TopicName(pub String);

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriptionName(pub String);

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for SubscriptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A subscription bound to a topic within one project.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SubscriptionBinding {
    pub project_id: String,
    pub topic: TopicName,
    pub subscription: SubscriptionName,
}

impl SubscriptionBinding {
    pub fn new(
        project_id: impl Into<String>,
        topic: impl Into<String>,
        subscription: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            topic: TopicName(topic.into()),
            subscription: SubscriptionName(subscription.into()),
        }
    }

    /// `projects/{project}/topics/{topic}`
    pub fn topic_path(&self) -> String {
        format!("projects/{}/topics/{}", self.project_id, self.topic)
    }

    /// `projects/{project}/subscriptions/{subscription}`
    pub fn subscription_path(&self) -> String {
        format!(
            "projects/{}/subscriptions/{}",
            self.project_id, self.subscription
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_paths_are_fully_qualified() {
        let binding = SubscriptionBinding::new(
            "apx-dev",
            "apx-requests-us-central1",
            "apx-workers-us-central1",
        );

        assert_eq!(
            binding.topic_path(),
            "projects/apx-dev/topics/apx-requests-us-central1"
        );
        assert_eq!(
            binding.subscription_path(),
            "projects/apx-dev/subscriptions/apx-workers-us-central1"
        );
    }
}
