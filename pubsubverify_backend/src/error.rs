use google_cloud_gax::grpc::Status;
use std::str::Utf8Error;

use crate::model::SubscriptionName;

/// Failures that end a verification run.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to load Google Cloud credentials: {0}")]
    Auth(String),

    #[error("failed to connect to Pub/Sub: {0}")]
    Connect(#[from] google_cloud_pubsub::client::Error),

    #[error("failed to create subscription {subscription}: {status}")]
    CreateSubscription {
        subscription: SubscriptionName,
        status: Status,
    },

    #[error("failed to pull from subscription {subscription}: {status}")]
    Pull {
        subscription: SubscriptionName,
        status: Status,
    },

    #[error("failed to acknowledge message {message_id}: {status}")]
    Acknowledge { message_id: String, status: Status },

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to publish message: {0}")]
    Publish(Status),

    #[error("failed to write report: {0}")]
    Output(#[from] std::io::Error),
}

/// Why a message payload could not be decoded. Never fatal.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] Utf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload is JSON but not an object")]
    NotObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_errors_convert_with_question_mark() {
        fn converts<E: Into<BackendError>>() {}

        converts::<google_cloud_pubsub::client::Error>();
        converts::<serde_json::Error>();
        converts::<std::io::Error>();
    }
}
