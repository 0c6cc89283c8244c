//! The operations the verification runner needs from a Pub/Sub broker.

use std::future::Future;

use crate::{
    error::BackendError,
    model::{PubsubMessage, PubsubMessageToPublish, SubscriptionBinding},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Created,
    AlreadyExists,
}

/// A publish/subscribe broker reachable through a subscription binding.
///
/// Acknowledgment handles are consumed by value: each one is redeemable once
/// and only belongs to the pull response that produced it.
pub trait Broker {
    type AckHandle;

    /// Creates the subscription on the bound topic. An existing subscription
    /// is reported as [`SubscriptionStatus::AlreadyExists`], not as an error.
    fn ensure_subscription(
        &self,
        binding: &SubscriptionBinding,
        ack_deadline_seconds: i32,
    ) -> impl Future<Output = Result<SubscriptionStatus, BackendError>>;

    /// Pulls at most `max_messages` pending messages, in broker order.
    fn pull(
        &self,
        binding: &SubscriptionBinding,
        max_messages: i32,
    ) -> impl Future<Output = Result<Vec<PubsubMessage<Self::AckHandle>>, BackendError>>;

    fn acknowledge(
        &self,
        binding: &SubscriptionBinding,
        message_id: &str,
        handle: Self::AckHandle,
    ) -> impl Future<Output = Result<(), BackendError>>;

    fn publish(
        &self,
        binding: &SubscriptionBinding,
        message: PubsubMessageToPublish,
    ) -> impl Future<Output = Result<String, BackendError>>;
}
