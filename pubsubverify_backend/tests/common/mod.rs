//! An in-memory broker for driving the verifier without an emulator.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    future,
    sync::Mutex,
};

use google_cloud_gax::grpc::{Code, Status};
use pubsubverify_backend::{
    broker::{Broker, SubscriptionStatus},
    error::BackendError,
    model::{PubsubMessage, PubsubMessageToPublish, SubscriptionBinding},
};

pub const FULL_PAYLOAD: &str = r#"{"request_id":"r1","tenant_id":"t1","route":"/x","method":"GET","received_at":"2024-01-01T00:00:00Z"}"#;

pub fn full_payload(request_id: &str) -> String {
    FULL_PAYLOAD.replace("\"r1\"", &format!("\"{request_id}\""))
}

#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    subscriptions: HashSet<String>,
    pending: VecDeque<PubsubMessage<String>>,
    /// ack id -> message id, for messages pulled but not yet acknowledged.
    outstanding: HashMap<String, String>,
    acked: Vec<String>,
    published: Vec<PubsubMessageToPublish>,
    pulls: usize,
    next_id: u64,
    create_error: Option<Code>,
    pull_error: Option<Code>,
    ack_error: Option<Code>,
    stall_pull: bool,
}

impl State {
    fn enqueue(&mut self, message: PubsubMessageToPublish) -> String {
        self.next_id += 1;
        let id = self.next_id.to_string();
        self.pending.push_back(PubsubMessage {
            id: id.clone(),
            publish_time: None,
            ordering_key: message.ordering_key,
            attributes: message.attributes,
            data: message.data,
            ack_handle: format!("ack-{id}"),
        });
        id
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: PubsubMessageToPublish) -> String {
        self.state.lock().unwrap().enqueue(message)
    }

    pub fn push_data(&self, data: impl Into<Vec<u8>>) -> String {
        self.push(PubsubMessageToPublish::new(data))
    }

    pub fn acked(&self) -> Vec<String> {
        self.state.lock().unwrap().acked.clone()
    }

    pub fn pulls(&self) -> usize {
        self.state.lock().unwrap().pulls
    }

    pub fn pending(&self) -> usize {
        self.state.lock().unwrap().pending.len()
    }

    pub fn published(&self) -> Vec<PubsubMessageToPublish> {
        self.state.lock().unwrap().published.clone()
    }

    pub fn fail_create(&self, code: Code) {
        self.state.lock().unwrap().create_error = Some(code);
    }

    pub fn fail_pull(&self, code: Code) {
        self.state.lock().unwrap().pull_error = Some(code);
    }

    pub fn fail_ack(&self, code: Code) {
        self.state.lock().unwrap().ack_error = Some(code);
    }

    /// Makes every pull block until the caller gives up.
    pub fn stall_pull(&self) {
        self.state.lock().unwrap().stall_pull = true;
    }
}

impl Broker for InMemoryBroker {
    type AckHandle = String;

    async fn ensure_subscription(
        &self,
        binding: &SubscriptionBinding,
        _ack_deadline_seconds: i32,
    ) -> Result<SubscriptionStatus, BackendError> {
        let mut state = self.state.lock().unwrap();

        if let Some(code) = state.create_error {
            return Err(BackendError::CreateSubscription {
                subscription: binding.subscription.clone(),
                status: Status::new(code, "create rejected"),
            });
        }

        if state.subscriptions.insert(binding.subscription_path()) {
            Ok(SubscriptionStatus::Created)
        } else {
            Ok(SubscriptionStatus::AlreadyExists)
        }
    }

    async fn pull(
        &self,
        binding: &SubscriptionBinding,
        max_messages: i32,
    ) -> Result<Vec<PubsubMessage<String>>, BackendError> {
        let stall = {
            let mut state = self.state.lock().unwrap();
            state.pulls += 1;
            state.stall_pull
        };
        if stall {
            future::pending::<()>().await;
        }

        let mut state = self.state.lock().unwrap();

        if let Some(code) = state.pull_error {
            return Err(BackendError::Pull {
                subscription: binding.subscription.clone(),
                status: Status::new(code, "pull rejected"),
            });
        }

        let count = state.pending.len().min(max_messages as usize);
        let batch: Vec<_> = state.pending.drain(..count).collect();
        for message in &batch {
            state
                .outstanding
                .insert(message.ack_handle.clone(), message.id.clone());
        }
        Ok(batch)
    }

    async fn acknowledge(
        &self,
        _binding: &SubscriptionBinding,
        message_id: &str,
        handle: String,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();

        let code = match state.ack_error {
            Some(code) => Some(code),
            None if !state.outstanding.contains_key(&handle) => Some(Code::InvalidArgument),
            None => None,
        };
        if let Some(code) = code {
            return Err(BackendError::Acknowledge {
                message_id: message_id.to_string(),
                status: Status::new(code, "ack rejected"),
            });
        }

        let id = state.outstanding.remove(&handle).unwrap_or_default();
        state.acked.push(id);
        Ok(())
    }

    async fn publish(
        &self,
        _binding: &SubscriptionBinding,
        message: PubsubMessageToPublish,
    ) -> Result<String, BackendError> {
        let mut state = self.state.lock().unwrap();
        state.published.push(message.clone());
        Ok(state.enqueue(message))
    }
}
