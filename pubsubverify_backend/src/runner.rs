//! One-shot verification of a subscription: ensure it exists, pull a single
//! bounded batch, print every message and acknowledge it.

use std::{io::Write, time::Duration};

use log::{debug, info, warn};
use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    broker::{Broker, SubscriptionStatus},
    error::BackendError,
    model::{PubsubMessage, PubsubMessageToPublish, RequestPayload, SubscriptionBinding},
};

const RULE: &str = "==================================================";

pub const DEFAULT_PROJECT_ID: &str = "apx-dev";
pub const DEFAULT_TOPIC: &str = "apx-requests-us-central1";
pub const DEFAULT_SUBSCRIPTION: &str = "apx-workers-us-central1";
pub const DEFAULT_MAX_MESSAGES: i32 = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_ACK_DEADLINE_SECONDS: i32 = 20;

#[derive(Debug, Clone)]
pub struct VerifySettings {
    pub binding: SubscriptionBinding,
    pub max_messages: i32,
    pub timeout: Duration,
    pub ack_deadline_seconds: i32,
    /// Fail on subscription creation errors other than "already exists"
    /// instead of carrying on to the pull.
    pub strict_subscription: bool,
    pub probe_tenant_id: Option<String>,
    pub expectations: Expectations,
}

impl Default for VerifySettings {
    fn default() -> Self {
        Self {
            binding: SubscriptionBinding::new(
                DEFAULT_PROJECT_ID,
                DEFAULT_TOPIC,
                DEFAULT_SUBSCRIPTION,
            ),
            max_messages: DEFAULT_MAX_MESSAGES,
            timeout: DEFAULT_TIMEOUT,
            ack_deadline_seconds: DEFAULT_ACK_DEADLINE_SECONDS,
            strict_subscription: false,
            probe_tenant_id: None,
            expectations: Expectations::default(),
        }
    }
}

/// Optional checks run over the pulled batch once every message has been
/// reported and acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expectations {
    pub request_id: Option<String>,
    pub tenant_id: Option<String>,
    pub ordering_key: bool,
}

impl Expectations {
    fn is_empty(&self) -> bool {
        self.request_id.is_none() && self.tenant_id.is_none() && !self.ordering_key
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// `None` when creation failed and the failure was tolerated.
    pub subscription: Option<SubscriptionStatus>,
    pub probe_message_id: Option<String>,
    pub received: usize,
    pub acknowledged: usize,
    pub decode_failures: usize,
    pub warnings: usize,
    pub failed_checks: Vec<String>,
}

impl VerifyOutcome {
    pub fn passed(&self) -> bool {
        self.failed_checks.is_empty()
    }
}

#[derive(Debug, Default)]
struct Observed {
    request_id: Option<String>,
    body_tenant_id: Option<String>,
    attribute_tenant_id: Option<String>,
    ordering_key: String,
}

pub struct Verifier<'a, B, W> {
    broker: &'a B,
    settings: VerifySettings,
    out: W,
    outcome: VerifyOutcome,
}

impl<'a, B, W> Verifier<'a, B, W>
where
    B: Broker,
    W: Write,
{
    pub fn new(broker: &'a B, settings: VerifySettings, out: W) -> Self {
        Self {
            broker,
            settings,
            out,
            outcome: VerifyOutcome::default(),
        }
    }

    /// ensure → [probe] → pull once → report and acknowledge each message.
    pub async fn run(mut self) -> Result<VerifyOutcome, BackendError> {
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out, "Pub/Sub Verification Script")?;
        writeln!(self.out, "{RULE}")?;
        writeln!(self.out)?;

        self.outcome.subscription = self.ensure_subscription().await?;

        if let Some(tenant_id) = self.settings.probe_tenant_id.clone() {
            self.publish_probe(&tenant_id).await?;
        }

        writeln!(
            self.out,
            "📡 Listening on subscription: {}",
            self.settings.binding.subscription
        )?;
        writeln!(self.out)?;

        let messages = self.pull_batch().await?;
        self.outcome.received = messages.len();

        if messages.is_empty() {
            writeln!(self.out, "❌ No messages received")?;
            if let Some(request_id) = self.settings.expectations.request_id.clone() {
                self.outcome
                    .failed_checks
                    .push(format!("request id {request_id} not received"));
            }
            return Ok(self.outcome);
        }

        writeln!(self.out, "✅ Received {} message(s)", messages.len())?;
        writeln!(self.out)?;

        let mut observed = Vec::with_capacity(messages.len());
        for (index, message) in messages.into_iter().enumerate() {
            observed.push(self.report(index + 1, &message)?);
            self.acknowledge(message).await?;
        }

        if !self.settings.expectations.is_empty() {
            self.check_expectations(&observed)?;
        }

        writeln!(self.out, "{RULE}")?;
        if self.outcome.passed() {
            writeln!(self.out, "✅ Verification complete!")?;
        } else {
            writeln!(
                self.out,
                "❌ Verification failed: {}",
                self.outcome.failed_checks.join("; ")
            )?;
        }
        writeln!(self.out, "{RULE}")?;

        Ok(self.outcome)
    }

    /// Creates the subscription if needed. Creation errors other than
    /// "already exists" are only fatal in strict mode.
    pub async fn ensure_subscription(
        &mut self,
    ) -> Result<Option<SubscriptionStatus>, BackendError> {
        let binding = &self.settings.binding;

        match self
            .broker
            .ensure_subscription(binding, self.settings.ack_deadline_seconds)
            .await
        {
            Ok(SubscriptionStatus::Created) => {
                info!("created subscription {}", binding.subscription_path());
                writeln!(self.out, "✅ Created subscription: {}", binding.subscription)?;
                Ok(Some(SubscriptionStatus::Created))
            }
            Ok(SubscriptionStatus::AlreadyExists) => {
                info!("subscription {} already exists", binding.subscription_path());
                writeln!(
                    self.out,
                    "ℹ️  Subscription already exists: {}",
                    binding.subscription
                )?;
                Ok(Some(SubscriptionStatus::AlreadyExists))
            }
            Err(err) if self.settings.strict_subscription => Err(err),
            Err(err) => {
                warn!("continuing without a confirmed subscription: {err}");
                writeln!(self.out, "ℹ️  Subscription exists or error: {err}")?;
                Ok(None)
            }
        }
    }

    pub async fn publish_probe(&mut self, tenant_id: &str) -> Result<String, BackendError> {
        let probe = RequestPayload::probe(tenant_id);
        let request_id = probe.request_id_str().unwrap_or_default().to_string();
        let message = PubsubMessageToPublish::from_request(&probe)?;

        let message_id = self.broker.publish(&self.settings.binding, message).await?;
        info!("published probe {message_id} with request id {request_id}");
        writeln!(self.out, "📤 Published probe request: {request_id}")?;

        self.settings.expectations.request_id = Some(request_id);
        self.outcome.probe_message_id = Some(message_id.clone());
        Ok(message_id)
    }

    /// Pulls once. An elapsed timeout yields an empty batch; broker errors
    /// are returned as-is.
    pub async fn pull_batch(
        &self,
    ) -> Result<Vec<PubsubMessage<B::AckHandle>>, BackendError> {
        let broker = self.broker;
        let binding = &self.settings.binding;
        let timeout = self.settings.timeout;

        let cancel_token = CancellationToken::new();
        let timer = {
            let cancel_token = cancel_token.clone();
            tokio::spawn(async move {
                sleep(timeout).await;
                cancel_token.cancel();
            })
        };

        let result = select! {
            _ = cancel_token.cancelled() => {
                debug!("pull timed out after {timeout:?}");
                Ok(Vec::new())
            }
            messages = broker.pull(binding, self.settings.max_messages) => messages,
        };

        timer.abort();
        result
    }

    /// Prints one message. Payload decode failures are reported inline and
    /// never abort the run.
    fn report(
        &mut self,
        number: usize,
        message: &PubsubMessage<B::AckHandle>,
    ) -> Result<Observed, BackendError> {
        let attributes = message.sorted_attributes();

        writeln!(self.out, "Message #{number}:")?;
        writeln!(self.out, "  Message ID: {}", message.id)?;
        writeln!(self.out, "  Publish Time: {}", message.publish_time_display())?;
        writeln!(self.out, "  Ordering Key: {}", message.ordering_key)?;
        writeln!(self.out, "  Attributes: {attributes:?}")?;

        let mut observed = Observed {
            attribute_tenant_id: attributes.get("tenant_id").map(|t| t.to_string()),
            ordering_key: message.ordering_key.clone(),
            ..Default::default()
        };

        match message.decode() {
            Ok(payload) => {
                writeln!(self.out, "  Data:")?;
                for (label, value) in payload.fields() {
                    writeln!(self.out, "    {label}: {value}")?;
                }
                observed.request_id = payload.request_id_str().map(str::to_string);
                observed.body_tenant_id = payload.tenant_id_str().map(str::to_string);
            }
            Err(err) => {
                warn!("message {} has an undecodable payload: {err}", message.id);
                self.outcome.decode_failures += 1;
                writeln!(self.out, "  ⚠️  Failed to decode data: {err}")?;
                writeln!(self.out, "  Raw data: {}", message.raw_data())?;
            }
        }

        writeln!(self.out)?;
        Ok(observed)
    }

    pub async fn acknowledge(
        &mut self,
        message: PubsubMessage<B::AckHandle>,
    ) -> Result<(), BackendError> {
        self.broker
            .acknowledge(&self.settings.binding, &message.id, message.ack_handle)
            .await?;
        debug!("acknowledged message {}", message.id);
        self.outcome.acknowledged += 1;
        Ok(())
    }

    fn check_expectations(&mut self, observed: &[Observed]) -> Result<(), BackendError> {
        let expectations = self.settings.expectations.clone();
        writeln!(self.out, "Checks:")?;

        if let Some(expected) = &expectations.request_id {
            if observed
                .iter()
                .any(|o| o.request_id.as_deref() == Some(expected.as_str()))
            {
                writeln!(self.out, "  ✅ Request ID received: {expected}")?;
            } else {
                writeln!(self.out, "  ❌ Request ID not received: {expected}")?;
                self.outcome
                    .failed_checks
                    .push(format!("request id {expected} not received"));
            }
        }

        for (index, o) in observed.iter().enumerate() {
            let number = index + 1;

            if let Some(expected) = &expectations.tenant_id {
                self.check_tenant(
                    number,
                    "attribute",
                    expected,
                    o.attribute_tenant_id.as_deref(),
                )?;
                self.check_tenant(number, "body", expected, o.body_tenant_id.as_deref())?;
            }

            if expectations.ordering_key {
                if o.ordering_key.is_empty() {
                    self.warn(format!("Message #{number}: no ordering key found"))?;
                } else {
                    writeln!(
                        self.out,
                        "  ✅ Message #{number}: ordering key present: {}",
                        o.ordering_key
                    )?;
                }
            }
        }

        writeln!(self.out)?;
        Ok(())
    }

    fn check_tenant(
        &mut self,
        number: usize,
        source: &str,
        expected: &str,
        actual: Option<&str>,
    ) -> Result<(), BackendError> {
        match actual {
            Some(actual) if actual == expected => {
                writeln!(
                    self.out,
                    "  ✅ Message #{number}: tenant id {source} correct: {actual}"
                )?;
                Ok(())
            }
            actual => self.warn(format!(
                "Message #{number}: tenant id {source} mismatch, expected {expected}, got {}",
                actual.unwrap_or(crate::model::ABSENT)
            )),
        }
    }

    fn warn(&mut self, line: String) -> Result<(), BackendError> {
        self.outcome.warnings += 1;
        writeln!(self.out, "  ⚠️  {line}")?;
        Ok(())
    }
}
