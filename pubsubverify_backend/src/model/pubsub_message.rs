use chrono::{DateTime, TimeZone, Utc};
use google_cloud_pubsub::subscriber::ReceivedMessage;
use serde_json::Value;
use std::{
    collections::{BTreeMap, HashMap},
    mem, str,
};

use crate::error::DecodeError;

use super::RequestPayload;

/// A message returned by a single pull, together with the handle that
/// acknowledges it. `H` is whatever the broker needs to redeem the ack.
#[derive(Debug, Clone)]
pub struct PubsubMessage<H> {
    pub id: String,
    pub publish_time: Option<DateTime<Utc>>,
    pub ordering_key: String,
    pub attributes: HashMap<String, String>,
    pub data: Vec<u8>,
    pub ack_handle: H,
}

impl<H> PubsubMessage<H> {
    /// Parses the payload as a UTF-8 JSON object.
    pub fn decode(&self) -> Result<RequestPayload, DecodeError> {
        let text = str::from_utf8(&self.data)?;
        match serde_json::from_str::<Value>(text)? {
            value @ Value::Object(_) => Ok(serde_json::from_value(value)?),
            _ => Err(DecodeError::NotObject),
        }
    }

    pub fn sorted_attributes(&self) -> BTreeMap<&str, &str> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// The payload as an escaped byte string, e.g. `b"{\"a\":1}\xff"`.
    pub fn raw_data(&self) -> String {
        format!("b\"{}\"", self.data.escape_ascii())
    }

    pub fn publish_time_display(&self) -> String {
        self.publish_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| super::ABSENT.to_string())
    }
}

impl From<ReceivedMessage> for PubsubMessage<ReceivedMessage> {
    fn from(mut value: ReceivedMessage) -> Self {
        let publish_time = value
            .message
            .publish_time
            .take()
            .map(|t| Utc.timestamp_opt(t.seconds, t.nanos.try_into().unwrap_or(0)))
            .and_then(|lr| match lr {
                chrono::LocalResult::Single(dt) => Some(dt),
                _ => None,
            });

        Self {
            id: mem::take(&mut value.message.message_id),
            publish_time,
            ordering_key: mem::take(&mut value.message.ordering_key),
            attributes: mem::take(&mut value.message.attributes),
            data: mem::take(&mut value.message.data),
            ack_handle: value,
        }
    }
}
