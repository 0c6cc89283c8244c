use std::collections::HashMap;

use super::RequestPayload;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PubsubMessageToPublish {
    pub data: Vec<u8>,
    pub attributes: HashMap<String, String>,
    pub ordering_key: String,
}

impl PubsubMessageToPublish {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_ordering_key(mut self, ordering_key: impl Into<String>) -> Self {
        self.ordering_key = ordering_key.into();
        self
    }

    /// Encodes a request envelope the way the router publishes it: JSON body,
    /// tenant id both as an attribute and as the ordering key.
    pub fn from_request(payload: &RequestPayload) -> Result<Self, serde_json::Error> {
        let mut message = Self::new(serde_json::to_vec(payload)?);
        if let Some(tenant_id) = payload.tenant_id_str() {
            message = message
                .with_attribute("tenant_id", tenant_id)
                .with_ordering_key(tenant_id);
        }
        Ok(message)
    }
}

impl From<PubsubMessageToPublish> for google_cloud_googleapis::pubsub::v1::PubsubMessage {
    fn from(val: PubsubMessageToPublish) -> Self {
        Self {
            data: val.data,
            attributes: val.attributes,
            ordering_key: val.ordering_key,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_tenant_becomes_attribute_and_ordering_key() {
        let probe = RequestPayload::probe("test-tenant");
        let message = PubsubMessageToPublish::from_request(&probe).unwrap();

        assert_eq!(message.ordering_key, "test-tenant");
        assert_eq!(
            message.attributes.get("tenant_id").map(String::as_str),
            Some("test-tenant")
        );

        let proto: google_cloud_googleapis::pubsub::v1::PubsubMessage = message.into();
        assert_eq!(proto.ordering_key, "test-tenant");
        assert!(proto.message_id.is_empty());
    }
}
