use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Rendered in place of a field the payload does not carry.
pub const ABSENT: &str = "<absent>";

/// The request envelope the router publishes for every proxied call.
///
/// All fields are optional; a payload missing any of them still decodes.
/// Values are kept as raw JSON so they can be reported without coercion.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct RequestPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<Value>,
}

impl RequestPayload {
    pub fn probe(tenant_id: &str) -> Self {
        Self {
            request_id: Some(Value::String(Uuid::new_v4().to_string())),
            tenant_id: Some(Value::String(tenant_id.to_string())),
            route: Some(Value::String("/verify/probe".to_string())),
            method: Some(Value::String("POST".to_string())),
            received_at: Some(Value::String(
                Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            )),
        }
    }

    /// `(label, rendered value)` for each reported field, in report order.
    pub fn fields(&self) -> [(&'static str, String); 5] {
        [
            ("Request ID", render(&self.request_id)),
            ("Tenant ID", render(&self.tenant_id)),
            ("Route", render(&self.route)),
            ("Method", render(&self.method)),
            ("Received At", render(&self.received_at)),
        ]
    }

    pub fn request_id_str(&self) -> Option<&str> {
        self.request_id.as_ref().and_then(Value::as_str)
    }

    pub fn tenant_id_str(&self) -> Option<&str> {
        self.tenant_id.as_ref().and_then(Value::as_str)
    }
}

fn render(value: &Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => ABSENT.to_string(),
    }
}
