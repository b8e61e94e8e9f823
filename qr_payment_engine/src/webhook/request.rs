use std::collections::HashMap;

use serde_json::Value;

/// Header carrying the comma-separated `ts=...,v1=...` signature pairs.
pub const SIGNATURE_HEADER: &str = "x-signature";
/// Header carrying the provider's delivery id, covered by the signature manifest.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A provider notification, flattened to the three parts the engine cares about.
///
/// Header names are stored lowercase. The body is kept as raw JSON because the provider sends
/// several envelope shapes for the same topic and the resolver wants to probe them all.
#[derive(Debug, Clone, Default)]
pub struct WebhookRequest {
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

impl WebhookRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The provider's delivery id, if the header was sent.
    pub fn request_id(&self) -> Option<&str> {
        self.header(REQUEST_ID_HEADER)
    }
}
