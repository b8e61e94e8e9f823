//! Resource identity resolution.
//!
//! The provider sends the same notification in several envelope shapes, depending on topic and
//! API vintage: the resource id may arrive as the `data.id` or `id` query parameter, inside the
//! JSON body under `data.id`, or buried at the end of a `resource` URL such as
//! `https://api.example.com/merchant_orders/123456`. [`resolve_resource_id`] probes those
//! locations from most to least explicit and returns the first usable id.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::{db_types::WebhookTopic, webhook::WebhookRequest};

/// The topic and resource id pulled out of a notification. Everything downstream of the HTTP
/// boundary works off this pair rather than the raw request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub topic: WebhookTopic,
    pub resource_id: String,
}

/// Resolves the topic and resource id together, or `None` if either is missing. Events that
/// cannot be resolved are acknowledged and dropped by the caller.
pub fn resolve_event(req: &WebhookRequest) -> Option<ResolvedEvent> {
    let topic = resolve_topic(req)?;
    let resource_id = resolve_resource_id(req)?;
    Some(ResolvedEvent { topic, resource_id })
}

/// Finds the resource id, trying in order: the `data.id` query parameter, the `id` query
/// parameter, the body's `data.id` field (string or number), and finally the trailing numeric
/// segment of the body's `resource` URL.
pub fn resolve_resource_id(req: &WebhookRequest) -> Option<String> {
    if let Some(id) = nonempty(req.query_param("data.id")) {
        return Some(id);
    }
    if let Some(id) = nonempty(req.query_param("id")) {
        return Some(id);
    }
    let body = req.body.as_ref()?;
    if let Some(id) = body.pointer("/data/id").and_then(value_as_id) {
        return Some(id);
    }
    if let Some(id) = body.get("resource").and_then(Value::as_str).and_then(trailing_numeric_segment) {
        return Some(id);
    }
    None
}

/// Finds the topic from the `topic` or `type` query parameters, falling back to the same fields
/// in the body. Values that do not parse to a known topic are skipped.
pub fn resolve_topic(req: &WebhookRequest) -> Option<WebhookTopic> {
    for key in ["topic", "type"] {
        if let Some(topic) = req.query_param(key).and_then(|v| v.parse().ok()) {
            return Some(topic);
        }
    }
    let body = req.body.as_ref()?;
    for key in ["topic", "type"] {
        if let Some(topic) = body.get(key).and_then(Value::as_str).and_then(|v| v.parse().ok()) {
            return Some(topic);
        }
    }
    None
}

fn nonempty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extracts the trailing numeric path segment of a resource URL. If the last segment is not
/// purely numeric, falls back to a regex grab of trailing digits, which copes with stray slashes
/// and whitespace.
fn trailing_numeric_segment(resource: &str) -> Option<String> {
    let trimmed = resource.trim().trim_end_matches('/');
    if let Some(segment) = trimmed.rsplit('/').next() {
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            return Some(segment.to_string());
        }
    }
    static TRAILING_DIGITS: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING_DIGITS.get_or_init(|| Regex::new(r"(\d+)\s*/*\s*$").expect("hardcoded regex is valid"));
    re.captures(resource).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}
