use chrono::{DateTime, Utc};
use serde::Serialize;

pub const DEFAULT_TOPIC: &str = "Mind Map";
pub const EMPTY_RESPONSE_MARKDOWN: &str = "# Mind Map\n\nError: No content received";

/// Canonical content of one mind map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub topic: String,
    pub markdown: String,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(topic: impl Into<String>, markdown: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            markdown: markdown.into(),
            created_at: Utc::now(),
        }
    }

    /// Document shown when the service returned nothing usable.
    pub fn empty_response() -> Self {
        Self::new(DEFAULT_TOPIC, EMPTY_RESPONSE_MARKDOWN)
    }

    pub fn has_content(&self) -> bool {
        !self.markdown.trim().is_empty()
    }

    pub fn share_payload(&self) -> SharePayload<'_> {
        SharePayload {
            topic: &self.topic,
            markdown: &self.markdown,
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Body sent to the sharing endpoint.
#[derive(Debug, Serialize)]
pub struct SharePayload<'a> {
    pub topic: &'a str,
    pub markdown: &'a str,
    pub timestamp: String,
}
