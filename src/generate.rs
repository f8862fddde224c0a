use crate::http::{HttpReply, Transport};
use crate::normalize::RawResponse;
use log::{error, info};
use serde::Serialize;
use serde_json::Value;

pub const GENERIC_GENERATION_ERROR: &str = "An error occurred while generating the mindmap";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The service answered with an explicit `{error}` message.
    #[error("{0}")]
    Service(String),
    #[error("An error occurred while generating the mindmap")]
    Failed,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    input: &'a str,
}

pub struct GenerationClient<T> {
    transport: T,
    url: String,
}

impl<T: Transport> GenerationClient<T> {
    pub fn new(transport: T, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }

    pub fn request(&self, topic: &str) -> Result<RawResponse, GenerationError> {
        info!("requesting mind map for {topic:?}");
        let reply = self
            .transport
            .post_json(&self.url, &GenerateRequest { input: topic })
            .map_err(|err| {
                error!("generation request failed: {err}");
                GenerationError::Failed
            })?;
        classify_reply(&reply)
    }
}

/// `{error}` is a failure, `{response}` wraps the payload, anything else is the payload.
pub fn classify_reply(reply: &HttpReply) -> Result<RawResponse, GenerationError> {
    let data = match reply.json() {
        Ok(data) => data,
        Err(err) => {
            error!("generation reply (status {}) is not JSON: {err}", reply.status);
            return Err(GenerationError::Failed);
        }
    };

    if let Some(message) = data.get("error").filter(|value| is_truthy(value)) {
        let message = match message {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        return Err(GenerationError::Service(message));
    }
    if !reply.is_success() {
        error!("generation service answered with status {}", reply.status);
        return Err(GenerationError::Failed);
    }

    let payload = data
        .get("response")
        .filter(|value| is_truthy(value))
        .unwrap_or(&data);
    Ok(RawResponse::from_json(payload))
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::String(text) => !text.is_empty(),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
