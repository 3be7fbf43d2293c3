//! Action RPC over the message-queue pair.
//!
//! Requests go to `request_queue`; all responses arrive on the shared
//! `response_queue` and are matched by correlation id. The poll loop
//! dequeues at most one message per poll under the engine's response
//! lock; a response meant for another in-flight call is re-published,
//! never discarded.

use std::time::Duration;

use serde_json::{Map, Value, json};
use tokio::time::Instant;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::EngineError;
use crate::port::{GeneratorBackend, MessageQueue};

use super::Engine;

pub(super) const REQUEST_QUEUE: &str = "request_queue";
pub(super) const RESPONSE_QUEUE: &str = "response_queue";

impl<Q, G> Engine<Q, G>
where
    Q: MessageQueue,
    G: GeneratorBackend,
{
    /// Publish one action request and poll for its correlated response.
    pub(super) async fn call_action(
        &self,
        action_id: &str,
        inputs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, EngineError> {
        let correlation_id = Uuid::now_v7().to_string();
        let request = json!({
            "action_id": action_id,
            "inputs": inputs,
            "correlation_id": correlation_id,
        });
        self.queue.publish(REQUEST_QUEUE, request).await?;
        debug!(action_id, correlation_id, "published action request");

        let timeout_secs = self.config.action_timeout_secs;
        let deadline = Instant::now() + Duration::from_secs(timeout_secs);

        loop {
            if let Some(response) = self.fetch_correlated(&correlation_id).await? {
                return parse_response_outputs(action_id, response);
            }
            if Instant::now() >= deadline {
                return Err(EngineError::ActionTimeout {
                    action_id: action_id.to_string(),
                    timeout_secs,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
        }
    }

    /// One fetch-or-requeue poll. Holds the response lock so concurrent
    /// callers cannot steal (and then requeue out of order) each other's
    /// messages.
    async fn fetch_correlated(
        &self,
        correlation_id: &str,
    ) -> Result<Option<Value>, EngineError> {
        let _guard = self.response_lock.lock().await;
        let Some(message) = self.queue.take(RESPONSE_QUEUE).await? else {
            return Ok(None);
        };
        let matches = message
            .get("correlation_id")
            .and_then(Value::as_str)
            .is_some_and(|id| id == correlation_id);
        if matches {
            Ok(Some(message))
        } else {
            trace!(correlation_id, "requeueing foreign response");
            self.queue.publish(RESPONSE_QUEUE, message).await?;
            Ok(None)
        }
    }
}

/// The response's `output` field carries the outputs map, either inline
/// or JSON-encoded as a string.
fn parse_response_outputs(
    action_id: &str,
    response: Value,
) -> Result<Map<String, Value>, EngineError> {
    let output = response.get("output").ok_or_else(|| {
        EngineError::Runtime(format!("action '{action_id}' response has no 'output'"))
    })?;
    let decoded = match output {
        Value::Object(map) => return Ok(map.clone()),
        Value::String(text) => serde_json::from_str::<Value>(text)?,
        other => other.clone(),
    };
    match decoded {
        Value::Object(map) => Ok(map),
        other => Err(EngineError::Runtime(format!(
            "action '{action_id}' response output is not an object: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_output_accepts_inline_and_encoded_maps() {
        let inline = json!({"correlation_id": "c", "output": {"weather_result": "sunny"}});
        let outputs = parse_response_outputs("a", inline).unwrap();
        assert_eq!(outputs["weather_result"], json!("sunny"));

        let encoded = json!({"correlation_id": "c", "output": "{\"weather_result\":\"rain\"}"});
        let outputs = parse_response_outputs("a", encoded).unwrap();
        assert_eq!(outputs["weather_result"], json!("rain"));
    }

    #[test]
    fn response_without_output_is_a_runtime_error() {
        let err = parse_response_outputs("a", json!({"correlation_id": "c"})).unwrap_err();
        assert!(err.to_string().contains("'output'"));
    }

    #[test]
    fn non_object_output_is_a_runtime_error() {
        let err = parse_response_outputs("a", json!({"output": 42})).unwrap_err();
        assert!(err.to_string().contains("not an object"));
    }
}
