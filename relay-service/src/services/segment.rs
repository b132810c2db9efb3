//! Segment analytics sink client.
//!
//! Implements the track half of Segment's HTTP v1 API. Events are queued
//! on a bounded channel and a background worker flushes them to the
//! `/batch` endpoint, either when a batch fills up or on a timer.
//! Delivery is best effort: a failed flush is logged and the batch is
//! dropped, never retried.

use crate::config::AnalyticsConfig;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::mpsc;

/// Events waiting for delivery before enqueue starts blocking producers.
const QUEUE_CAPACITY: usize = 1024;

/// Upper bound on events per `/batch` call.
const MAX_BATCH_SIZE: usize = 100;

/// A single analytics track call.
#[derive(Debug, Clone, Serialize)]
pub struct TrackEvent {
    /// Event name, `{op}_{table}`.
    pub event: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Property bag: the notification id plus the new row's columns.
    pub properties: Map<String, Value>,
}

#[derive(Serialize)]
struct BatchItem<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    event: &'a str,
    #[serde(rename = "userId")]
    user_id: &'a str,
    properties: &'a Map<String, Value>,
}

impl<'a> From<&'a TrackEvent> for BatchItem<'a> {
    fn from(event: &'a TrackEvent) -> Self {
        Self {
            kind: "track",
            event: &event.event,
            user_id: &event.user_id,
            properties: &event.properties,
        }
    }
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    batch: Vec<BatchItem<'a>>,
}

/// Handle to the delivery queue. Cheap to clone; all clones feed the same
/// background worker.
#[derive(Clone)]
pub struct SegmentClient {
    sender: Option<mpsc::Sender<TrackEvent>>,
}

impl SegmentClient {
    /// Create the client and, when a write key is present, spawn its
    /// delivery worker. Without a key the client still constructs; it just
    /// reports itself unconfigured so callers can reject work up front.
    pub fn new(config: &AnalyticsConfig) -> Self {
        let Some(write_key) = config.write_key.clone() else {
            return Self { sender: None };
        };

        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);

        let worker = DeliveryWorker {
            client: Client::new(),
            write_key,
            batch_url: format!("{}/batch", config.api_base_url.trim_end_matches('/')),
            flush_interval: Duration::from_millis(config.flush_interval_ms),
            receiver,
        };
        tokio::spawn(worker.run());

        Self {
            sender: Some(sender),
        }
    }

    /// Whether a write key was available at startup.
    pub fn is_configured(&self) -> bool {
        self.sender.is_some()
    }

    /// Queue a track event for background delivery. Returns as soon as the
    /// event is on the queue; blocks only while the queue is full. Never
    /// waits on the network.
    pub async fn enqueue(&self, event: TrackEvent) {
        let Some(sender) = &self.sender else {
            return;
        };

        tracing::debug!(
            event = %event.event,
            user_id = %event.user_id,
            "Queueing track event"
        );

        if sender.send(event).await.is_err() {
            tracing::error!("Track event dropped - delivery worker is gone");
        }
    }
}

struct DeliveryWorker {
    client: Client,
    write_key: Secret<String>,
    batch_url: String,
    flush_interval: Duration,
    receiver: mpsc::Receiver<TrackEvent>,
}

impl DeliveryWorker {
    async fn run(mut self) {
        let mut pending: Vec<TrackEvent> = Vec::new();
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = self.receiver.recv() => {
                    match received {
                        Some(event) => {
                            pending.push(event);
                            if pending.len() >= MAX_BATCH_SIZE {
                                self.flush(&mut pending).await;
                            }
                        }
                        None => {
                            // All producers are gone; deliver what is left.
                            self.flush(&mut pending).await;
                            return;
                        }
                    }
                }
                _ = ticker.tick() => {
                    self.flush(&mut pending).await;
                }
            }
        }
    }

    async fn flush(&self, pending: &mut Vec<TrackEvent>) {
        if pending.is_empty() {
            return;
        }

        let request = BatchRequest {
            batch: pending.iter().map(BatchItem::from).collect(),
        };

        let result = self
            .client
            .post(&self.batch_url)
            .basic_auth(self.write_key.expose_secret(), Some(""))
            .json(&request)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(count = pending.len(), "Flushed track events");
            }
            Ok(response) => {
                tracing::error!(
                    status = %response.status(),
                    count = pending.len(),
                    "Analytics sink rejected batch"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    count = pending.len(),
                    "Failed to deliver track events"
                );
            }
        }

        pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_without_write_key() {
        let client = SegmentClient::new(&AnalyticsConfig {
            write_key: None,
            api_base_url: "https://api.segment.io/v1".to_string(),
            flush_interval_ms: 2000,
        });

        assert!(!client.is_configured());
    }

    #[test]
    fn batch_payload_shape() {
        let mut properties = Map::new();
        properties.insert("event_id".to_string(), Value::String("1".to_string()));
        properties.insert("name".to_string(), Value::String("x".to_string()));

        let event = TrackEvent {
            event: "INSERT_users".to_string(),
            user_id: "abc".to_string(),
            properties,
        };

        let request = BatchRequest {
            batch: vec![BatchItem::from(&event)],
        };
        let body = serde_json::to_value(&request).expect("serializes");

        assert_eq!(body["batch"][0]["type"], "track");
        assert_eq!(body["batch"][0]["event"], "INSERT_users");
        assert_eq!(body["batch"][0]["userId"], "abc");
        assert_eq!(body["batch"][0]["properties"]["event_id"], "1");
        assert_eq!(body["batch"][0]["properties"]["name"], "x");
    }
}
