//! Webhook handler.
//!
//! Decodes a change notification, acknowledges it back to the trigger
//! system, and relays it to the analytics sink as a track event.

use axum::{extract::State, Json};
use serde_json::{Map, Value};
use service_core::error::AppError;

use crate::{
    models::{ChangeEvent, TriggerResponse},
    services::TrackEvent,
    startup::AppState,
};

/// User id reported when the new row has no usable identifier.
const ANONYMOUS_USER_ID: &str = "anonymous";

pub async fn webhook(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<TriggerResponse>, AppError> {
    // Without a write key there is nothing to relay to. Reject before
    // looking at the body at all.
    if !state.analytics.is_configured() {
        return Err(AppError::ConfigError(anyhow::anyhow!(
            "analytics write key is not configured"
        )));
    }

    let event: ChangeEvent =
        serde_json::from_str(&body).map_err(|e| AppError::BadRequest(anyhow::anyhow!(e)))?;

    tracing::info!(
        event_id = %event.id,
        op = %event.event.op,
        table = %event.table.name,
        "Received change event"
    );

    let message = summary_message(&event);
    let track = build_track_event(&event, &state.config.user_id_field);

    // Fire and forget; the sink client delivers in the background.
    state.analytics.enqueue(track).await;

    Ok(Json(TriggerResponse {
        message,
        old_data: event.event.data.old,
        new_data: event.event.data.new,
    }))
}

fn summary_message(event: &ChangeEvent) -> String {
    format!(
        "got '{}' for '{}' operation on '{}' table in '{}' schema from '{}' trigger",
        event.id, event.event.op, event.table.name, event.table.schema, event.trigger.name
    )
}

/// Derive the analytics track event: `{op}_{table}` as the name, the
/// configured column of the new row as the user id, and a property bag
/// seeded with the notification id then overlaid with the new row.
fn build_track_event(event: &ChangeEvent, user_id_field: &str) -> TrackEvent {
    let new_row = event.event.data.new.as_ref();

    let user_id = new_row
        .and_then(|row| row.get(user_id_field))
        .map_or_else(|| ANONYMOUS_USER_ID.to_string(), user_id_string);

    let mut properties = Map::new();
    properties.insert("event_id".to_string(), Value::String(event.id.clone()));
    if let Some(row) = new_row {
        for (key, value) in row {
            properties.insert(key.clone(), value.clone());
        }
    }

    TrackEvent {
        event: format!("{}_{}", event.event.op, event.table.name),
        user_id,
        properties,
    }
}

/// Render whatever sits in the user-id column as an identifier. Strings
/// pass through untouched; any other value becomes its JSON text.
fn user_id_string(value: &Value) -> String {
    match value {
        Value::Null => ANONYMOUS_USER_ID.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
