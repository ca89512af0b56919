//! Events API Lambda - Create, fetch, list and delete calendar events.
//!
//! Endpoints:
//! - GET /event/today - Events dated today (server local date)
//! - POST /event - Add an event
//! - GET /event - Events within an optional inclusive date range
//! - GET /event/{id} - Get a single event
//! - DELETE /event/{id} - Delete an event, returning it

use chrono::{Local, NaiveDate};
use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use serde::{Deserialize, Serialize};
use shared::http::{empty_response, error_response, json_response, message_response};
use shared::models::DATE_FORMAT;
use shared::{open_store, parse_iso_date, Config, DateRange, Event, EventStore, NewEvent};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use validator::{Validate, ValidationError};

const EVENT_ADDED: &str = "The event has been added!";

/// Add event request. The body must hold exactly these two keys.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
struct AddEventRequest {
    #[validate(custom(function = "not_blank"))]
    event: String,
    #[validate(custom(function = "not_blank"))]
    date: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Event API response
#[derive(Debug, Serialize)]
struct EventResponse {
    id: i32,
    event: String,
    date: String,
}

impl From<Event> for EventResponse {
    fn from(event: Event) -> Self {
        Self {
            id: event.id,
            event: event.event,
            date: event.date.format(DATE_FORMAT).to_string(),
        }
    }
}

/// Confirmation returned by POST /event
#[derive(Debug, Serialize)]
struct EventAddedResponse {
    message: &'static str,
    event: String,
    date: String,
}

/// Application state
struct AppState {
    store: Arc<dyn EventStore>,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let store = open_store(&config).await?;
        Ok(Self { store })
    }
}

/// Decode and validate an add-event body into a [`NewEvent`].
fn parse_new_event(body: &Body) -> shared::Result<NewEvent> {
    let payload: serde_json::Map<String, serde_json::Value> =
        serde_json::from_slice(body.as_ref())
            .map_err(|e| shared::Error::Validation(format!("Invalid request body: {}", e)))?;

    if payload.len() != 2 {
        return Err(shared::Error::Validation(format!(
            "Expected exactly 'event' and 'date', got {} keys",
            payload.len()
        )));
    }

    let request: AddEventRequest = serde_json::from_value(serde_json::Value::Object(payload))
        .map_err(|e| shared::Error::Validation(format!("Invalid request: {}", e)))?;

    request
        .validate()
        .map_err(|e| shared::Error::Validation(e.to_string()))?;

    let date = parse_iso_date(&request.date)?;

    Ok(NewEvent {
        event: request.event,
        date,
    })
}

fn parse_event_id(path: &str) -> shared::Result<i32> {
    let raw_id = path.trim_start_matches("/event/");
    raw_id
        .parse()
        .map_err(|_| shared::Error::Validation(format!("Invalid event id '{}'", raw_id)))
}

async fn find_event(state: &AppState, id: i32) -> shared::Result<Event> {
    state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| shared::Error::NotFound(format!("event {}", id)))
}

async fn today_events(state: &AppState, today: NaiveDate) -> shared::Result<Response<Body>> {
    let events: Vec<EventResponse> = state
        .store
        .find_all()
        .await?
        .into_iter()
        .filter(|event| event.is_on(today))
        .map(EventResponse::from)
        .collect();

    json_response(200, &events)
}

async fn add_event(state: &AppState, body: &Body) -> shared::Result<Response<Body>> {
    let new_event = parse_new_event(body)?;
    let created = state.store.insert(new_event).await?;

    info!("Added event {} on {}", created.id, created.date);

    json_response(
        200,
        &EventAddedResponse {
            message: EVENT_ADDED,
            event: created.event,
            date: created.date.format(DATE_FORMAT).to_string(),
        },
    )
}

async fn events_in_range(
    state: &AppState,
    start_time: Option<&str>,
    end_time: Option<&str>,
) -> shared::Result<Response<Body>> {
    let range = DateRange::from_bounds(start_time, end_time)?;

    let events: Vec<EventResponse> = state
        .store
        .find_all()
        .await?
        .into_iter()
        .filter(|event| range.contains(event.date))
        .map(EventResponse::from)
        .collect();

    if events.is_empty() {
        return empty_response(204);
    }
    json_response(200, &events)
}

async fn get_event(state: &AppState, id: i32) -> shared::Result<Response<Body>> {
    let event = find_event(state, id).await?;
    json_response(200, &EventResponse::from(event))
}

async fn delete_event(state: &AppState, id: i32) -> shared::Result<Response<Body>> {
    let event = find_event(state, id).await?;
    state.store.delete(&event).await?;

    info!("Deleted event {}", event.id);

    json_response(200, &EventResponse::from(event))
}

async fn route(
    state: &AppState,
    method: &str,
    path: &str,
    event: &Request,
) -> shared::Result<Response<Body>> {
    match (method, path) {
        ("GET", "/event/today") => today_events(state, Local::now().date_naive()).await,

        ("POST", "/event") => add_event(state, event.body()).await,

        ("GET", "/event") => {
            let params = event.query_string_parameters();
            events_in_range(state, params.first("start_time"), params.first("end_time")).await
        }

        ("GET", _) if path.starts_with("/event/") => {
            get_event(state, parse_event_id(path)?).await
        }

        ("DELETE", _) if path.starts_with("/event/") => {
            delete_event(state, parse_event_id(path)?).await
        }

        _ => message_response(404, "Not found"),
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let method = event.method().as_str();
    let raw_path = event.uri().path();
    // Strip /api stage prefix if present (API Gateway REST API includes stage in path)
    let path = raw_path.strip_prefix("/api").unwrap_or(raw_path);

    info!("Events request: {} {}", method, path);

    match route(&state, method, path, &event).await {
        Ok(response) => Ok(response),
        Err(e) => {
            if e.status_code() >= 500 {
                error!("Events request {} {} failed: {}", method, path, e);
            } else {
                warn!("Events request {} {} rejected: {}", method, path, e);
            }
            Ok(error_response(&e)?)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { handler(state, event).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::MemoryEventStore;
    use std::collections::HashMap;

    fn state() -> Arc<AppState> {
        Arc::new(AppState {
            store: Arc::new(MemoryEventStore::new()),
        })
    }

    fn request(method: &str, uri: &str, body: &str) -> Request {
        let body = if body.is_empty() {
            Body::Empty
        } else {
            Body::from(body.to_string())
        };
        lambda_http::http::Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap()
    }

    fn range_request(start_time: Option<&str>, end_time: Option<&str>) -> Request {
        let mut params = HashMap::new();
        if let Some(start) = start_time {
            params.insert("start_time".to_string(), start.to_string());
        }
        if let Some(end) = end_time {
            params.insert("end_time".to_string(), end.to_string());
        }
        request("GET", "/event", "").with_query_string_parameters(params)
    }

    async fn send(state: &Arc<AppState>, request: Request) -> Response<Body> {
        handler(Arc::clone(state), request).await.unwrap()
    }

    fn body_bytes(response: &Response<Body>) -> &[u8] {
        response.body().as_ref()
    }

    fn body_json(response: &Response<Body>) -> serde_json::Value {
        serde_json::from_slice(body_bytes(response)).unwrap()
    }

    async fn add(state: &Arc<AppState>, label: &str, date: &str) -> i32 {
        let body = serde_json::json!({"event": label, "date": date}).to_string();
        let response = send(state, request("POST", "/event", &body)).await;
        assert_eq!(response.status(), 200);

        state
            .store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|event| event.id)
            .max()
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_event() {
        let state = state();
        let response = send(
            &state,
            request("POST", "/event", r#"{"event":"Meeting","date":"2024-05-01"}"#),
        )
        .await;

        assert_eq!(response.status(), 200);
        assert_eq!(
            body_json(&response),
            serde_json::json!({
                "message": "The event has been added!",
                "event": "Meeting",
                "date": "2024-05-01"
            })
        );

        let stored = state.store.find_all().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].event, "Meeting");
    }

    #[tokio::test]
    async fn test_add_event_rejects_malformed_payloads() {
        let state = state();
        for body in [
            r#"{"event":"","date":"2024-05-01"}"#,
            r#"{"event":"   ","date":"2024-05-01"}"#,
            r#"{"event":"X","date":"not-a-date"}"#,
            r#"{"event":"X","date":""}"#,
            r#"{"event":"X","date":"2024-02-30"}"#,
            r#"{"event":"X"}"#,
            r#"{"date":"2024-05-01"}"#,
            r#"{"event":null,"date":"2024-05-01"}"#,
            r#"{"event":42,"date":"2024-05-01"}"#,
            r#"{"event":"X","date":"2024-05-01","extra":1}"#,
            r#"{"event":"X","when":"2024-05-01"}"#,
            r#"["X","2024-05-01"]"#,
            "not json",
            "",
        ] {
            let response = send(&state, request("POST", "/event", body)).await;
            assert_eq!(response.status(), 400, "accepted {:?}", body);
            assert!(body_bytes(&response).is_empty());
        }

        assert!(state.store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_event() {
        let state = state();
        let id = add(&state, "Meeting", "2024-05-01").await;

        let first = send(&state, request("GET", &format!("/event/{}", id), "")).await;
        assert_eq!(first.status(), 200);
        assert_eq!(
            body_json(&first),
            serde_json::json!({"id": id, "event": "Meeting", "date": "2024-05-01"})
        );

        let second = send(&state, request("GET", &format!("/event/{}", id), "")).await;
        assert_eq!(body_bytes(&first), body_bytes(&second));
    }

    #[tokio::test]
    async fn test_unknown_event_is_not_found() {
        let state = state();
        for method in ["GET", "DELETE"] {
            let response = send(&state, request(method, "/event/999", "")).await;
            assert_eq!(response.status(), 404);
            assert_eq!(
                body_json(&response),
                serde_json::json!({"message": "The event doesn't exist!"})
            );
        }
    }

    #[tokio::test]
    async fn test_delete_event() {
        let state = state();
        let id = add(&state, "Dentist", "2024-05-02").await;

        let deleted = send(&state, request("DELETE", &format!("/event/{}", id), "")).await;
        assert_eq!(deleted.status(), 200);
        assert_eq!(
            body_json(&deleted),
            serde_json::json!({"id": id, "event": "Dentist", "date": "2024-05-02"})
        );

        let missing = send(&state, request("GET", &format!("/event/{}", id), "")).await;
        assert_eq!(missing.status(), 404);

        let next_id = add(&state, "Dentist", "2024-05-02").await;
        assert!(next_id > id);
    }

    #[tokio::test]
    async fn test_invalid_event_id() {
        let state = state();
        let response = send(&state, request("GET", "/event/abc", "")).await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_today_events() {
        let state = state();
        let today = Local::now().date_naive();
        let yesterday = today.pred_opt().unwrap();
        add(&state, "Standup", &today.format(DATE_FORMAT).to_string()).await;
        add(&state, "Retro", &yesterday.format(DATE_FORMAT).to_string()).await;

        let response = send(&state, request("GET", "/event/today", "")).await;
        assert_eq!(response.status(), 200);

        let body = body_json(&response);
        let events = body.as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "Standup");
    }

    #[tokio::test]
    async fn test_today_events_empty_is_ok() {
        let state = state();
        let response = send(&state, request("GET", "/event/today", "")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(body_json(&response), serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_events_in_range() {
        let state = state();
        add(&state, "May", "2024-05-01").await;
        add(&state, "June", "2024-06-01").await;

        let response = send(&state, range_request(Some("2024-05-15"), Some("2024-06-15"))).await;
        assert_eq!(response.status(), 200);

        let body = body_json(&response);
        let events = body.as_array().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "June");
        assert_eq!(events[0]["date"], "2024-06-01");
    }

    #[tokio::test]
    async fn test_events_in_range_bounds() {
        let state = state();
        add(&state, "May", "2024-05-01").await;
        add(&state, "June", "2024-06-01").await;

        let inclusive = send(&state, range_request(Some("2024-05-01"), Some("2024-06-01"))).await;
        assert_eq!(body_json(&inclusive).as_array().unwrap().len(), 2);

        let open_start = send(&state, range_request(None, Some("2024-05-31"))).await;
        assert_eq!(body_json(&open_start)[0]["event"], "May");

        let open_end = send(&state, range_request(Some("2024-05-02"), None)).await;
        assert_eq!(body_json(&open_end)[0]["event"], "June");

        let everything = send(&state, range_request(None, None)).await;
        assert_eq!(body_json(&everything).as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_events_in_range_no_match() {
        let state = state();
        add(&state, "May", "2024-05-01").await;

        let response = send(&state, range_request(Some("2025-01-01"), Some("2025-12-31"))).await;
        assert_eq!(response.status(), 204);
        assert!(body_bytes(&response).is_empty());
    }

    #[tokio::test]
    async fn test_events_in_range_bad_date() {
        let state = state();
        add(&state, "May", "2024-05-01").await;

        let response = send(&state, range_request(Some("yesterday"), None)).await;
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn test_stage_prefix_and_unknown_route() {
        let state = state();
        let id = add(&state, "Meeting", "2024-05-01").await;

        let prefixed = send(&state, request("GET", &format!("/api/event/{}", id), "")).await;
        assert_eq!(prefixed.status(), 200);

        let unknown = send(&state, request("PUT", "/event/1", "")).await;
        assert_eq!(unknown.status(), 404);
        assert_eq!(body_json(&unknown)["message"], "Not found");
    }
}
