//! REST collection client
//!
//! Talks to a class endpoint of a hosted backend:
//!
//! - `GET  {base}/1.1/classes/{class}?order=-createdAt&limit=N`
//! - `POST {base}/1.1/classes/{class}`
//! - `DELETE {base}/1.1/classes/{class}/{id}`
//!
//! The live feed is produced by polling the newest window and diffing
//! consecutive snapshots.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::mpsc;

use super::{RemoteCollection, Subscription};
use crate::error::{CoreError, CoreResult};
use crate::models::{NewRecord, Record, RecordId, RecordPatch, NOTE_PLACEHOLDER};
use crate::types::SyncEvent;

/// Connection settings for [`RestCollection`]
#[derive(Debug, Clone)]
pub struct RestSettings {
    pub base_url: String,
    pub collection: String,
    pub app_id: String,
    pub app_key: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    /// Size of the window polled for changes
    pub window: usize,
}

#[derive(Debug, Deserialize)]
struct RemoteObject {
    #[serde(rename = "objectId")]
    object_id: String,
    amount: Decimal,
    #[serde(default)]
    note: Option<String>,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

impl From<RemoteObject> for Record {
    fn from(object: RemoteObject) -> Self {
        Record::new(
            object.object_id,
            object.amount,
            object.note.unwrap_or_else(|| NOTE_PLACEHOLDER.to_string()),
            object.created_at,
        )
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    results: Vec<RemoteObject>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "objectId")]
    object_id: String,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RestCollection {
    client: reqwest::Client,
    settings: RestSettings,
}

impl RestCollection {
    pub fn new(settings: RestSettings) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { client, settings })
    }

    fn class_url(&self) -> String {
        format!(
            "{}/1.1/classes/{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.collection
        )
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("X-LC-Id", &self.settings.app_id)
            .header("X-LC-Key", &self.settings.app_key)
    }

    async fn fetch(&self, limit: usize) -> CoreResult<Vec<Record>> {
        let limit = limit.to_string();
        let response = self
            .authorized(self.client.get(self.class_url()))
            .query(&[("order", "-createdAt"), ("limit", limit.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: QueryResponse = response.json().await?;
        Ok(body.results.into_iter().map(Record::from).collect())
    }
}

#[async_trait]
impl RemoteCollection for RestCollection {
    async fn query(&self, limit: usize) -> CoreResult<Vec<Record>> {
        self.fetch(limit).await
    }

    /// Polls from `baseline` on, so changes made after the initial query are
    /// still diffed
    async fn subscribe(&self, baseline: &[Record]) -> CoreResult<Subscription> {
        let window = self.settings.window;
        let mut previous = baseline.to_vec();

        let (tx, rx) = mpsc::unbounded_channel();
        let this = self.clone();
        let producer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(this.settings.poll_interval);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                let current = match this.fetch(window).await {
                    Ok(records) => records,
                    Err(e) => {
                        log::warn!("Polling {} failed: {}", this.settings.collection, e);
                        continue;
                    }
                };
                for event in diff_snapshots(&previous, &current, window) {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
                previous = current;
            }
        });

        Ok(Subscription::with_producer(rx, producer))
    }

    async fn save(&self, record: NewRecord) -> CoreResult<Record> {
        let amount = record.amount.to_f64().ok_or_else(|| CoreError::ValidationError {
            message: format!("amount {} cannot be sent as a number", record.amount),
        })?;

        let response = self
            .authorized(self.client.post(self.class_url()))
            .json(&serde_json::json!({ "amount": amount, "note": record.note }))
            .send()
            .await?
            .error_for_status()?;

        let created: CreateResponse = response.json().await?;
        Ok(record.into_record(created.object_id, created.created_at))
    }

    async fn destroy(&self, id: &RecordId) -> CoreResult<()> {
        let response = self
            .authorized(self.client.delete(format!("{}/{}", self.class_url(), id)))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CoreError::RecordNotFound { id: id.to_string() });
        }
        response.error_for_status()?;
        Ok(())
    }
}

/// Events turning the `previous` window into the `current` one
///
/// Both snapshots are newest first. Creates are emitted oldest first so that
/// prepending them reproduces the backend order. When the window is full, a
/// missing record older than everything in `current` has only scrolled out of
/// the window and is not reported as deleted.
pub(crate) fn diff_snapshots(previous: &[Record], current: &[Record], window: usize) -> Vec<SyncEvent> {
    let before: HashMap<&RecordId, &Record> = previous.iter().map(|r| (&r.id, r)).collect();
    let after: HashMap<&RecordId, &Record> = current.iter().map(|r| (&r.id, r)).collect();
    let oldest_kept = current.iter().map(|r| r.timestamp).min();
    let window_full = current.len() >= window;

    let mut events = Vec::new();

    for record in previous {
        if after.contains_key(&record.id) {
            continue;
        }
        let scrolled_out = window_full && oldest_kept.map_or(false, |oldest| record.timestamp < oldest);
        if !scrolled_out {
            events.push(SyncEvent::Delete { id: record.id.clone() });
        }
    }

    for record in current.iter().rev() {
        match before.get(&record.id) {
            None => events.push(SyncEvent::Create(record.clone())),
            Some(old) if *old != record => events.push(SyncEvent::Update(RecordPatch::from(record.clone()))),
            Some(_) => {}
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn record(id: &str, amount: i64, millis: i64) -> Record {
        Record::new(id, Decimal::from(amount), "x", Utc.timestamp_millis_opt(millis).unwrap())
    }

    fn settings(base_url: &str) -> RestSettings {
        RestSettings {
            base_url: base_url.to_string(),
            collection: "Transaction".to_string(),
            app_id: "id".to_string(),
            app_key: "key".to_string(),
            poll_interval: Duration::from_millis(20),
            request_timeout: Duration::from_secs(5),
            window: 100,
        }
    }

    fn local_collection(base_url: &str) -> RestCollection {
        RestCollection {
            client: reqwest::Client::builder().no_proxy().build().unwrap(),
            settings: settings(base_url),
        }
    }

    /// Answer every request on a local port with the same status and body
    async fn serve(status: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let body = body.clone();
                tokio::spawn(async move {
                    let mut request = Vec::new();
                    let mut buf = [0u8; 1024];
                    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut buf).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_diff_from_initial_query_sees_changes_made_before_polling() {
        // Initial query returned [b, a]; c was created and b deleted before the first poll
        let queried = vec![record("b", 2, 2), record("a", 1, 1)];
        let first_poll = vec![record("c", 3, 3), record("a", 1, 1)];

        let events = diff_snapshots(&queried, &first_poll, 100);
        assert_eq!(
            events,
            vec![SyncEvent::Delete { id: "b".into() }, SyncEvent::Create(record("c", 3, 3))]
        );
    }

    #[tokio::test]
    async fn test_subscription_polls_from_baseline() {
        let created = |minute: u32| format!("2024-03-01T08:{:02}:00.000Z", minute);
        let body = serde_json::json!({
            "results": [
                { "objectId": "b", "amount": 2, "note": "x", "createdAt": created(1) },
                { "objectId": "a", "amount": 1, "note": "x", "createdAt": created(0) },
            ]
        })
        .to_string();
        let base_url = serve("200 OK", body).await;

        let baseline_time = DateTime::parse_from_rfc3339(&created(0)).unwrap().with_timezone(&Utc);
        let baseline = vec![Record::new("a", Decimal::from(1), "x", baseline_time)];

        let collection = local_collection(&base_url);
        let mut subscription = collection.subscribe(&baseline).await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), subscription.next())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(event.id().as_str(), "b");
        assert!(matches!(event, SyncEvent::Create(_)));
        subscription.close();
    }

    #[tokio::test]
    async fn test_destroy_missing_object_is_not_found() {
        let base_url = serve("404 Not Found", r#"{"code":101,"error":"Object not found."}"#.to_string()).await;
        let collection = local_collection(&base_url);

        let err = collection.destroy(&"gone".into()).await.unwrap_err();
        assert!(matches!(err, CoreError::RecordNotFound { ref id } if id == "gone"));
    }

    #[tokio::test]
    async fn test_destroy_server_failure_is_remote_error() {
        let base_url = serve("500 Internal Server Error", "{}".to_string()).await;
        let collection = local_collection(&base_url);

        let err = collection.destroy(&"a".into()).await.unwrap_err();
        assert!(matches!(err, CoreError::RemoteError { .. }));
    }

    #[test]
    fn test_diff_detects_create_update_delete() {
        let previous = vec![record("c", 3, 3), record("b", 2, 2), record("a", 1, 1)];
        let current = vec![record("d", 4, 4), record("c", 30, 3), record("a", 1, 1)];

        let events = diff_snapshots(&previous, &current, 100);
        assert_eq!(
            events,
            vec![
                SyncEvent::Delete { id: "b".into() },
                SyncEvent::Update(RecordPatch::from(record("c", 30, 3))),
                SyncEvent::Create(record("d", 4, 4)),
            ]
        );
    }

    #[test]
    fn test_diff_creates_oldest_first() {
        let current = vec![record("b", 2, 2), record("a", 1, 1)];
        let events = diff_snapshots(&[], &current, 100);
        let ids: Vec<&str> = events.iter().map(|e| e.id().as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_diff_ignores_records_scrolled_out_of_full_window() {
        let previous = vec![record("b", 2, 2), record("a", 1, 1)];
        let current = vec![record("c", 3, 3), record("b", 2, 2)];

        let events = diff_snapshots(&previous, &current, 2);
        assert_eq!(events, vec![SyncEvent::Create(record("c", 3, 3))]);
    }

    #[test]
    fn test_diff_identical_snapshots_is_empty() {
        let snapshot = vec![record("a", 1, 1)];
        assert!(diff_snapshots(&snapshot, &snapshot, 10).is_empty());
    }

    #[test]
    fn test_remote_object_defaults_note() {
        let object: RemoteObject = serde_json::from_value(serde_json::json!({
            "objectId": "5f1",
            "amount": 12.5,
            "createdAt": "2024-03-01T08:00:00.000Z"
        }))
        .unwrap();

        let record = Record::from(object);
        assert_eq!(record.id.as_str(), "5f1");
        assert_eq!(record.note, NOTE_PLACEHOLDER);
        assert_eq!(record.amount, Decimal::new(125, 1));
    }

    #[test]
    fn test_class_url_trims_trailing_slash() {
        let collection = RestCollection::new(settings("https://api.example.com/")).unwrap();

        assert_eq!(collection.class_url(), "https://api.example.com/1.1/classes/Transaction");
    }
}
