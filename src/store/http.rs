use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header, Client, Response, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::EventStore;
use crate::error::StoreError;
use crate::models::{Event, EventId};

const USER_AGENT: &str = "HorizonConnect/0.1";

/// Event store reached over the JSON API (`/events`, `/events/{id}`).
pub struct HttpEventStore {
    client: Client,
    base_url: String,
}

impl HttpEventStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| StoreError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn events_url(&self) -> String {
        format!("{}/events", self.base_url)
    }

    fn event_url(&self, id: &EventId) -> String {
        format!("{}/events/{}", self.base_url, id)
    }

    /// Reads one record together with the `ETag` of that same response.
    async fn fetch_event(&self, id: &EventId) -> Result<(Event, Option<String>), StoreError> {
        let url = self.event_url(id);
        debug!(%url, "fetching event");
        let response = self
            .client
            .get(&url)
            .query(&[("ts", Utc::now().timestamp_millis())])
            .send()
            .await
            .map_err(|err| StoreError::Http(err.to_string()))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.clone()));
        }
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = success_body(response).await?;
        Ok((parse_event(id, &body)?, etag))
    }

    async fn patch_spots(
        &self,
        id: &EventId,
        spots: u32,
        if_match: Option<&str>,
    ) -> Result<Response, StoreError> {
        let mut request = self
            .client
            .patch(self.event_url(id))
            .json(&json!({ "spots": spots }));
        if let Some(tag) = if_match {
            request = request.header(header::IF_MATCH, tag);
        }
        debug!(%id, spots, conditional = if_match.is_some(), "patching spots");
        request
            .send()
            .await
            .map_err(|err| StoreError::Http(err.to_string()))
    }
}

#[async_trait]
impl EventStore for HttpEventStore {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let url = self.events_url();
        debug!(%url, "fetching events");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| StoreError::Http(err.to_string()))?;
        let body = success_body(response).await?;
        serde_json::from_str(&body).map_err(|err| StoreError::Parse(err.to_string()))
    }

    async fn get_event(&self, id: &EventId) -> Result<Event, StoreError> {
        self.fetch_event(id).await.map(|(event, _)| event)
    }

    async fn update_spots(&self, id: &EventId, spots: u32) -> Result<(), StoreError> {
        let response = self.patch_spots(id, spots, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.clone()));
        }
        success_body(response).await.map(|_| ())
    }

    async fn decrement_spots(&self, id: &EventId, expected: u32) -> Result<(), StoreError> {
        if expected == 0 {
            return Err(StoreError::Exhausted(id.clone()));
        }

        // The validator must come from a read that saw `expected`, never
        // from an earlier read of the same record.
        let (current, etag) = self.fetch_event(id).await?;
        if current.spots == 0 {
            return Err(StoreError::Exhausted(id.clone()));
        }
        if current.spots != expected {
            return Err(StoreError::Conflict {
                id: id.clone(),
                expected,
            });
        }

        let response = self.patch_spots(id, expected - 1, etag.as_deref()).await?;
        match response.status() {
            StatusCode::PRECONDITION_FAILED => Err(StoreError::Conflict {
                id: id.clone(),
                expected,
            }),
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(id.clone())),
            _ => success_body(response).await.map(|_| ()),
        }
    }
}

async fn success_body(response: Response) -> Result<String, StoreError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| StoreError::Http(err.to_string()))?;
    if !status.is_success() {
        return Err(StoreError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

/// Some backends answer a missing record with `200` and an empty body,
/// `null` or `{}`; all of those mean not found.
fn parse_event(id: &EventId, body: &str) -> Result<Event, StoreError> {
    if body.trim().is_empty() {
        return Err(StoreError::NotFound(id.clone()));
    }
    let value: Value =
        serde_json::from_str(body).map_err(|err| StoreError::Parse(err.to_string()))?;
    let has_id = value.get("id").is_some_and(|raw| !raw.is_null());
    if !has_id {
        return Err(StoreError::NotFound(id.clone()));
    }
    let event: Event =
        serde_json::from_value(value).map_err(|err| StoreError::Parse(err.to_string()))?;
    if event.id.is_empty() {
        return Err(StoreError::NotFound(id.clone()));
    }
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let store = HttpEventStore::new("http://10.88.94.1:3001/ ", Duration::from_secs(1)).unwrap();
        assert_eq!(store.base_url(), "http://10.88.94.1:3001");
        assert_eq!(
            store.event_url(&EventId::from(4_i64)),
            "http://10.88.94.1:3001/events/4"
        );
    }

    #[test]
    fn empty_shapes_are_not_found() {
        let id = EventId::from("4");
        for body in ["", "null", "{}", r#"{"id": null}"#, r#"{"id": ""}"#] {
            assert!(
                matches!(parse_event(&id, body), Err(StoreError::NotFound(_))),
                "body {body:?}"
            );
        }
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let id = EventId::from("4");
        assert!(matches!(
            parse_event(&id, "<html>"),
            Err(StoreError::Parse(_))
        ));
    }
}
