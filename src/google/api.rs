//! Google Calendar API v3 over reqwest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use gcalert_core::{CalendarService, GcalertError, GcalertResult, RawEvent};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::auth::refresh_session;
use super::secrets::{Credentials, SecretsFile, Session};
use super::types::{CalendarList, EventList};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
const PAGE_SIZE: &str = "250";

/// A logged-in Google Calendar client. Refreshes its access token as it
/// expires and writes the new session back to the secrets file.
pub struct GoogleCalendar {
    http: reqwest::Client,
    secrets_path: PathBuf,
    credentials: Credentials,
    session: Mutex<Session>,
}

impl GoogleCalendar {
    pub fn new(
        http: reqwest::Client,
        secrets_path: PathBuf,
        credentials: Credentials,
        session: Session,
    ) -> Self {
        GoogleCalendar {
            http,
            secrets_path,
            credentials,
            session: Mutex::new(session),
        }
    }

    async fn access_token(&self) -> Result<String> {
        let mut session = self.session.lock().await;

        if session.is_expired() {
            debug!("Access token expired, refreshing");
            let refreshed = refresh_session(&self.http, &self.credentials, &session).await?;

            SecretsFile {
                credentials: self.credentials.clone(),
                session: Some(refreshed.clone()),
            }
            .save(&self.secrets_path)?;

            *session = refreshed;
        }

        Ok(session.access_token.clone())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let token = self.access_token().await?;

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url.path()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Google API returned {} for {}: {}", status, url.path(), error_text);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url.path()))
    }

    async fn calendar_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = Url::parse(API_BASE)?.join("users/me/calendarList")?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let page: CalendarList = self.get_json(url).await?;
            for entry in page.items {
                debug!("Found calendar {} ({})", entry.summary, entry.id);
                ids.push(entry.id);
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(ids)
    }

    async fn events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<RawEvent>> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let url = events_url(calendar_id, time_min, time_max, page_token.as_deref())?;
            let page: EventList = self.get_json(url).await?;

            events.extend(page.items.into_iter().filter_map(|e| e.into_raw_event()));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(events)
    }
}

impl CalendarService for GoogleCalendar {
    async fn list_calendars(&self) -> GcalertResult<Vec<String>> {
        self.calendar_ids()
            .await
            .map_err(|e| GcalertError::Fetch(format!("{e:#}")))
    }

    async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> GcalertResult<Vec<RawEvent>> {
        self.events(calendar_id, time_min, time_max)
            .await
            .map_err(|e| GcalertError::Fetch(format!("{e:#}")))
    }
}

/// `calendars/{id}/events` with recurring events expanded into instances.
/// The calendar id is percent-encoded as a path segment (ids contain `@` and
/// sometimes `#`).
fn events_url(
    calendar_id: &str,
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    page_token: Option<&str>,
) -> Result<Url> {
    let mut url = Url::parse(API_BASE)?;

    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("API base URL cannot have path segments"))?
        .pop_if_empty()
        .extend(["calendars", calendar_id, "events"]);

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("timeMin", &time_min.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("timeMax", &time_max.to_rfc3339_opts(SecondsFormat::Secs, true))
            .append_pair("singleEvents", "true")
            .append_pair("maxResults", PAGE_SIZE);
        if let Some(token) = page_token {
            query.append_pair("pageToken", token);
        }
    }

    Ok(url)
}
