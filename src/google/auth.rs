//! OAuth login against Google: reuse the cached session, refresh it, or run
//! the browser consent flow on first use.

use std::path::PathBuf;

use anyhow::{Context, Result};
use gcalert_core::{Authenticator, GcalertError, GcalertResult};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, info};
use url::Url;

use super::api::GoogleCalendar;
use super::secrets::{Credentials, SecretsFile, Session};
use super::types::TokenResponse;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Alarms only need to read events.
pub const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

const REDIRECT_PORT: u16 = 8085;

pub fn redirect_uri() -> String {
    format!("http://localhost:{}/callback", REDIRECT_PORT)
}

fn redirect_address() -> String {
    format!("127.0.0.1:{}", REDIRECT_PORT)
}

pub struct GoogleAuth {
    secrets_path: PathBuf,
    http: reqwest::Client,
}

impl GoogleAuth {
    pub fn new(secrets_path: PathBuf) -> Self {
        GoogleAuth {
            secrets_path,
            http: reqwest::Client::new(),
        }
    }

    async fn login(&self) -> Result<GoogleCalendar> {
        let mut secrets = SecretsFile::load(&self.secrets_path)?;
        let credentials = secrets.credentials.clone();

        let session = match secrets.session.take() {
            Some(session) if !session.is_expired() => {
                debug!("Reusing cached Google session");
                session
            }
            Some(session) => {
                debug!("Cached Google session expired, refreshing");
                let refreshed = refresh_session(&self.http, &credentials, &session).await?;
                secrets.session = Some(refreshed.clone());
                secrets.save(&self.secrets_path)?;
                refreshed
            }
            None => {
                let session = consent(&self.http, &credentials).await?;
                secrets.session = Some(session.clone());
                secrets.save(&self.secrets_path)?;
                info!("Saved Google credentials to {}", self.secrets_path.display());
                session
            }
        };

        Ok(GoogleCalendar::new(
            self.http.clone(),
            self.secrets_path.clone(),
            credentials,
            session,
        ))
    }
}

impl Authenticator for GoogleAuth {
    type Service = GoogleCalendar;

    async fn authenticate(&self) -> GcalertResult<GoogleCalendar> {
        self.login()
            .await
            .map_err(|e| GcalertError::Auth(format!("{e:#}")))
    }
}

/// Interactive first-run flow: send the user to Google's consent page and
/// catch the redirect on a local port.
async fn consent(http: &reqwest::Client, credentials: &Credentials) -> Result<Session> {
    let state = uuid::Uuid::new_v4().to_string();
    let redirect_uri = redirect_uri();

    let auth_url = Url::parse_with_params(
        AUTH_URL,
        &[
            ("client_id", credentials.client_id.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", state.as_str()),
        ],
    )
    .context("Failed to build consent URL")?;

    // Listen before handing out the URL so a fast redirect is not refused.
    let listener = TcpListener::bind(redirect_address())
        .await
        .context("Failed to bind OAuth callback listener")?;

    eprintln!("\nOpen this URL in your browser to authenticate:\n");
    eprintln!("{}\n", auth_url);

    // Try to open the browser automatically
    if open::that(auth_url.as_str()).is_err() {
        eprintln!("(Could not open browser automatically, please copy the URL above)");
    }

    let code = receive_code(listener, &state).await?;

    eprintln!("\nReceived authorization code, exchanging for tokens...");

    let response = http
        .post(TOKEN_URL)
        .form(&[
            ("code", code.as_str()),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .context("Failed to send token request to Google")?;

    let tokens = token_response(response).await?;
    let session = Session::from_token_response(tokens, None)?;

    eprintln!("Authentication successful!");

    Ok(session)
}

pub async fn refresh_session(
    http: &reqwest::Client,
    credentials: &Credentials,
    session: &Session,
) -> Result<Session> {
    let response = http
        .post(TOKEN_URL)
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("refresh_token", session.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ])
        .send()
        .await
        .context("Failed to send refresh request to Google")?;

    let tokens = token_response(response).await?;
    Session::from_token_response(tokens, Some(&session.refresh_token))
}

async fn token_response(response: reqwest::Response) -> Result<TokenResponse> {
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Google token endpoint returned {}: {}", status, error_text);
    }

    response
        .json()
        .await
        .context("Failed to parse token response from Google")
}

/// Serve the redirect listener until the browser comes back to `/callback`.
/// Other requests (favicon probes and the like) get a 404 and are skipped.
async fn receive_code(listener: TcpListener, expected_state: &str) -> Result<String> {
    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("Failed to accept OAuth callback")?;

        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .await
            .context("Failed to read OAuth callback request line")?;

        let outcome = match callback_query(&request_line) {
            Some(query) => parse_callback(&query, expected_state),
            None => {
                debug!("Ignoring request on callback port: {}", request_line.trim_end());
                let mut stream = reader.into_inner();
                stream.write_all(callback_reply(None).as_bytes()).await?;
                continue;
            }
        };

        let mut stream = reader.into_inner();
        stream
            .write_all(callback_reply(Some(&outcome)).as_bytes())
            .await
            .context("Failed to write OAuth callback response")?;
        stream.flush().await?;

        return outcome;
    }
}

/// The query string of a `GET /callback?...` request line, or `None` for any
/// other request.
fn callback_query(request_line: &str) -> Option<String> {
    let target = request_line.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://localhost{}", target)).ok()?;

    (url.path() == "/callback").then(|| url.query().unwrap_or_default().to_string())
}

/// Extract the authorization code, rejecting denials and foreign `state`s.
fn parse_callback(query: &str, expected_state: &str) -> Result<String> {
    let mut code = None;
    let mut state = None;

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "error" => anyhow::bail!("Google declined the authorization: {}", value),
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        anyhow::bail!("OAuth callback state mismatch");
    }

    code.ok_or_else(|| anyhow::anyhow!("No code in callback"))
}

fn callback_reply(outcome: Option<&Result<String>>) -> String {
    let (status, message) = match outcome {
        None => ("404 Not Found", "Nothing here.".to_string()),
        Some(Ok(_)) => (
            "200 OK",
            "gcalert can now read your calendars. This tab can be closed.".to_string(),
        ),
        Some(Err(e)) => ("400 Bad Request", format!("gcalert was not authorized: {}", e)),
    };

    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{message}",
        message.len()
    )
}
