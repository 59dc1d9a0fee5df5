//! Session cookie and room id resolution.

use std::sync::LazyLock;

use async_trait::async_trait;
use livecast_core::LiveId;
use livecast_settings::SessionSettings;
use rand::Rng;
use regex::Regex;
use reqwest::header::{COOKIE, SET_COOKIE, USER_AGENT};
use tracing::{debug, instrument};

use crate::error::{Result, SessionError};

/// Fixed anti-bot nonce sent with the room page request.
pub const AC_NONCE: &str = "0123407cc00a9e438deb4";

const MS_TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789=_";

// The room id sits inside a JSON string embedded in a script tag, so its
// quotes are backslash-escaped in the page source.
static ROOM_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"roomId\\":\\"(\d+)\\""#).expect("valid regex"));

/// Looks up what a connection needs before it can be opened.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Session cookie (`ttwid`) from the landing page.
    async fn resolve_cookie(&self) -> Result<String>;

    /// Numeric room id behind a live page.
    async fn resolve_room_id(&self, live_id: &LiveId, cookie: &str) -> Result<String>;
}

/// [`SessionResolver`] backed by plain HTTP GETs.
pub struct HttpSessionResolver {
    client: reqwest::Client,
    live_url: String,
    user_agent: String,
}

impl HttpSessionResolver {
    /// Resolver for the configured landing page.
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            live_url: settings.live_url.clone(),
            user_agent: settings.user_agent.clone(),
        }
    }

    async fn get(&self, url: &str, cookie: Option<String>) -> Result<reqwest::Response> {
        let mut request = self.client.get(url).header(USER_AGENT, &self.user_agent);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl SessionResolver for HttpSessionResolver {
    #[instrument(skip_all, fields(url = %self.live_url))]
    async fn resolve_cookie(&self) -> Result<String> {
        let resp = self.get(&self.live_url, None).await?;
        let ttwid = ttwid_from_set_cookie(
            resp.headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        )
        .ok_or(SessionError::MissingCookie)?;
        debug!("session cookie resolved");
        Ok(ttwid)
    }

    #[instrument(skip_all, fields(live_id = %live_id))]
    async fn resolve_room_id(&self, live_id: &LiveId, cookie: &str) -> Result<String> {
        let url = format!("{}{}", self.live_url, live_id);
        let cookie = format!(
            "ttwid={cookie}&msToken={}; __ac_nonce={AC_NONCE}",
            generate_ms_token(107)
        );
        let body = self.get(&url, Some(cookie)).await?.text().await?;
        let room_id = extract_room_id(&body)
            .ok_or_else(|| SessionError::MissingRoomId(live_id.to_string()))?;
        debug!(room_id, "room id resolved");
        Ok(room_id.to_string())
    }
}

/// Random `msToken` cookie value drawn from `[A-Za-z0-9=_]`.
pub fn generate_ms_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(MS_TOKEN_ALPHABET[rng.random_range(0..MS_TOKEN_ALPHABET.len())]))
        .collect()
}

fn ttwid_from_set_cookie<'a>(values: impl Iterator<Item = &'a str>) -> Option<String> {
    values
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.trim().strip_prefix("ttwid="))
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn extract_room_id(body: &str) -> Option<&str> {
    ROOM_ID_PATTERN
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}
