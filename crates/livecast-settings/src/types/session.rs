//! Session resolution and signer settings.

use serde::{Deserialize, Serialize};

/// Desktop Chrome user agent used for every HTTP and WebSocket request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Where sessions are resolved and which client identity is presented.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionSettings {
    /// Live landing page. The room page is `live_url + live_id`.
    pub live_url: String,
    /// Push service endpoint, without query string.
    pub push_url: String,
    /// User agent header.
    pub user_agent: String,
    /// Device id sent as `user_unique_id` and `wss_push_did`.
    pub device_id: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            live_url: "https://live.douyin.com/".to_string(),
            push_url: "wss://webcast5-ws-web-hl.douyin.com/webcast/im/push/v2/".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            device_id: "7319483754668557238".to_string(),
        }
    }
}

/// External signer program.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignerSettings {
    /// Program and leading arguments. The digest is appended as the last
    /// argument and the signature is read from stdout. `None` disables signing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Upper bound on one signer invocation.
    pub timeout_ms: Option<u64>,
}
