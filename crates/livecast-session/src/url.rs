//! Push URL construction.
//!
//! The query is an ordered parameter list. Most values are fixed client
//! identity; `cursor` and `internal_ext` embed the current clock, and
//! `room_id` comes from session resolution. The `signature` parameter is
//! appended last, after signing.

use std::fmt::Write as _;

/// Keys the signature digest covers, in order.
pub const SIGNED_KEYS: [&str; 13] = [
    "live_id",
    "aid",
    "version_code",
    "webcast_sdk_version",
    "room_id",
    "sub_room_id",
    "sub_channel_id",
    "did_rule",
    "user_unique_id",
    "device_platform",
    "device_type",
    "ac",
    "identity",
];

const SDK_VERSION: &str = "1.0.14-beta.0";
const WRDS_VERSION: &str = "7392094459690748497";
const BROWSER_VERSION: &str = "5.0%20(Windows%20NT%2010.0;%20Win64;%20x64)%20AppleWebKit/537.36%20(KHTML,%20like%20Gecko)%20Chrome/126.0.0.0%20Safari/537.36";

/// Query snapshot for one connection attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushUrl {
    base: String,
    params: Vec<(String, String)>,
}

impl PushUrl {
    /// Build the query for `room_id` using `now_ms` as the client clock.
    pub fn new(base: &str, room_id: &str, device_id: &str, now_ms: i64) -> Self {
        let first_req_ms = now_ms - 92;
        let cursor = format!("d-1_u-1_fh-7392091211001140287_t-{now_ms}_r-1");
        let internal_ext = format!(
            "internal_src:dim|wss_push_room_id:{room_id}|wss_push_did:{device_id}\
             |first_req_ms:{first_req_ms}|fetch_time:{now_ms}|seq:1\
             |wss_info:0-{now_ms}-0-0|wrds_v:{WRDS_VERSION}"
        );

        let params: Vec<(&str, String)> = vec![
            ("app_name", "douyin_web".into()),
            ("version_code", "180800".into()),
            ("webcast_sdk_version", SDK_VERSION.into()),
            ("update_version_code", SDK_VERSION.into()),
            ("compress", "gzip".into()),
            ("device_platform", "web".into()),
            ("cookie_enabled", "true".into()),
            ("screen_width", "1536".into()),
            ("screen_height", "864".into()),
            ("browser_language", "zh-CN".into()),
            ("browser_platform", "Win32".into()),
            ("browser_name", "Mozilla".into()),
            ("browser_version", BROWSER_VERSION.into()),
            ("browser_online", "true".into()),
            ("tz_name", "Asia/Shanghai".into()),
            ("cursor", cursor),
            ("internal_ext", internal_ext),
            ("host", "https://live.douyin.com".into()),
            ("aid", "6383".into()),
            ("live_id", "1".into()),
            ("did_rule", "3".into()),
            ("endpoint", "live_pc".into()),
            ("support_wrds", "1".into()),
            ("user_unique_id", device_id.into()),
            ("im_path", "/webcast/im/fetch/".into()),
            ("identity", "audience".into()),
            ("need_persist_msg_count", "15".into()),
            ("insert_task_id", String::new()),
            ("live_reason", String::new()),
            ("room_id", room_id.into()),
            ("heartbeatDuration", "0".into()),
        ];

        Self {
            base: base.to_string(),
            params: params
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    /// Build the query stamped with the current wall clock.
    pub fn now(base: &str, room_id: &str, device_id: &str) -> Self {
        Self::new(base, room_id, device_id, chrono::Utc::now().timestamp_millis())
    }

    /// Parameters in query order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Value of `key`, if present.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `k=v` pairs joined with `&`, without the signature.
    pub fn query(&self) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                out.push('&');
            }
            let _ = write!(out, "{k}={v}");
        }
        out
    }

    /// The string the signature is computed over: every [`SIGNED_KEYS`]
    /// entry as `k=v`, comma-joined. Absent keys contribute `k=`.
    pub fn signature_input(&self) -> String {
        SIGNED_KEYS
            .iter()
            .map(|k| format!("{k}={}", self.param(k).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Lowercase hex MD5 of [`Self::signature_input`].
    pub fn signature_digest(&self) -> String {
        format!("{:x}", md5::compute(self.signature_input().as_bytes()))
    }

    /// Full URL with `signature` appended.
    pub fn signed(&self, signature: &str) -> String {
        format!("{}?{}&signature={signature}", self.base, self.query())
    }
}
