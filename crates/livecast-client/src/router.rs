//! Message routing.
//!
//! Every routed method has exactly one handler arm in [`Router::handle`].
//! Handlers run inline on the receive task: they may log, update the viewer
//! display, or offer a [`RenderTask`] to the speech queue, and nothing else.

use std::sync::Arc;

use livecast_core::{RenderTask, SpeechFeature, SpeechToggles, ViewerDisplay};
use livecast_protocol::proto::User;
use livecast_protocol::{LiveEvent, MessageBatch, MessageKind, STREAM_ENDED_STATUS};
use livecast_settings::SpeechSettings;
use livecast_speech::{EnqueueOutcome, TaskQueue};
use rand::Rng;
use tracing::{debug, info, warn};

/// What the connection should do after a message or batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Keep reading.
    Continue,
    /// The broadcast is over. End the session without reconnecting.
    StreamEnded,
}

/// Voice index per announcement kind.
#[derive(Clone, Copy, Debug)]
struct Voices {
    chat: usize,
    gift: usize,
    follow: usize,
    welcome: Option<usize>,
    count: usize,
}

impl Voices {
    fn from_settings(settings: &SpeechSettings) -> Self {
        Self {
            chat: settings.chat_voice,
            gift: settings.gift_voice,
            follow: settings.follow_voice,
            welcome: settings.welcome_voice,
            count: settings.voices.len(),
        }
    }

    fn welcome(&self) -> usize {
        match self.welcome {
            Some(index) => index,
            None if self.count > 1 => rand::rng().random_range(0..self.count),
            None => 0,
        }
    }
}

/// Turns room messages into display updates and speech tasks.
pub struct Router {
    toggles: Arc<SpeechToggles>,
    queue: TaskQueue,
    display: Arc<dyn ViewerDisplay>,
    voices: Voices,
}

impl Router {
    /// Router feeding `queue` and `display`, gated by `toggles`.
    pub fn new(
        toggles: Arc<SpeechToggles>,
        queue: TaskQueue,
        display: Arc<dyn ViewerDisplay>,
        speech: &SpeechSettings,
    ) -> Self {
        Self {
            toggles,
            queue,
            display,
            voices: Voices::from_settings(speech),
        }
    }

    /// Dispatch every message of `batch` in order.
    ///
    /// Stops early once a message reports the end of the stream.
    pub async fn dispatch_batch(&self, batch: &MessageBatch) -> Dispatch {
        for message in &batch.messages {
            if self.dispatch(&message.method, &message.payload).await == Dispatch::StreamEnded {
                return Dispatch::StreamEnded;
            }
        }
        Dispatch::Continue
    }

    /// Decode and handle one message.
    ///
    /// Unrouted methods are ignored. A payload that fails to decode is
    /// logged and dropped; it never affects the messages after it.
    pub async fn dispatch(&self, method: &str, payload: &[u8]) -> Dispatch {
        let Some(kind) = MessageKind::from_method(method) else {
            debug!(method, "ignoring unrouted message");
            return Dispatch::Continue;
        };
        match kind.decode(payload) {
            Ok(event) => self.handle(event).await,
            Err(e) => {
                warn!(method, error = %e, "dropping undecodable message");
                Dispatch::Continue
            }
        }
    }

    async fn handle(&self, event: LiveEvent) -> Dispatch {
        match event {
            LiveEvent::Chat(msg) => {
                let user = nick(msg.user.as_ref());
                info!(user, content = %msg.content, "chat");
                self.speak(
                    SpeechFeature::Chat,
                    format!("{user}说：{}。", msg.content),
                    self.voices.chat,
                )
                .await;
            }
            LiveEvent::Gift(msg) => {
                let user = nick(msg.user.as_ref());
                let gift = msg.gift.as_ref().map_or("", |g| g.name.as_str());
                info!(user, gift, combo = msg.combo_count, "gift");
                self.speak(
                    SpeechFeature::Gift,
                    format!("感谢 {user} 送出的 {gift}！"),
                    self.voices.gift,
                )
                .await;
            }
            LiveEvent::Like(msg) => {
                info!(user = nick(msg.user.as_ref()), count = msg.count, total = msg.total, "like");
            }
            LiveEvent::Member(msg) => {
                let user = nick(msg.user.as_ref());
                info!(user, members = msg.member_count, "viewer entered");
                self.speak(
                    SpeechFeature::Welcome,
                    format!("欢迎 {user} 进入直播间！"),
                    self.voices.welcome(),
                )
                .await;
            }
            LiveEvent::Social(msg) => {
                let user = nick(msg.user.as_ref());
                info!(user, "follow");
                self.speak(
                    SpeechFeature::Follow,
                    format!("感谢 {user} 关注主播！"),
                    self.voices.follow,
                )
                .await;
            }
            LiveEvent::RoomUserSeq(msg) => {
                debug!(total = msg.total, pv = %msg.total_pv_for_anchor, "viewer count");
                self.display.report_viewer_count(msg.total);
            }
            LiveEvent::Fansclub(msg) => {
                info!(user = nick(msg.user.as_ref()), content = %msg.content, "fan club");
            }
            LiveEvent::Control(msg) if msg.status == STREAM_ENDED_STATUS => {
                info!("broadcast ended");
                return Dispatch::StreamEnded;
            }
            LiveEvent::Control(msg) => debug!(status = msg.status, "control"),
            LiveEvent::EmojiChat(msg) => {
                info!(
                    user = nick(msg.user.as_ref()),
                    emoji = msg.emoji_id,
                    content = %msg.default_content,
                    "emoji chat"
                );
            }
            LiveEvent::Room(msg) => info!(content = %msg.content, "room notice"),
            LiveEvent::RoomStats(msg) => {
                info!(display = %msg.display_long, total = msg.total, "room stats");
            }
            LiveEvent::RoomRank(msg) => {
                let ranks = msg
                    .ranks
                    .iter()
                    .map(|r| nick(r.user.as_ref()))
                    .collect::<Vec<_>>()
                    .join(", ");
                info!(%ranks, "rank list");
            }
        }
        Dispatch::Continue
    }

    async fn speak(&self, feature: SpeechFeature, text: String, voice_index: usize) {
        if !self.toggles.is_enabled(feature) {
            return;
        }
        if self.queue.enqueue(RenderTask::new(text, voice_index)).await == EnqueueOutcome::Dropped {
            debug!(%feature, "announcement dropped");
        }
    }
}

fn nick(user: Option<&User>) -> &str {
    user.map_or("", |u| u.nick_name.as_str())
}
