//! Control surface.
//!
//! [`LiveController`] is what a front end talks to. It holds at most one
//! [`ConnectionManager`] and guarantees the previous one is fully stopped
//! before a new one is built.

use std::sync::Arc;

use livecast_core::{ConnectionState, LiveId, SpeechFeature};
use livecast_settings::LivecastSettings;
use tokio::sync::{Mutex, watch};
use tracing::info;

use crate::connection::{Collaborators, ConnectionManager};
use crate::error::Result;

/// Starts, stops and restarts sessions; flips speech toggles.
pub struct LiveController {
    settings: Arc<LivecastSettings>,
    collaborators: Collaborators,
    state: Arc<watch::Sender<ConnectionState>>,
    active: Mutex<Option<ConnectionManager>>,
}

impl LiveController {
    /// Controller with no session running. Toggles are initialised from
    /// `settings.features`.
    pub fn new(settings: LivecastSettings, collaborators: Collaborators) -> Self {
        settings.features.apply(&collaborators.toggles);
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            settings: Arc::new(settings),
            collaborators,
            state: Arc::new(state),
            active: Mutex::new(None),
        }
    }

    /// Start a session for `live_id`, stopping the current one first.
    ///
    /// The id is validated before anything is torn down, so a bad id leaves
    /// a running session alone.
    pub async fn start(&self, live_id: &str) -> Result<()> {
        let live_id = LiveId::parse(live_id)?;
        let mut active = self.active.lock().await;
        if let Some(mut previous) = active.take() {
            info!(live_id = %previous.live_id(), "stopping previous session");
            previous.stop().await;
        }
        info!(%live_id, "starting session");
        *active = Some(ConnectionManager::start(
            live_id,
            self.settings.clone(),
            self.collaborators.clone(),
            self.state.clone(),
        ));
        Ok(())
    }

    /// Stop the current session, if any, and move to
    /// [`ConnectionState::Closed`]. Idempotent.
    pub async fn stop(&self) {
        let mut active = self.active.lock().await;
        if let Some(mut manager) = active.take() {
            manager.stop().await;
        }
        let _ = self.state.send_replace(ConnectionState::Closed);
    }

    /// Live id of the current session.
    pub async fn live_id(&self) -> Option<LiveId> {
        self.active
            .lock()
            .await
            .as_ref()
            .map(|m| m.live_id().clone())
    }

    /// Switch a speech feature on or off.
    pub fn set_feature(&self, feature: SpeechFeature, enabled: bool) {
        self.collaborators.toggles.set(feature, enabled);
        info!(%feature, enabled, "speech feature set");
    }

    /// Flip a speech feature and return its new value.
    pub fn toggle(&self, feature: SpeechFeature) -> bool {
        let enabled = self.collaborators.toggles.toggle(feature);
        info!(%feature, enabled, "speech feature toggled");
        enabled
    }

    /// Current value of every speech feature.
    pub fn features(&self) -> [(SpeechFeature, bool); 4] {
        self.collaborators.toggles.snapshot()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch connection state across sessions.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use livecast_core::{LiveIdError, NullDisplay, RenderTask, SpeechToggles};
    use livecast_session::{SessionError, SessionResolver, StaticSigner};
    use livecast_settings::FeatureSettings;
    use livecast_speech::{SpeechError, SpeechRenderer};

    use super::*;
    use crate::error::ClientError;

    /// Never resolves a session, so sessions sit in connect/backoff.
    struct Unreachable;

    #[async_trait]
    impl SessionResolver for Unreachable {
        async fn resolve_cookie(&self) -> livecast_session::Result<String> {
            Err(SessionError::MissingCookie)
        }

        async fn resolve_room_id(
            &self,
            live_id: &LiveId,
            _cookie: &str,
        ) -> livecast_session::Result<String> {
            Err(SessionError::MissingRoomId(live_id.to_string()))
        }
    }

    struct Mute;

    #[async_trait]
    impl SpeechRenderer for Mute {
        async fn render_and_play(&self, _task: &RenderTask) -> std::result::Result<(), SpeechError> {
            Ok(())
        }
    }

    fn controller(settings: LivecastSettings) -> LiveController {
        LiveController::new(
            settings,
            Collaborators {
                resolver: Arc::new(Unreachable),
                signer: Arc::new(StaticSigner::default()),
                renderer: Arc::new(Mute),
                display: Arc::new(NullDisplay),
                toggles: Arc::new(SpeechToggles::new()),
            },
        )
    }

    #[tokio::test]
    async fn stop_twice_is_closed_both_times() {
        let ctl = controller(LivecastSettings::default());
        ctl.start("123").await.unwrap();

        ctl.stop().await;
        assert_eq!(ctl.state(), ConnectionState::Closed);
        ctl.stop().await;
        assert_eq!(ctl.state(), ConnectionState::Closed);
        assert!(ctl.live_id().await.is_none());
    }

    #[tokio::test]
    async fn stop_without_start_is_closed() {
        let ctl = controller(LivecastSettings::default());
        assert_eq!(ctl.state(), ConnectionState::Disconnected);
        ctl.stop().await;
        assert_eq!(ctl.state(), ConnectionState::Closed);
    }

    #[tokio::test]
    async fn bad_live_id_keeps_current_session() {
        let ctl = controller(LivecastSettings::default());
        ctl.start("123").await.unwrap();

        let err = ctl.start("abc").await.unwrap_err();
        assert_matches!(err, ClientError::InvalidLiveId(LiveIdError::NotNumeric(_)));
        assert_eq!(ctl.live_id().await.unwrap().as_str(), "123");
        ctl.stop().await;
    }

    #[tokio::test]
    async fn restart_replaces_session() {
        let ctl = controller(LivecastSettings::default());
        ctl.start("123").await.unwrap();
        ctl.start("456").await.unwrap();
        assert_eq!(ctl.live_id().await.unwrap().as_str(), "456");
        assert_ne!(ctl.state(), ConnectionState::Closed);
        ctl.stop().await;
    }

    #[tokio::test]
    async fn resolution_failure_takes_reconnect_path() {
        let ctl = controller(LivecastSettings::default());
        let mut states = ctl.subscribe_state();
        ctl.start("123").await.unwrap();

        let reached = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            states.wait_for(|s| *s == ConnectionState::Reconnecting),
        )
        .await
        .is_ok_and(|r| r.is_ok());
        assert!(reached);
        ctl.stop().await;
    }

    #[tokio::test]
    async fn zero_max_attempts_keeps_reconnecting() {
        let mut settings = LivecastSettings::default();
        settings.connection.max_reconnect_attempts = Some(0);
        let ctl = controller(settings);
        let mut states = ctl.subscribe_state();
        ctl.start("123").await.unwrap();

        let retried = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            states.wait_for(|s| *s == ConnectionState::Reconnecting),
        )
        .await
        .is_ok_and(|r| r.is_ok());
        assert!(retried);

        // Past the first backoff the session is still trying.
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert_ne!(ctl.state(), ConnectionState::Disconnected);
        ctl.stop().await;
    }

    #[test]
    fn toggles_start_from_settings() {
        let ctl = controller(LivecastSettings {
            features: FeatureSettings {
                gift: true,
                ..FeatureSettings::default()
            },
            ..LivecastSettings::default()
        });
        assert!(ctl.features().contains(&(SpeechFeature::Gift, true)));
        assert!(ctl.toggle(SpeechFeature::Chat));
        ctl.set_feature(SpeechFeature::Gift, false);
        assert_eq!(
            ctl.features(),
            [
                (SpeechFeature::Chat, true),
                (SpeechFeature::Gift, false),
                (SpeechFeature::Follow, false),
                (SpeechFeature::Welcome, false),
            ]
        );
    }
}
