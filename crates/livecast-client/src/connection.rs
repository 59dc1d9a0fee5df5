//! Push connection lifecycle.
//!
//! A [`ConnectionManager`] owns one session: a supervisor task that resolves
//! the session, opens the push socket, pumps frames through the router and
//! reconnects on failure, plus the speech pipeline the router feeds. Every
//! resource it creates is released by [`ConnectionManager::stop`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{Sink, SinkExt, StreamExt};
use livecast_core::{ConnectionState, LiveId, SpeechToggles, ViewerDisplay};
use livecast_protocol::{decode_batch, decode_envelope, encode_ack};
use livecast_session::{PushUrl, SessionResolver, Signer};
use livecast_settings::LivecastSettings;
use livecast_speech::{SpeechRenderer, TaskPipeline};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, USER_AGENT};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ClientError, Result};
use crate::router::{Dispatch, Router};
use crate::watchdog::{Disconnect, Tripwire, Watchdog};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Extra time `stop` allows the supervisor beyond its own close and
/// pipeline bounds.
const STOP_GRACE: Duration = Duration::from_secs(1);

/// External capabilities a session uses.
#[derive(Clone)]
pub struct Collaborators {
    /// Cookie and room id lookup.
    pub resolver: Arc<dyn SessionResolver>,
    /// Push URL signer.
    pub signer: Arc<dyn Signer>,
    /// Speech synthesis and playback.
    pub renderer: Arc<dyn SpeechRenderer>,
    /// Viewer-count sink.
    pub display: Arc<dyn ViewerDisplay>,
    /// Speech toggles, shared with the control surface.
    pub toggles: Arc<SpeechToggles>,
}

/// Owner of one live session.
pub struct ConnectionManager {
    live_id: LiveId,
    cancel: CancellationToken,
    state: Arc<watch::Sender<ConnectionState>>,
    supervisor: Option<JoinHandle<()>>,
    stop_timeout: Duration,
}

impl ConnectionManager {
    /// Start a session for `live_id` and return immediately.
    ///
    /// State transitions are published on `state`.
    pub fn start(
        live_id: LiveId,
        settings: Arc<LivecastSettings>,
        collaborators: Collaborators,
        state: Arc<watch::Sender<ConnectionState>>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let pipeline = TaskPipeline::start(collaborators.renderer.clone(), &settings.pipeline);
        let router = Router::new(
            collaborators.toggles.clone(),
            pipeline.queue(),
            collaborators.display.clone(),
            &settings.speech,
        );
        let stop_timeout = settings.connection.close_timeout()
            + settings.pipeline.shutdown_timeout()
            + STOP_GRACE;

        let _ = state.send_replace(ConnectionState::Connecting);
        let supervisor = Supervisor {
            live_id: live_id.clone(),
            settings,
            collaborators,
            router,
            state: state.clone(),
            cancel: cancel.clone(),
            cookie: None,
            room_id: None,
        };
        let handle = tokio::spawn(supervisor.run(pipeline));

        Self {
            live_id,
            cancel,
            state,
            supervisor: Some(handle),
            stop_timeout,
        }
    }

    /// The session's live id.
    pub fn live_id(&self) -> &LiveId {
        &self.live_id
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether the supervisor has exited (stream ended, gave up, or stopped).
    pub fn is_finished(&self) -> bool {
        self.supervisor.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Tear the session down and move to [`ConnectionState::Closed`].
    ///
    /// Closes the socket, disarms the watchdog and stops the speech
    /// pipeline. Idempotent and bounded in time: a supervisor that does not
    /// finish within its budget is aborted.
    pub async fn stop(&mut self) {
        self.cancel.cancel();
        if let Some(mut supervisor) = self.supervisor.take() {
            match tokio::time::timeout(self.stop_timeout, &mut supervisor).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(live_id = %self.live_id, error = %e, "session supervisor failed"),
                Err(_) => {
                    warn!(live_id = %self.live_id, "session did not stop in time, aborting");
                    supervisor.abort();
                }
            }
            info!(live_id = %self.live_id, "session stopped");
        }
        let _ = self.state.send_replace(ConnectionState::Closed);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(supervisor) = self.supervisor.take() {
            supervisor.abort();
        }
    }
}

/// The session's single connect/pump/reconnect loop.
///
/// Attempts never overlap: the next one starts only after the previous
/// socket is closed and the backoff has elapsed.
struct Supervisor {
    live_id: LiveId,
    settings: Arc<LivecastSettings>,
    collaborators: Collaborators,
    router: Router,
    state: Arc<watch::Sender<ConnectionState>>,
    cancel: CancellationToken,
    cookie: Option<String>,
    room_id: Option<String>,
}

impl Supervisor {
    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "connection state");
        }
    }

    #[instrument(skip_all, fields(live_id = %self.live_id))]
    async fn run(mut self, mut pipeline: TaskPipeline) {
        let connection = self.settings.connection.clone();
        let mut failures: u32 = 0;

        loop {
            self.set_state(ConnectionState::Connecting);
            let cancel = self.cancel.clone();
            let attempt = tokio::select! {
                result = self.establish() => result,
                () = cancel.cancelled() => break,
            };

            let reason = match attempt {
                Ok(ws) => {
                    failures = 0;
                    self.set_state(ConnectionState::Connected);
                    info!("push connection open");
                    self.pump(ws).await
                }
                Err(e) => {
                    error!(error = %e, "connection attempt failed");
                    Disconnect::Transport(e.to_string())
                }
            };
            if self.cancel.is_cancelled() {
                break;
            }
            if !reason.should_reconnect() {
                self.set_state(ConnectionState::Disconnected);
                break;
            }

            failures += 1;
            if connection.reconnect_limit().is_some_and(|max| failures > max) {
                error!(attempts = failures - 1, "reconnect attempts exhausted");
                self.set_state(ConnectionState::Disconnected);
                break;
            }
            let delay = connection.reconnect_delay();
            warn!(?reason, attempt = failures, delay_ms = delay.as_millis() as u64, "reconnecting");
            self.set_state(ConnectionState::Reconnecting);
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.cancel.cancelled() => break,
            }
        }

        pipeline.stop().await;
        debug!("session supervisor exited");
    }

    /// Resolve the session and open the socket.
    ///
    /// Cookie and room id are cached for the life of the session; the URL
    /// and its signature are rebuilt on every attempt.
    async fn establish(&mut self) -> Result<WsStream> {
        let resolver = &self.collaborators.resolver;
        let cookie = match self.cookie.clone() {
            Some(cookie) => cookie,
            None => {
                let cookie = resolver.resolve_cookie().await?;
                self.cookie = Some(cookie.clone());
                cookie
            }
        };
        let room_id = match self.room_id.clone() {
            Some(room_id) => room_id,
            None => {
                let room_id = resolver.resolve_room_id(&self.live_id, &cookie).await?;
                info!(room_id, "room resolved");
                self.room_id = Some(room_id.clone());
                room_id
            }
        };

        let session = &self.settings.session;
        let url = PushUrl::now(&session.push_url, &room_id, &session.device_id);
        let signature = self.collaborators.signer.sign(&url).await?;

        let mut request = url.signed(&signature).into_client_request()?;
        let headers = request.headers_mut();
        let _ = headers.insert(COOKIE, header_value(&format!("ttwid={cookie}"))?);
        let _ = headers.insert(USER_AGENT, header_value(&session.user_agent)?);

        let (ws, response) = connect_async(request).await?;
        debug!(status = %response.status(), "push handshake complete");
        Ok(ws)
    }

    /// Read frames until the connection ends, then close it.
    async fn pump(&self, ws: WsStream) -> Disconnect {
        let tripwire = Arc::new(Tripwire::new(self.cancel.child_token()));
        let watchdog = Watchdog::arm(self.settings.connection.liveness_timeout(), tripwire.clone());
        let (mut ws_tx, mut ws_rx) = ws.split();

        loop {
            let next = tokio::select! {
                biased;
                () = tripwire.cancelled() => break,
                next = ws_rx.next() => next,
            };
            match next {
                Some(Ok(Message::Binary(data))) => {
                    watchdog.feed();
                    if handle_frame(&data, &mut ws_tx, &self.router).await == Dispatch::StreamEnded {
                        let _ = tripwire.trip(Disconnect::StreamEnded);
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed the connection");
                    let _ = tripwire.trip(Disconnect::RemoteClosed);
                }
                Some(Ok(_)) => watchdog.feed(),
                Some(Err(e)) => {
                    warn!(error = %e, "push socket error");
                    let _ = tripwire.trip(Disconnect::Transport(e.to_string()));
                }
                None => {
                    let _ = tripwire.trip(Disconnect::RemoteClosed);
                }
            }
        }

        drop(watchdog);
        close(ws_tx, self.settings.connection.close_timeout()).await;
        tripwire.reason().unwrap_or(Disconnect::Stopped)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ClientError::Request(e.to_string()))
}

/// Decode one binary frame, ack it if asked, and dispatch its messages.
///
/// The ack goes out before any message is dispatched. A failed ack is
/// logged and the batch is still dispatched; a frame that fails to decode is
/// logged and dropped.
pub(crate) async fn handle_frame<S>(data: &[u8], sink: &mut S, router: &Router) -> Dispatch
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let envelope = match decode_envelope(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(len = data.len(), error = %e, "dropping malformed frame");
            return Dispatch::Continue;
        }
    };
    let batch = match decode_batch(&envelope) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(log_id = envelope.log_id, error = %e, "dropping undecodable batch");
            return Dispatch::Continue;
        }
    };

    if batch.need_ack {
        let ack = encode_ack(envelope.log_id, &batch.internal_ext);
        match sink.send(Message::Binary(ack.into())).await {
            Ok(()) => debug!(log_id = envelope.log_id, "ack sent"),
            Err(e) => warn!(log_id = envelope.log_id, error = %e, "failed to send ack"),
        }
    }

    router.dispatch_batch(&batch).await
}

async fn close<S>(mut sink: S, timeout: Duration)
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    match tokio::time::timeout(timeout, sink.close()).await {
        Ok(Ok(())) => debug!("push socket closed"),
        Ok(Err(e)) => debug!(error = %e, "push socket close failed"),
        Err(_) => warn!(timeout_ms = timeout.as_millis() as u64, "push socket close timed out"),
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::pin::Pin;

    use livecast_core::{NullDisplay, RenderTask};
    use livecast_protocol::proto::{Response, RoomUserSeqMessage};
    use livecast_protocol::{MessageKind, encode_batch_frame, raw_message};
    use livecast_settings::{PipelineSettings, SpeechSettings};
    use livecast_speech::{SpeechError, TaskPipeline};
    use parking_lot::Mutex;

    use super::*;

    struct Silent;

    #[async_trait::async_trait]
    impl SpeechRenderer for Silent {
        async fn render_and_play(&self, _task: &RenderTask) -> std::result::Result<(), SpeechError> {
            Ok(())
        }
    }

    type Journal = Arc<Mutex<Vec<String>>>;

    fn router(journal: &Journal, pipeline: &TaskPipeline) -> Router {
        let journal = journal.clone();
        let display: Arc<dyn ViewerDisplay> =
            Arc::new(move |n: i64| journal.lock().push(format!("viewers:{n}")));
        Router::new(
            Arc::new(SpeechToggles::new()),
            pipeline.queue(),
            display,
            &SpeechSettings::default(),
        )
    }

    /// A sink that journals every frame it is given.
    fn journaling_sink(
        journal: &Journal,
    ) -> Pin<Box<dyn Sink<Message, Error = Infallible> + Send>> {
        let journal = journal.clone();
        Box::pin(futures::sink::unfold((), move |(), msg: Message| {
            let journal = journal.clone();
            async move {
                let envelope = decode_envelope(&msg.into_data()).expect("ack envelope");
                journal.lock().push(format!(
                    "ack:{}:{}",
                    envelope.log_id,
                    String::from_utf8_lossy(&envelope.payload)
                ));
                Ok::<_, Infallible>(())
            }
        }))
    }

    fn frame(log_id: u64, need_ack: bool, totals: &[i64]) -> Vec<u8> {
        let response = Response {
            messages: totals
                .iter()
                .map(|&total| {
                    raw_message(
                        MessageKind::RoomUserSeq,
                        &RoomUserSeqMessage {
                            total,
                            ..RoomUserSeqMessage::default()
                        },
                    )
                })
                .collect(),
            internal_ext: format!("ext-{log_id}"),
            need_ack,
            ..Response::default()
        };
        encode_batch_frame(log_id, &response).unwrap()
    }

    #[tokio::test]
    async fn ack_precedes_dispatch() {
        let journal = Journal::default();
        let mut pipeline = TaskPipeline::start(Arc::new(Silent), &PipelineSettings::default());
        let router = router(&journal, &pipeline);
        let mut sink = journaling_sink(&journal);

        let outcome = handle_frame(&frame(7, true, &[3, 4]), &mut sink, &router).await;

        assert_eq!(outcome, Dispatch::Continue);
        assert_eq!(*journal.lock(), ["ack:7:ext-7", "viewers:3", "viewers:4"]);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn no_ack_unless_asked() {
        let journal = Journal::default();
        let mut pipeline = TaskPipeline::start(Arc::new(Silent), &PipelineSettings::default());
        let router = router(&journal, &pipeline);
        let mut sink = journaling_sink(&journal);

        let _ = handle_frame(&frame(8, false, &[9]), &mut sink, &router).await;

        assert_eq!(*journal.lock(), ["viewers:9"]);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn failed_ack_still_dispatches() {
        let journal = Journal::default();
        let mut pipeline = TaskPipeline::start(Arc::new(Silent), &PipelineSettings::default());
        let router = router(&journal, &pipeline);
        let mut sink = Box::pin(futures::sink::unfold((), |(), _msg: Message| async {
            Err::<(), _>("socket gone".to_string())
        }));

        let _ = handle_frame(&frame(9, true, &[1]), &mut sink, &router).await;

        assert_eq!(*journal.lock(), ["viewers:1"]);
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let journal = Journal::default();
        let mut pipeline = TaskPipeline::start(Arc::new(Silent), &PipelineSettings::default());
        let router = Router::new(
            Arc::new(SpeechToggles::new()),
            pipeline.queue(),
            Arc::new(NullDisplay),
            &SpeechSettings::default(),
        );
        let mut sink = journaling_sink(&journal);

        assert_eq!(handle_frame(&[0x08], &mut sink, &router).await, Dispatch::Continue);

        // Valid envelope, payload that is not gzip.
        let not_gzip = livecast_protocol::proto::PushFrame {
            log_id: 1,
            payload_type: "msg".into(),
            payload: b"plain".to_vec(),
            ..Default::default()
        };
        let bytes = prost::Message::encode_to_vec(&not_gzip);
        assert_eq!(handle_frame(&bytes, &mut sink, &router).await, Dispatch::Continue);

        assert!(journal.lock().is_empty());
        pipeline.stop().await;
    }

    #[test]
    fn header_value_rejects_control_characters() {
        assert!(header_value("ttwid=abc").is_ok());
        assert!(matches!(header_value("bad\nvalue"), Err(ClientError::Request(_))));
    }
}
