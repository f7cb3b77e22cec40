use crate::codec::AmiFrame;
use crate::connection::{self, AmiConnection, AmiReader};
use crate::event::AmiEvent;
use crate::event_handler::EventHandler;
use crate::{EVENT_QUEUE_DEPTH, RECONNECT_DELAY};
use futures::StreamExt;
use gsmgw_core::config::AmiConfig;
use gsmgw_core::{AppError, AppResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of the manager session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connecting,
    Authenticating,
    Listening,
    /// Terminal, only after `stop()`
    Stopped,
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorState::Disconnected => "disconnected",
            ConnectorState::Connecting => "connecting",
            ConnectorState::Authenticating => "authenticating",
            ConnectorState::Listening => "listening",
            ConnectorState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

enum SessionEnd {
    Cancelled,
}

struct ConnectorInner {
    config: AmiConfig,
    server_id: String,
    handler: Arc<dyn EventHandler>,
    cancel: CancellationToken,
    state: watch::Sender<ConnectorState>,
    reconnect_delay: Duration,
}

/// Supervised AMI session
///
/// `start()` spawns a task that connects, logs in, dispatches every event to
/// the handler in arrival order and, when the session fails for any reason,
/// waits [`RECONNECT_DELAY`] and tries again, forever. `stop()` cancels the
/// task wherever it is blocked and waits for it to finish.
pub struct AmiConnector {
    inner: Arc<ConnectorInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AmiConnector {
    pub fn new(config: AmiConfig, handler: Arc<dyn EventHandler>) -> Self {
        Self::build(config, handler, RECONNECT_DELAY)
    }

    /// Shorten the reconnect wait so failure paths can be exercised quickly
    #[cfg(test)]
    pub(crate) fn with_reconnect_delay(
        config: AmiConfig,
        handler: Arc<dyn EventHandler>,
        delay: Duration,
    ) -> Self {
        Self::build(config, handler, delay)
    }

    fn build(config: AmiConfig, handler: Arc<dyn EventHandler>, reconnect_delay: Duration) -> Self {
        let (state, _) = watch::channel(ConnectorState::Disconnected);
        let server_id = config.server_id();

        Self {
            inner: Arc::new(ConnectorInner {
                config,
                server_id,
                handler,
                cancel: CancellationToken::new(),
                state,
                reconnect_delay,
            }),
            task: Mutex::new(None),
        }
    }

    /// Spawn the session loop. No-op while a loop is already running or
    /// after `stop()`.
    pub fn start(&self) {
        let mut task = self.task.lock();

        if task.as_ref().map_or(false, |handle| !handle.is_finished()) {
            debug!("AMI connector for {} already running", self.inner.server_id);
            return;
        }
        if self.inner.cancel.is_cancelled() {
            warn!("AMI connector for {} was stopped; not restarting", self.inner.server_id);
            return;
        }

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move { inner.run().await }));
    }

    /// Cancel the session loop and wait for it to exit
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("AMI connector task for {} failed: {}", self.inner.server_id, e);
            }
        }
        self.inner.state.send_replace(ConnectorState::Stopped);
    }

    pub fn state(&self) -> ConnectorState {
        *self.inner.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectorState> {
        self.inner.state.subscribe()
    }

    pub fn server_id(&self) -> &str {
        &self.inner.server_id
    }
}

impl ConnectorInner {
    fn set_state(&self, state: ConnectorState) {
        self.state.send_replace(state);
    }

    async fn run(&self) {
        loop {
            match self.connect_and_listen().await {
                Ok(SessionEnd::Cancelled) => {
                    info!("AMI session closed: {}", self.server_id);
                    break;
                }
                Err(e) => {
                    error!(
                        error_code = e.error_code(),
                        "AMI error for {}: {}", self.server_id, e
                    );
                }
            }

            self.set_state(ConnectorState::Disconnected);
            warn!(
                "Reconnecting to {} in {} seconds...",
                self.server_id,
                self.reconnect_delay.as_secs_f64()
            );

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = sleep(self.reconnect_delay) => {}
            }
        }

        self.set_state(ConnectorState::Stopped);
    }

    async fn connect_and_listen(&self) -> AppResult<SessionEnd> {
        self.set_state(ConnectorState::Connecting);
        let mut connection = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            result = AmiConnection::connect(&self.config) => result?,
        };

        self.set_state(ConnectorState::Authenticating);
        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            result = connection.login(&self.config.username, &self.config.password) => result?,
        }

        self.set_state(ConnectorState::Listening);
        info!("✅ Listening for AMI events: {}", self.server_id);

        let (mut writer, reader) = connection.split();
        let (event_tx, mut event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (error_tx, mut error_rx) = mpsc::channel(1);
        let reader_task = tokio::spawn(read_frames(reader, event_tx, error_tx));

        let outcome = loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break Ok(SessionEnd::Cancelled),

                event = event_rx.recv() => match event {
                    Some(event) => self.handler.handle_event(&event).await,
                    None => {
                        break Err(error_rx.try_recv().unwrap_or_else(|_| {
                            AppError::AmiConnection("event stream ended".to_string())
                        }));
                    }
                },

                Some(e) = error_rx.recv() => break Err(e),
            }
        };

        if matches!(outcome, Ok(SessionEnd::Cancelled)) {
            connection::logoff(&mut writer, &self.server_id).await;
        }
        reader_task.abort();

        outcome
    }
}

/// Pump decoded frames off the socket. Events go to `events`; the first
/// fatal condition goes to `errors` and ends the task.
async fn read_frames(
    mut reader: AmiReader,
    events: mpsc::Sender<AmiEvent>,
    errors: mpsc::Sender<AppError>,
) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(AmiFrame::Event(event)) => {
                if events.send(event).await.is_err() {
                    return;
                }
            }
            Ok(AmiFrame::Response(reply)) => debug!("Ignoring action reply: {}", reply),
            Ok(AmiFrame::Banner(_)) => {}
            Err(e) => {
                let _ = errors.send(e).await;
                return;
            }
        }
    }

    let _ = errors
        .send(AppError::AmiConnection("connection closed by switch".to_string()))
        .await;
}
