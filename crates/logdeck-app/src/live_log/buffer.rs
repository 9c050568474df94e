//! Live log buffer - connection lifecycle, coalescing, and paging for one log target.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use logdeck_client::{
    decode_log_frame, ControlApi, ControlRequest, StreamConnector, StreamEvent, StreamRequest,
};
use logdeck_core::prelude::*;
use logdeck_core::{ConnectionState, Credential, LogLine, LogTarget, SessionKey};

use super::batcher::LineBatcher;
use super::message::LiveLogMessage;
use super::pager::{PageInfo, PageWindow};
use super::session::ConnectionSession;
use super::view::{LogView, Notifier};
use crate::config::LiveLogSettings;
use crate::credentials::CredentialSource;

/// Capacity of the buffer's internal message channel
const MESSAGE_CHANNEL_CAPACITY: usize = 256;

/// Collaborators injected into a [`LiveLogBuffer`]
pub struct LiveLogDeps<C, S> {
    pub control: Arc<C>,
    pub connector: Arc<S>,
    pub credentials: Arc<dyn CredentialSource>,
    pub notifier: Arc<dyn Notifier>,
    pub view: Arc<dyn LogView>,
}

/// Handle to the background task of one connection attempt
///
/// Dropping the guard drops the shutdown sender, which the task treats as a
/// close request.
#[derive(Debug)]
struct AttemptGuard {
    generation: u64,
    _shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl AttemptGuard {
    fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Buffered, paged view of one live log stream
///
/// Owns the session key, the connection state machine, and every received
/// line. All mutation happens through `&mut self`; background I/O reports
/// back over an internal channel drained by [`step`](Self::step).
///
/// Dropping the buffer performs an implicit [`stop`](Self::stop) without
/// notifications.
pub struct LiveLogBuffer<C, S>
where
    C: ControlApi + Sync + 'static,
    S: StreamConnector + Sync + 'static,
{
    target: LogTarget,
    control: Arc<C>,
    connector: Arc<S>,
    credentials: Arc<dyn CredentialSource>,
    notifier: Arc<dyn Notifier>,
    view: Arc<dyn LogView>,

    session: ConnectionSession,
    attempt: Option<AttemptGuard>,
    deactivations: Vec<JoinHandle<()>>,

    lines: VecDeque<LogLine>,
    max_lines: Option<usize>,
    batcher: LineBatcher,
    window: PageWindow,
    auto_scroll: bool,
    update_count: u64,

    msg_tx: mpsc::Sender<LiveLogMessage>,
    msg_rx: mpsc::Receiver<LiveLogMessage>,
}

impl<C, S> LiveLogBuffer<C, S>
where
    C: ControlApi + Sync + 'static,
    S: StreamConnector + Sync + 'static,
{
    pub fn new(target: LogTarget, settings: &LiveLogSettings, deps: LiveLogDeps<C, S>) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        Self {
            target,
            control: deps.control,
            connector: deps.connector,
            credentials: deps.credentials,
            notifier: deps.notifier,
            view: deps.view,
            session: ConnectionSession::new(),
            attempt: None,
            deactivations: Vec::new(),
            lines: VecDeque::new(),
            max_lines: settings.max_lines,
            batcher: LineBatcher::new(settings.flush_interval()),
            window: PageWindow::new(settings.page_size),
            auto_scroll: settings.auto_scroll,
            update_count: 0,
            msg_tx,
            msg_rx,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Activate the server-side emitter and open the stream.
    ///
    /// Returns as soon as the attempt is launched; progress arrives through
    /// [`step`](Self::step). Any attempt already in flight or open is closed
    /// first, and the session key is reused if one exists.
    pub fn start(&mut self) -> Result<()> {
        let Some(credential) = self.credentials.credential() else {
            warn!("Live log start for {} refused: not logged in", self.target.label());
            self.notifier.error("Please log in first");
            return Err(Error::Unauthenticated);
        };

        let key = self.session.ensure_key();

        if let Some(previous) = self.attempt.take() {
            debug!(
                "Superseding live log attempt {} for {}",
                previous.generation,
                self.target.label()
            );
        }

        let generation = self.session.begin_attempt();
        self.attempt = Some(self.spawn_attempt(generation, key, credential));

        info!(
            "Starting live log for {} (attempt {}, filter {:?})",
            self.target.label(),
            generation,
            self.session.filter()
        );
        Ok(())
    }

    /// Restart the stream with a new server-side filter. Empty means no filter.
    pub fn search(&mut self, filter: &str) -> Result<()> {
        self.session.set_filter(filter);
        self.start()
    }

    /// Close the stream and end the session. Idempotent.
    ///
    /// Pending lines are flushed and kept. The console is told to deactivate
    /// the session key in the background; failure there is only logged.
    pub fn stop(&mut self) {
        self.teardown(true);
    }

    fn teardown(&mut self, notify: bool) {
        let had_attempt = self.attempt.take().is_some();
        self.session.invalidate();

        if let Some(key) = self.session.take_key() {
            self.spawn_deactivation(key);
        }

        self.flush();

        if had_attempt || self.session.state().is_active() {
            self.session.mark_closed();
            info!("Live log for {} stopped", self.target.label());
            if notify {
                self.notifier.success("Connection closed");
            }
        }
    }

    fn spawn_attempt(
        &self,
        generation: u64,
        session_key: SessionKey,
        credential: Credential,
    ) -> AttemptGuard {
        let control_request = ControlRequest {
            target: self.target.clone(),
            session_key: session_key.clone(),
            search: self.session.filter().map(str::to_string),
            credential: credential.clone(),
        };
        let stream_request = StreamRequest {
            target: self.target.clone(),
            session_key,
            credential,
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_attempt(
            generation,
            Arc::clone(&self.control),
            Arc::clone(&self.connector),
            control_request,
            stream_request,
            self.msg_tx.clone(),
            shutdown_rx,
        ));

        AttemptGuard {
            generation,
            _shutdown_tx: shutdown_tx,
            task,
        }
    }

    fn spawn_deactivation(&mut self, session_key: SessionKey) {
        let Some(credential) = self.credentials.credential() else {
            warn!(
                "Not deactivating live log session {}: not logged in",
                session_key
            );
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                "Not deactivating live log session {}: no async runtime",
                session_key
            );
            return;
        };

        let control = Arc::clone(&self.control);
        let request = ControlRequest {
            target: self.target.clone(),
            session_key,
            search: None,
            credential,
        };
        let task = runtime.spawn(async move {
            match control.deactivate(&request).await {
                Ok(()) => debug!("Deactivated live log session {}", request.session_key),
                Err(e) => warn!(
                    "Failed to deactivate live log session {}: {}",
                    request.session_key, e
                ),
            }
        });
        self.deactivations.retain(|t| !t.is_finished());
        self.deactivations.push(task);
    }

    /// Wait for deactivation calls started by [`stop`](Self::stop) to finish
    pub async fn wait_deactivated(&mut self) {
        for task in self.deactivations.drain(..) {
            if let Err(e) = task.await {
                warn!("Deactivation task failed: {}", e);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Event loop
    // ─────────────────────────────────────────────────────────────────────

    /// Wait for the next message, or for the coalescing interval when lines are pending
    pub async fn next_message(&mut self) -> LiveLogMessage {
        if self.batcher.has_pending() {
            let wait = self.batcher.time_until_flush();
            tokio::select! {
                msg = self.msg_rx.recv() => msg.unwrap_or(LiveLogMessage::FlushDue),
                _ = tokio::time::sleep(wait) => LiveLogMessage::FlushDue,
            }
        } else {
            self.msg_rx
                .recv()
                .await
                .unwrap_or(LiveLogMessage::FlushDue)
        }
    }

    /// Wait for and apply one message
    pub async fn step(&mut self) {
        let msg = self.next_message().await;
        self.process_message(msg);
    }

    /// Drive the buffer until the current attempt has ended and every line is flushed
    pub async fn run_until_closed(&mut self) {
        while self.attempt.is_some() || self.batcher.has_pending() {
            self.step().await;
        }
    }

    /// Apply one message to the buffer
    pub fn process_message(&mut self, msg: LiveLogMessage) {
        if let Some(generation) = msg.generation() {
            if !self.session.is_current(generation) {
                trace!("Ignoring message from superseded attempt {}", generation);
                return;
            }
        }

        match msg {
            LiveLogMessage::FlushDue => {
                if self.batcher.should_flush() {
                    self.flush();
                }
            }

            LiveLogMessage::Activated { .. } => {
                debug!("Console acknowledged live log for {}", self.target.label());
            }

            LiveLogMessage::ActivationFailed { error, .. } => {
                warn!(
                    "Live log activation for {} failed: {}",
                    self.target.label(),
                    error
                );
                self.attempt = None;
                self.session.mark_idle();
                self.notifier.error(&error);
            }

            LiveLogMessage::StreamOpened { .. } => {
                info!("Live log stream for {} open", self.target.label());
                self.session.mark_open();
            }

            LiveLogMessage::ConnectFailed { error, .. } => {
                self.transport_ended(Some(error));
            }

            LiveLogMessage::Stream { event, .. } => match event {
                StreamEvent::Text(raw) => self.append_incoming(&raw),
                StreamEvent::Error(error) => {
                    self.transport_ended(Some(Error::transport(error).to_string()))
                }
                StreamEvent::Closed => self.transport_ended(None),
            },
        }
    }

    /// The current attempt's transport is gone; lines and key are kept
    fn transport_ended(&mut self, error: Option<String>) {
        self.attempt = None;
        self.flush();
        self.session.mark_closed();

        match error {
            Some(error) => {
                error!("Live log stream for {} failed: {}", self.target.label(), error);
                self.notifier.error(&error);
            }
            None => {
                info!("Live log stream for {} closed by server", self.target.label());
                self.notifier.warning("Log stream closed by server");
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lines
    // ─────────────────────────────────────────────────────────────────────

    /// Decode one raw frame and queue its line for the next flush.
    ///
    /// Malformed frames are reported and dropped; the stream stays open.
    pub fn append_incoming(&mut self, raw: &str) {
        match decode_log_frame(raw) {
            Ok(text) => {
                if self.batcher.add(LogLine::new(text)) {
                    self.flush();
                }
            }
            Err(e) => {
                warn!("Dropping undecodable frame from {}: {}", self.target.label(), e);
                self.notifier.error(&e.to_string());
            }
        }
    }

    /// Move every pending line into the retained sequence and refresh the view.
    ///
    /// Returns the number of lines moved.
    pub fn flush(&mut self) -> usize {
        if !self.batcher.has_pending() {
            return 0;
        }
        let batch = self.batcher.flush();
        let count = batch.len();
        self.lines.extend(batch);

        if let Some(max) = self.max_lines {
            let excess = self.lines.len().saturating_sub(max);
            if excess > 0 {
                self.lines.drain(..excess);
                trace!("Evicted {} oldest lines", excess);
            }
        }

        self.window.clamp(self.lines.len());
        self.update_count += 1;
        self.publish_page();
        count
    }

    fn publish_page(&mut self) {
        let total = self.lines.len();
        let range = self.window.range(total);
        let info = self.window.info(total);
        let page = &self.lines.make_contiguous()[range];

        self.view.page_updated(page, info);
        if self.auto_scroll && !page.is_empty() {
            self.view.scroll_to_bottom(page.len() - 1);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Paging
    // ─────────────────────────────────────────────────────────────────────

    /// Select a page, clamped to the valid range. Returns the page in effect.
    pub fn set_page(&mut self, page: usize) -> usize {
        let selected = self.window.set_page(page, self.lines.len());
        self.publish_page();
        selected
    }

    /// Move one page toward older lines
    pub fn next_page(&mut self) -> usize {
        self.set_page(self.window.page() + 1)
    }

    /// Move one page toward newer lines
    pub fn prev_page(&mut self) -> usize {
        self.set_page(self.window.page().saturating_sub(1))
    }

    /// Lines of the current page, oldest first
    pub fn current_page(&self) -> Vec<&LogLine> {
        self.lines.range(self.window.range(self.lines.len())).collect()
    }

    pub fn page(&self) -> usize {
        self.window.page()
    }

    pub fn page_count(&self) -> usize {
        self.window.page_count(self.lines.len())
    }

    pub fn page_info(&self) -> PageInfo {
        self.window.info(self.lines.len())
    }

    pub fn set_auto_scroll(&mut self, enabled: bool) {
        self.auto_scroll = enabled;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn target(&self) -> &LogTarget {
        &self.target
    }

    pub fn state(&self) -> ConnectionState {
        self.session.state()
    }

    pub fn session_key(&self) -> Option<&SessionKey> {
        self.session.key()
    }

    pub fn search_filter(&self) -> Option<&str> {
        self.session.filter()
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll
    }

    /// Every retained line, oldest first
    pub fn lines(&self) -> impl Iterator<Item = &LogLine> {
        self.lines.iter()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn pending_count(&self) -> usize {
        self.batcher.pending_count()
    }

    /// Number of flushes that reached the view
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Generation of the most recent connection attempt
    pub fn attempt_generation(&self) -> u64 {
        self.session.generation()
    }

    /// True while a background attempt task is still running
    pub fn has_running_attempt(&self) -> bool {
        self.attempt.as_ref().is_some_and(|a| !a.is_finished())
    }
}

impl<C, S> Drop for LiveLogBuffer<C, S>
where
    C: ControlApi + Sync + 'static,
    S: StreamConnector + Sync + 'static,
{
    fn drop(&mut self) {
        self.teardown(false);
    }
}

/// Background half of one connection attempt
///
/// Activation strictly precedes the connect. A shutdown signal at any point
/// abandons the attempt and closes whatever was opened.
async fn run_attempt<C, S>(
    generation: u64,
    control: Arc<C>,
    connector: Arc<S>,
    control_request: ControlRequest,
    stream_request: StreamRequest,
    msg_tx: mpsc::Sender<LiveLogMessage>,
    mut shutdown_rx: watch::Receiver<bool>,
) where
    C: ControlApi + Sync + 'static,
    S: StreamConnector + Sync + 'static,
{
    let activation = tokio::select! {
        biased;
        _ = shutdown_rx.changed() => return,
        result = control.activate(&control_request) => result,
    };
    if let Err(e) = activation {
        let _ = msg_tx
            .send(LiveLogMessage::ActivationFailed {
                generation,
                error: e.to_string(),
            })
            .await;
        return;
    }
    if msg_tx
        .send(LiveLogMessage::Activated { generation })
        .await
        .is_err()
    {
        return;
    }

    let connected = tokio::select! {
        biased;
        _ = shutdown_rx.changed() => return,
        result = connector.connect(&stream_request) => result,
    };
    let mut handle = match connected {
        Ok(handle) => handle,
        Err(e) => {
            let _ = msg_tx
                .send(LiveLogMessage::ConnectFailed {
                    generation,
                    error: e.to_string(),
                })
                .await;
            return;
        }
    };
    if msg_tx
        .send(LiveLogMessage::StreamOpened { generation })
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                handle.close();
                break;
            }
            event = handle.next_event() => {
                let event = event.unwrap_or(StreamEvent::Closed);
                let terminal = event.is_terminal();
                if msg_tx
                    .send(LiveLogMessage::Stream { generation, event })
                    .await
                    .is_err()
                {
                    break;
                }
                if terminal {
                    break;
                }
            }
        }
    }
}
