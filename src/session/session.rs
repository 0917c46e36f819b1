use super::config::SessionConfig;
use super::transcript::{TranscriptAccumulator, TranscriptEntry};
use crate::audio::{pcm, CaptureBackend, PlaybackScheduler, PlaybackSink};
use crate::error::{SessionError, SessionResult};
use crate::live::{LiveEndpoint, ServerEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Lifecycle of a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Closing,
    Closed,
}

/// A live voice session: one duplex connection, one microphone, one
/// playback device.
///
/// Owns the full exchange lifecycle. Capture frames are encoded and sent
/// fire-and-forget; server events are dispatched to the playback
/// scheduler and the transcript accumulator. `stop()` is idempotent and
/// releases every device handle; a remote close runs the same teardown
/// and counts as a normal session end.
pub struct LiveSession {
    /// Session configuration
    config: SessionConfig,

    /// Lifecycle state, readable from the front end
    state: Arc<std::sync::Mutex<SessionState>>,

    /// Whether the session is currently active
    running: Arc<AtomicBool>,

    /// Shutdown signal shared by the capture and event tasks
    shutdown: Arc<std::sync::Mutex<Option<watch::Sender<bool>>>>,

    /// User-visible status line
    status_tx: watch::Sender<String>,

    /// Finalized transcript entries, append-only
    history: Arc<Mutex<Vec<TranscriptEntry>>>,

    /// Streams finalized entries to the front end
    entry_tx: mpsc::Sender<TranscriptEntry>,
    entry_rx: Option<mpsc::Receiver<TranscriptEntry>>,

    /// Handle for the capture-to-connection task
    capture_task: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Handle for the server-event dispatch task
    event_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LiveSession {
    pub fn new(config: SessionConfig) -> Self {
        let (status_tx, _) = watch::channel("Idle".to_string());
        let (entry_tx, entry_rx) = mpsc::channel(256);

        Self {
            config,
            state: Arc::new(std::sync::Mutex::new(SessionState::Idle)),
            running: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(std::sync::Mutex::new(None)),
            status_tx,
            history: Arc::new(Mutex::new(Vec::new())),
            entry_tx,
            entry_rx: Some(entry_rx),
            capture_task: Arc::new(Mutex::new(None)),
            event_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the session: open the microphone, connect to the endpoint,
    /// and begin streaming in both directions.
    pub async fn start(
        &self,
        mut capture: Box<dyn CaptureBackend>,
        mut endpoint: Box<dyn LiveEndpoint>,
        sink: Box<dyn PlaybackSink>,
    ) -> SessionResult<()> {
        // Claim the running flag before the first await so two overlapping
        // start() calls cannot both pass the guard.
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Session already active, rejecting start");
            return Err(SessionError::AlreadyActive);
        }

        info!("Starting live session: {}", self.config.session_id);
        self.set_state(SessionState::Connecting);
        self.set_status("Connecting...");

        // Microphone first: a permission failure must not open a
        // connection.
        let mut frames = match capture.start().await {
            Ok(frames) => frames,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_state(SessionState::Idle);
                self.set_status(&e.to_string());
                return Err(e);
            }
        };

        let connection = match endpoint.connect(self.config.setup()).await {
            Ok(connection) => connection,
            Err(e) => {
                if let Err(stop_err) = capture.stop().await {
                    warn!("Failed to release capture backend: {}", stop_err);
                }
                self.running.store(false, Ordering::SeqCst);
                self.set_state(SessionState::Idle);
                self.set_status(&e.to_string());
                return Err(e);
            }
        };

        let (shutdown_tx, _) = watch::channel(false);
        {
            let mut guard = self
                .shutdown
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = Some(shutdown_tx.clone());
        }

        self.set_state(SessionState::Active);
        self.set_status("Listening");

        // Capture task: encode each microphone frame and hand it to the
        // transport without waiting for acknowledgment.
        let audio_tx = connection.audio_tx.clone();
        let running = Arc::clone(&self.running);
        let mut capture_shutdown = shutdown_tx.subscribe();

        let capture_task = tokio::spawn(async move {
            info!("Capture task started");
            let mut frames_sent: u64 = 0;

            loop {
                tokio::select! {
                    frame = frames.recv() => {
                        let frame = match frame {
                            Some(frame) => frame,
                            None => break,
                        };
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }

                        let payload = pcm::encode_base64(&frame.samples);
                        if audio_tx.try_send(payload).is_err() {
                            warn!("Outbound audio path unavailable, dropping frame");
                        } else {
                            frames_sent += 1;
                        }
                    }
                    _ = capture_shutdown.changed() => break,
                }
            }

            if let Err(e) = capture.stop().await {
                warn!("Failed to stop capture backend: {}", e);
            }

            info!("Capture task stopped ({} frames sent)", frames_sent);
        });

        {
            let mut handle = self.capture_task.lock().await;
            *handle = Some(capture_task);
        }

        // Event task: dispatch every server event. Owns the playback
        // scheduler and the transcript accumulator, so no lock is needed
        // around either.
        let mut scheduler = PlaybackScheduler::new(sink, self.config.playback_sample_rate);
        let mut accumulator = TranscriptAccumulator::new();
        let history = Arc::clone(&self.history);
        let entry_tx = self.entry_tx.clone();
        let running = Arc::clone(&self.running);
        let state = Arc::clone(&self.state);
        let status_tx = self.status_tx.clone();
        let event_shutdown_tx = shutdown_tx.clone();
        let mut event_shutdown = shutdown_tx.subscribe();
        let mut events = connection.events;

        let event_task = tokio::spawn(async move {
            info!("Event task started");
            let mut close_reason: Option<String> = None;
            let mut close_error: Option<String> = None;
            let mut ended_remotely = false;

            loop {
                tokio::select! {
                    event = events.recv() => {
                        let event = match event {
                            Some(event) => event,
                            None => {
                                ended_remotely = true;
                                break;
                            }
                        };

                        match event {
                            ServerEvent::SetupComplete => {
                                debug!("Endpoint acknowledged setup");
                            }
                            ServerEvent::InputTranscript(text) => {
                                accumulator.append_user(&text);
                            }
                            ServerEvent::OutputTranscript(text) => {
                                accumulator.append_model(&text);
                            }
                            ServerEvent::TurnComplete => {
                                flush_turn(&mut accumulator, &history, &entry_tx).await;
                            }
                            ServerEvent::AudioFragment(payload) => {
                                // A single bad fragment must not end an
                                // otherwise healthy conversation.
                                match pcm::decode_base64(&payload) {
                                    Ok(samples) => {
                                        if let Err(e) = scheduler.enqueue(samples) {
                                            warn!("Failed to schedule audio fragment: {}", e);
                                        }
                                    }
                                    Err(e) => {
                                        warn!("Skipping undecodable audio fragment: {}", e);
                                    }
                                }
                            }
                            ServerEvent::Interrupted => {
                                if let Err(e) = scheduler.interrupt() {
                                    warn!("Failed to cancel playback: {}", e);
                                }
                            }
                            ServerEvent::Closed(reason) => {
                                close_reason = reason;
                                ended_remotely = true;
                                break;
                            }
                            ServerEvent::ConnectionLost(message) => {
                                close_error = Some(message);
                                ended_remotely = true;
                                break;
                            }
                        }
                    }
                    _ = event_shutdown.changed() => break,
                }
            }

            // Finalize whatever the last turn left behind.
            flush_turn(&mut accumulator, &history, &entry_tx).await;

            if let Err(e) = scheduler.shutdown() {
                warn!("Failed to release playback sink: {}", e);
            }

            if ended_remotely {
                // Remote close is a normal session end, not an error.
                running.store(false, Ordering::SeqCst);
                let _ = event_shutdown_tx.send(true);
                set_state(&state, SessionState::Closed);
                // A transport failure reads differently from a clean close.
                let message = match (close_error, close_reason) {
                    (Some(error), _) => SessionError::Connection(error).to_string(),
                    (None, Some(reason)) => format!("Session ended: {}", reason),
                    (None, None) => "Session ended".to_string(),
                };
                let _ = status_tx.send_replace(message);
            }

            info!("Event task stopped");
        });

        {
            let mut handle = self.event_task.lock().await;
            *handle = Some(event_task);
        }

        info!("Live session started: {}", self.config.session_id);
        Ok(())
    }

    /// Stop the session and release every device handle.
    ///
    /// Idempotent: calling it when already stopped is a no-op.
    pub async fn stop(&self) -> SessionResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            debug!("Session not active, nothing to stop");
            return Ok(());
        }

        info!("Stopping live session: {}", self.config.session_id);
        self.set_state(SessionState::Closing);
        self.set_status("Stopping...");

        {
            let guard = self
                .shutdown
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(shutdown_tx) = guard.as_ref() {
                let _ = shutdown_tx.send(true);
            }
        }

        {
            let mut handle = self.capture_task.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Capture task panicked: {}", e);
                }
            }
        }

        {
            let mut handle = self.event_task.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Event task panicked: {}", e);
                }
            }
        }

        self.set_state(SessionState::Closed);
        self.set_status("Stopped");

        info!("Live session stopped: {}", self.config.session_id);
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribe to the user-visible status line.
    pub fn status(&self) -> watch::Receiver<String> {
        self.status_tx.subscribe()
    }

    /// Take the stream of finalized transcript entries. Yields each entry
    /// once, in finalization order.
    pub fn take_entries(&mut self) -> Option<mpsc::Receiver<TranscriptEntry>> {
        self.entry_rx.take()
    }

    /// Snapshot of the full transcript history.
    pub async fn transcript(&self) -> Vec<TranscriptEntry> {
        let history = self.history.lock().await;
        history.clone()
    }

    fn set_state(&self, next: SessionState) {
        set_state(&self.state, next);
    }

    fn set_status(&self, message: &str) {
        let _ = self.status_tx.send_replace(message.to_string());
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        // Best-effort teardown when stop() was never called: signal both
        // tasks so the device handles get released.
        self.running.store(false, Ordering::SeqCst);
        if let Ok(mut guard) = self.shutdown.lock() {
            if let Some(shutdown_tx) = guard.take() {
                let _ = shutdown_tx.send(true);
            }
        }
    }
}

fn set_state(state: &Arc<std::sync::Mutex<SessionState>>, next: SessionState) {
    let mut guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = next;
}

async fn flush_turn(
    accumulator: &mut TranscriptAccumulator,
    history: &Arc<Mutex<Vec<TranscriptEntry>>>,
    entry_tx: &mpsc::Sender<TranscriptEntry>,
) {
    for entry in accumulator.end_turn() {
        {
            let mut history = history.lock().await;
            history.push(entry.clone());
        }
        if entry_tx.try_send(entry).is_err() {
            debug!("No transcript consumer attached, entry kept in history only");
        }
    }
}
