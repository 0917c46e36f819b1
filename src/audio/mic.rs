// cpal microphone backend.
//
// cpal streams are not Send, so the stream lives on a dedicated OS thread
// that parks until stop is signalled. Frames cross into the async world
// over a tokio mpsc channel; the audio callback never blocks.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::capture::{CaptureBackend, CaptureConfig, CaptureFrame};
use crate::error::{SessionError, SessionResult};

pub struct MicrophoneBackend {
    config: CaptureConfig,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            thread: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> SessionResult<mpsc::Receiver<CaptureFrame>> {
        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        let config = self.config.clone();
        let thread = std::thread::spawn(move || {
            run_capture_thread(config, frame_tx, ready_tx, stop_rx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                self.stop_tx = Some(stop_tx);
                self.thread = Some(thread);
                self.capturing = true;
                info!("Microphone capture started ({} Hz)", self.config.sample_rate);
                Ok(frame_rx)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::Permission(
                "capture thread exited before the device opened".to_string(),
            )),
        }
    }

    async fn stop(&mut self) -> SessionResult<()> {
        if !self.capturing {
            return Ok(());
        }
        self.capturing = false;

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            // The capture thread only holds the cpal stream; joining it off
            // the runtime keeps stop() non-blocking.
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }

        info!("Microphone capture stopped");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }
}

fn run_capture_thread(
    config: CaptureConfig,
    frame_tx: mpsc::Sender<CaptureFrame>,
    ready_tx: oneshot::Sender<SessionResult<()>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let host = cpal::default_host();

    let device = match host.default_input_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(SessionError::Permission(
                "no input device found; check that a microphone is connected \
                 and the app has recording permission"
                    .to_string(),
            )));
            return;
        }
    };

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let frame_len = config.frame_len();
    let sample_rate = config.sample_rate;
    let mut pending: Vec<f32> = Vec::with_capacity(frame_len * 2);

    let stream = device.build_input_stream(
        &stream_config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend_from_slice(data);
            while pending.len() >= frame_len {
                let samples: Vec<f32> = pending.drain(..frame_len).collect();
                let frame = CaptureFrame {
                    samples,
                    sample_rate,
                };
                // try_send: the callback must never block. A full channel
                // means the session fell behind; drop the frame.
                if frame_tx.try_send(frame).is_err() {
                    warn!("Capture channel full, dropping frame");
                }
            }
        },
        |err| {
            warn!("Capture stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(SessionError::Permission(format!(
                "failed to open microphone stream: {}",
                e
            ))));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(SessionError::Permission(format!(
            "failed to start microphone stream: {}",
            e
        ))));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Park until stop is signalled or the backend is dropped.
    let _ = stop_rx.recv();
    drop(stream);
}
