// cpal speaker sink.
//
// The output stream runs on its own OS thread (cpal streams are not
// Send). The audio callback and the scheduler share one mutex-guarded
// mix state: a sample playhead and the set of scheduled segments. Device
// time is derived from the playhead, so it advances exactly as fast as
// samples leave the device.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

use super::playback::{BufferId, PlaybackSink};

struct Segment {
    id: BufferId,
    /// First sample index on the device timeline
    start: u64,
    samples: Vec<f32>,
}

struct MixState {
    /// Samples emitted since the stream opened
    playhead: u64,
    segments: Vec<Segment>,
}

pub struct DeviceSink {
    state: Arc<Mutex<MixState>>,
    sample_rate: u32,
    stop_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceSink {
    /// Open the default output device at the given rate, mono.
    pub fn open(sample_rate: u32) -> Result<Self> {
        let state = Arc::new(Mutex::new(MixState {
            playhead: 0,
            segments: Vec::new(),
        }));

        let (ready_tx, ready_rx) = std_mpsc::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();

        let thread_state = Arc::clone(&state);
        let thread = std::thread::spawn(move || {
            run_output_thread(sample_rate, thread_state, ready_tx, stop_rx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {
                info!("Playback device opened ({} Hz)", sample_rate);
                Ok(Self {
                    state,
                    sample_rate,
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                })
            }
            Ok(Err(msg)) => Err(anyhow!(msg)),
            Err(_) => Err(anyhow!("playback thread exited before the device opened")),
        }
    }

    /// Stop the stream and release the device.
    pub fn close(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl PlaybackSink for DeviceSink {
    fn current_time(&self) -> f64 {
        match self.state.lock() {
            Ok(state) => state.playhead as f64 / self.sample_rate as f64,
            Err(_) => 0.0,
        }
    }

    fn schedule(&mut self, id: BufferId, samples: Vec<f32>, start_secs: f64) -> Result<()> {
        let start = (start_secs * self.sample_rate as f64).round() as u64;
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("playback state poisoned"))?;
        state.segments.push(Segment { id, start, samples });
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow!("playback state poisoned"))?;
        let cancelled: Vec<BufferId> = state.segments.iter().map(|s| s.id).collect();
        if !cancelled.is_empty() {
            debug!("Cancelling scheduled segments: {:?}", cancelled);
        }
        state.segments.clear();
        Ok(())
    }
}

impl Drop for DeviceSink {
    fn drop(&mut self) {
        self.close();
    }
}

fn run_output_thread(
    sample_rate: u32,
    state: Arc<Mutex<MixState>>,
    ready_tx: std_mpsc::Sender<Result<(), String>>,
    stop_rx: std_mpsc::Receiver<()>,
) {
    let host = cpal::default_host();

    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err("no output device found".to_string()));
            return;
        }
    };

    let stream_config = cpal::StreamConfig {
        channels: 1,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let callback_state = Arc::clone(&state);
    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            fill_output(&callback_state, data);
        },
        |err| {
            warn!("Playback stream error: {}", err);
        },
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(format!("failed to open output stream: {}", e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(format!("failed to start output stream: {}", e)));
        return;
    }

    let _ = ready_tx.send(Ok(()));
    let _ = stop_rx.recv();
    drop(stream);
}

fn fill_output(state: &Arc<Mutex<MixState>>, data: &mut [f32]) {
    let mut state = match state.lock() {
        Ok(state) => state,
        Err(_) => {
            data.fill(0.0);
            return;
        }
    };

    for out in data.iter_mut() {
        let t = state.playhead;
        let mut value = 0.0f32;
        for segment in &state.segments {
            if t >= segment.start {
                let index = (t - segment.start) as usize;
                if index < segment.samples.len() {
                    value += segment.samples[index];
                }
            }
        }
        *out = value.clamp(-1.0, 1.0);
        state.playhead += 1;
    }

    // Drop segments the playhead has moved past.
    let playhead = state.playhead;
    state
        .segments
        .retain(|segment| segment.start + segment.samples.len() as u64 > playhead);
}
