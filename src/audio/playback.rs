use anyhow::Result;
use tracing::debug;

/// Identifier for a scheduled playback buffer.
pub type BufferId = u64;

/// Output device boundary.
///
/// A sink accepts decoded float buffers with precise start times and
/// exposes a monotonic current-time reference. The real implementation
/// drives a speaker stream; tests substitute a manual clock.
pub trait PlaybackSink: Send {
    /// Monotonic device time in seconds.
    fn current_time(&self) -> f64;

    /// Schedule a buffer to begin playing at `start_secs` on the device
    /// clock. Buffers are guaranteed by the caller not to overlap.
    fn schedule(&mut self, id: BufferId, samples: Vec<f32>, start_secs: f64) -> Result<()>;

    /// Stop and discard every scheduled or playing buffer.
    fn cancel_all(&mut self) -> Result<()>;
}

/// A buffer the scheduler has handed to the sink and not yet seen finish.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledBuffer {
    pub id: BufferId,
    /// Scheduled start on the device clock, seconds
    pub start: f64,
    /// Buffer length in seconds
    pub duration: f64,
}

impl ScheduledBuffer {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Gapless playback scheduler for inbound audio fragments.
///
/// Keeps a single monotonically advancing "next available start time":
/// each fragment is scheduled at `max(next_start, device_now)` and the
/// clock then advances by the fragment's duration, so back-to-back
/// fragments play without gaps and never overlap. An interruption stops
/// everything pending and resets the clock to the device's current time.
pub struct PlaybackScheduler {
    sink: Box<dyn PlaybackSink>,
    sample_rate: u32,
    next_start: f64,
    active: Vec<ScheduledBuffer>,
    next_id: BufferId,
}

impl PlaybackScheduler {
    pub fn new(sink: Box<dyn PlaybackSink>, sample_rate: u32) -> Self {
        let next_start = sink.current_time();
        Self {
            sink,
            sample_rate,
            next_start,
            active: Vec::new(),
            next_id: 0,
        }
    }

    /// Schedule a decoded fragment for playback.
    ///
    /// Returns the start time the fragment was scheduled at.
    pub fn enqueue(&mut self, samples: Vec<f32>) -> Result<f64> {
        self.prune_finished();

        let now = self.sink.current_time();
        if self.next_start < now {
            self.next_start = now;
        }

        let duration = samples.len() as f64 / self.sample_rate as f64;
        let start = self.next_start;

        let id = self.next_id;
        self.next_id += 1;

        self.sink.schedule(id, samples, start)?;
        self.active.push(ScheduledBuffer {
            id,
            start,
            duration,
        });
        self.next_start += duration;

        debug!(
            "Scheduled fragment {} at {:.3}s ({:.3}s long, {} pending)",
            id,
            start,
            duration,
            self.active.len()
        );

        Ok(start)
    }

    /// Hard-cancel all pending playback.
    ///
    /// The remote side barged in over the user: every scheduled buffer is
    /// stopped and the clock resets to the device's current time.
    pub fn interrupt(&mut self) -> Result<()> {
        let cancelled = self.active.len();
        self.sink.cancel_all()?;
        self.active.clear();
        self.next_start = self.sink.current_time();

        debug!("Interrupted playback, cancelled {} buffers", cancelled);
        Ok(())
    }

    /// Stop playback and release the sink. Used on session teardown.
    pub fn shutdown(&mut self) -> Result<()> {
        self.sink.cancel_all()?;
        self.active.clear();
        Ok(())
    }

    /// Number of buffers scheduled and not yet finished.
    pub fn pending(&mut self) -> usize {
        self.prune_finished();
        self.active.len()
    }

    /// The end of currently scheduled audio on the device clock.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }

    fn prune_finished(&mut self) {
        let now = self.sink.current_time();
        self.active.retain(|buffer| buffer.end() > now);
    }
}
