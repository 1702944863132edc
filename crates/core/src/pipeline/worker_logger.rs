use std::collections::HashMap;
use std::time::Instant;

/// Observer for worker loop events.
///
/// Keeps the loop free of any particular output mechanism. Nothing here may
/// write to stdout, which carries the protocol.
pub trait WorkerLogger: Send {
    /// A frame's record has been emitted.
    fn frame_done(&mut self, sequence: u64, hands: usize);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Add to a named event counter (e.g. decode failures).
    fn count(&mut self, name: &str, amount: u64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-stream summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events. Used by tests.
pub struct NullWorkerLogger;

impl WorkerLogger for NullWorkerLogger {
    fn frame_done(&mut self, _sequence: u64, _hands: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn count(&mut self, _name: &str, _amount: u64) {}
    fn info(&mut self, _message: &str) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct StageTiming {
    samples: u64,
    total_ms: f64,
}

/// Logger backed by the `log` crate.
///
/// Aggregates per-stage timings and counters in constant memory so the
/// process can run indefinitely, logs progress every `throttle_frames`
/// frames at debug level, and reports a summary when the stream ends.
pub struct LogWorkerLogger {
    throttle_frames: u64,
    timings: HashMap<String, StageTiming>,
    counters: HashMap<String, u64>,
    start_time: Instant,
    frames: u64,
    hands: u64,
}

impl LogWorkerLogger {
    pub fn new(throttle_frames: u64) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            counters: HashMap::new(),
            start_time: Instant::now(),
            frames: 0,
            hands: 0,
        }
    }

    /// Returns the formatted summary string, or `None` if no frame was seen.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 && self.timings.is_empty() && self.counters.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let frames = self.frames;
        let mut lines = Vec::new();

        lines.push(format!(
            "Worker summary ({frames} frames, {} hands, {:.1}s total):",
            self.hands,
            elapsed_ms / 1000.0
        ));

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let t = self.timings[stage];
            let avg_ms = if t.samples == 0 {
                0.0
            } else {
                t.total_ms / t.samples as f64
            };
            let total_ms = t.total_ms;
            lines.push(format!(
                "  {stage:8}: avg {avg_ms:6.1}ms  total {total_ms:7.0}ms"
            ));
        }

        let mut names: Vec<_> = self.counters.keys().collect();
        names.sort();
        for name in names {
            lines.push(format!("  {name}: {}", self.counters[name]));
        }

        if frames > 0 && elapsed_ms > 0.0 {
            let fps = frames as f64 / (elapsed_ms / 1000.0);
            lines.push(format!("  Throughput: {fps:.1} fps"));
        }

        Some(lines.join("\n"))
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    /// `(samples, average_ms)` for a stage.
    pub fn timing_for(&self, stage: &str) -> Option<(u64, f64)> {
        self.timings.get(stage).map(|t| {
            let avg = if t.samples == 0 {
                0.0
            } else {
                t.total_ms / t.samples as f64
            };
            (t.samples, avg)
        })
    }
}

impl Default for LogWorkerLogger {
    fn default() -> Self {
        Self::new(100)
    }
}

impl WorkerLogger for LogWorkerLogger {
    fn frame_done(&mut self, sequence: u64, hands: usize) {
        self.frames += 1;
        self.hands += hands as u64;
        if self.frames % self.throttle_frames == 0 {
            log::debug!("Processed {} frames (last #{sequence}, {hands} hands)", self.frames);
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        let entry = self.timings.entry(stage.to_string()).or_default();
        entry.samples += 1;
        entry.total_ms += duration_ms;
    }

    fn count(&mut self, name: &str, amount: u64) {
        *self.counters.entry(name.to_string()).or_default() += amount;
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
