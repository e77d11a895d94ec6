use std::collections::HashMap;
use std::time::Instant;

/// Cross-cutting observer for analysis runs.
///
/// Keeps the use case independent of where progress, timings and per-call
/// failures end up (log output, a UI, or nowhere in tests).
pub trait PipelineLogger: Send {
    /// Report frame-level progress. `total` is 0 when the frame count is
    /// unknown.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long one call of a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a remote call that failed and was skipped.
    fn failure(&mut self, stage: &str, message: &str);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn failure(&mut self, _stage: &str, _message: &str) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: forwards to the `log` crate and keeps per-stage call timings
/// and failure counts for an end-of-run summary.
///
/// Progress lines are throttled to every `throttle_frames` frames.
pub struct StdoutPipelineLogger {
    throttle_frames: usize,
    timings: HashMap<String, Vec<f64>>,
    failures: HashMap<String, usize>,
    start_time: Instant,
    frames_seen: usize,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_frames: usize) -> Self {
        Self {
            throttle_frames: throttle_frames.max(1),
            timings: HashMap::new(),
            failures: HashMap::new(),
            start_time: Instant::now(),
            frames_seen: 0,
        }
    }

    /// Returns the formatted summary, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.failures.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Analysis summary ({} frames, {elapsed_s:.1}s total):",
            self.frames_seen
        )];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let total_ms: f64 = durations.iter().sum();
            let avg_ms = total_ms / durations.len() as f64;
            lines.push(format!(
                "  {stage:16}: {:4} calls  avg {avg_ms:7.1}ms  total {total_ms:8.0}ms",
                durations.len()
            ));
        }

        let mut failed: Vec<_> = self.failures.iter().collect();
        failed.sort();
        for (stage, count) in failed {
            lines.push(format!("  {stage} failures: {count}"));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn failures_for(&self, stage: &str) -> usize {
        self.failures.get(stage).copied().unwrap_or(0)
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(25)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.frames_seen = current;
        if current % self.throttle_frames != 0 && current != total {
            return;
        }
        if total > 0 {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Analyzed {current}/{total} frames ({pct:.1}%)");
        } else {
            log::info!("Analyzed {current} frames");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn failure(&mut self, stage: &str, message: &str) {
        *self.failures.entry(stage.to_string()).or_default() += 1;
        log::warn!("{stage} call failed: {message}");
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
