//! In-memory metrics for file discovery.
//!
//! Counters and summaries are plain atomics/mutex-guarded state; rendering
//! to the Prometheus text format is left to [`render_text`].

pub mod timestamps;

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub use timestamps::{FileTimestamps, GaugeSample, RegistrationId, TimestampRegistry};

pub const SCAN_DURATION_METRIC: &str = "filesd_scan_duration_seconds";
pub const READ_ERRORS_METRIC: &str = "filesd_read_errors_total";
pub const FILE_MTIME_METRIC: &str = "filesd_file_mtime_seconds";

/// Quantiles reported by the scan-duration summary.
pub const SUMMARY_QUANTILES: [f64; 3] = [0.5, 0.9, 0.99];

/// Observations kept for quantile estimation.
const SUMMARY_WINDOW: usize = 1024;

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    #[inline]
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
struct SummaryState {
    count: u64,
    sum: f64,
    window: VecDeque<f64>,
}

/// Count, sum and sliding-window quantiles of observed values.
#[derive(Debug, Default)]
pub struct Summary {
    state: Mutex<SummaryState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummarySnapshot {
    pub count: u64,
    pub sum: f64,
    /// `(quantile, value)` pairs; values are NaN before the first observation.
    pub quantiles: Vec<(f64, f64)>,
}

impl Summary {
    pub fn observe(&self, value: f64) {
        let mut state = self.lock();
        state.count += 1;
        state.sum += value;
        if state.window.len() == SUMMARY_WINDOW {
            state.window.pop_front();
        }
        state.window.push_back(value);
    }

    pub fn snapshot(&self) -> SummarySnapshot {
        let (count, sum, mut values) = {
            let state = self.lock();
            (
                state.count,
                state.sum,
                state.window.iter().copied().collect::<Vec<_>>(),
            )
        };
        values.sort_by(|a, b| a.total_cmp(b));

        let quantiles = SUMMARY_QUANTILES
            .iter()
            .map(|&q| (q, quantile(&values, q)))
            .collect();

        SummarySnapshot {
            count,
            sum,
            quantiles,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SummaryState> {
        match self.state.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Nearest-rank quantile of sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// Metrics produced by the reconciliation engine. Shared by every discovery
/// instance it is handed to.
#[derive(Debug, Default)]
pub struct DiscoveryMetrics {
    /// Duration of each refresh scan, in seconds.
    pub scan_duration: Summary,
    /// Files that failed to read or decode.
    pub read_errors: Counter,
}

impl DiscoveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe_scan(&self, elapsed: Duration) {
        self.scan_duration.observe(elapsed.as_secs_f64());
    }
}

/// Renders all discovery metrics in the Prometheus text exposition format.
pub fn render_text(metrics: &DiscoveryMetrics, registry: &TimestampRegistry) -> String {
    let mut out = String::new();

    let summary = metrics.scan_duration.snapshot();
    let _ = writeln!(
        out,
        "# HELP {SCAN_DURATION_METRIC} The duration of the file discovery scan in seconds."
    );
    let _ = writeln!(out, "# TYPE {SCAN_DURATION_METRIC} summary");
    for (q, value) in &summary.quantiles {
        let _ = writeln!(
            out,
            "{SCAN_DURATION_METRIC}{{quantile=\"{q}\"}} {}",
            format_value(*value)
        );
    }
    let _ = writeln!(
        out,
        "{SCAN_DURATION_METRIC}_sum {}",
        format_value(summary.sum)
    );
    let _ = writeln!(out, "{SCAN_DURATION_METRIC}_count {}", summary.count);

    let _ = writeln!(
        out,
        "# HELP {READ_ERRORS_METRIC} The number of file discovery read errors."
    );
    let _ = writeln!(out, "# TYPE {READ_ERRORS_METRIC} counter");
    let _ = writeln!(out, "{READ_ERRORS_METRIC} {}", metrics.read_errors.get());

    let _ = writeln!(
        out,
        "# HELP {FILE_MTIME_METRIC} Timestamp (mtime) of files read by file discovery. Timestamp is set at read time."
    );
    let _ = writeln!(out, "# TYPE {FILE_MTIME_METRIC} gauge");
    for sample in registry.collect() {
        let _ = writeln!(
            out,
            "{FILE_MTIME_METRIC}{{filename=\"{}\"}} {}",
            escape_label_value(&sample.filename),
            format_value(sample.value)
        );
    }

    out
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}

fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
