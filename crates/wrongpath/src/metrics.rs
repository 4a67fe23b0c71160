//! Metrics collection and reporting using metrics-rs.
//!
//! Run statistics are recorded through the `metrics` facade. With `--metrics`
//! the CLI installs [`CliRecorder`], which keeps everything in memory and
//! prints a summary when the process exits.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{
    Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit, counter,
    describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use parking_lot::RwLock;

use crate::RunResult;

// ============================================================================
// Metric descriptions
// ============================================================================

/// Initialize metric descriptions.
///
/// Call this once at startup to register metric descriptions.
pub fn init() {
    describe_counter!(
        "wrongpath_guest_instructions_total",
        Unit::Count,
        "Correct-path guest instructions retired"
    );
    describe_counter!(
        "wrongpath_observed_instructions_total",
        Unit::Count,
        "Instructions observed on either path"
    );
    describe_counter!(
        "wrongpath_speculations_total",
        Unit::Count,
        "Branches redirected onto their wrong path"
    );
    describe_counter!(
        "wrongpath_rollbacks_total",
        Unit::Count,
        "Checkpoints restored"
    );
    describe_counter!(
        "wrongpath_checkpoint_overwrites_total",
        Unit::Count,
        "Speculations that replaced a live checkpoint"
    );
    describe_counter!(
        "wrongpath_wrong_path_instructions_total",
        Unit::Count,
        "Instructions executed on the wrong path"
    );
    describe_counter!(
        "wrongpath_squashed_instructions_total",
        Unit::Count,
        "Wrong-path instructions turned into no-ops"
    );

    describe_gauge!(
        "wrongpath_execution_time_seconds",
        Unit::Seconds,
        "Execution wall-clock time"
    );
    describe_gauge!(
        "wrongpath_guest_speed_mips",
        Unit::Count,
        "Observed instruction speed in MIPS"
    );

    describe_histogram!(
        "wrongpath_run_duration_seconds",
        Unit::Seconds,
        "Execution duration distribution"
    );
}

// ============================================================================
// Metric recording functions
// ============================================================================

/// Record execution metrics after a run, labelled by resolution threshold.
pub fn record_run(threshold: u32, result: &RunResult) {
    let labels = [("threshold", threshold.to_string())];
    let stats = &result.stats;

    counter!("wrongpath_guest_instructions_total", &labels).absolute(result.instret);
    counter!("wrongpath_observed_instructions_total", &labels).absolute(result.observed);
    counter!("wrongpath_speculations_total", &labels).absolute(stats.speculations);
    counter!("wrongpath_rollbacks_total", &labels).absolute(stats.rollbacks);
    counter!("wrongpath_checkpoint_overwrites_total", &labels).absolute(stats.overwrites);
    counter!("wrongpath_wrong_path_instructions_total", &labels)
        .absolute(stats.wrong_path_instructions);
    counter!("wrongpath_squashed_instructions_total", &labels).absolute(stats.squashed);

    gauge!("wrongpath_execution_time_seconds", &labels).set(result.time_secs);
    gauge!("wrongpath_guest_speed_mips", &labels).set(result.mips());
    histogram!("wrongpath_run_duration_seconds", &labels).record(result.time_secs);
}

// ============================================================================
// CLI Recorder for terminal output
// ============================================================================

#[derive(Default)]
struct CounterStorage {
    values: RwLock<HashMap<String, u64>>,
}

#[derive(Default)]
struct GaugeStorage {
    values: RwLock<HashMap<String, f64>>,
}

#[derive(Default)]
struct HistogramStorage {
    values: RwLock<HashMap<String, Vec<f64>>>,
}

struct CliCounter {
    key: String,
    storage: Arc<CounterStorage>,
}

impl metrics::CounterFn for CliCounter {
    fn increment(&self, value: u64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

struct CliGauge {
    key: String,
    storage: Arc<GaugeStorage>,
}

impl metrics::GaugeFn for CliGauge {
    fn increment(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        let mut values = self.storage.values.write();
        *values.entry(self.key.clone()).or_insert(0.0) -= value;
    }

    fn set(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.insert(self.key.clone(), value);
    }
}

struct CliHistogram {
    key: String,
    storage: Arc<HistogramStorage>,
}

impl metrics::HistogramFn for CliHistogram {
    fn record(&self, value: f64) {
        let mut values = self.storage.values.write();
        values.entry(self.key.clone()).or_default().push(value);
    }
}

/// Recorder that keeps metrics in memory for a terminal summary.
#[derive(Default)]
pub struct CliRecorder {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle sharing this recorder's storage.
    pub fn handle(&self) -> CliRecorderHandle {
        CliRecorderHandle {
            counters: Arc::clone(&self.counters),
            gauges: Arc::clone(&self.gauges),
            histograms: Arc::clone(&self.histograms),
        }
    }

    /// Install this recorder as the global metrics recorder.
    ///
    /// Returns `None` if a global recorder is already installed.
    pub fn install(self) -> Option<CliRecorderHandle> {
        let handle = self.handle();
        metrics::set_global_recorder(self).ok()?;
        Some(handle)
    }
}

fn key_to_string(key: &Key) -> String {
    let name = key.name();
    let labels = key.labels();
    if labels.len() == 0 {
        name.to_string()
    } else {
        let label_str: Vec<String> = labels
            .map(|l| format!("{}={}", l.key(), l.value()))
            .collect();
        format!("{}{{{}}}", name, label_str.join(","))
    }
}

impl Recorder for CliRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(CliCounter {
            key: key_to_string(key),
            storage: Arc::clone(&self.counters),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(CliGauge {
            key: key_to_string(key),
            storage: Arc::clone(&self.gauges),
        }))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(CliHistogram {
            key: key_to_string(key),
            storage: Arc::clone(&self.histograms),
        }))
    }
}

/// Access to metrics recorded by a [`CliRecorder`].
pub struct CliRecorderHandle {
    counters: Arc<CounterStorage>,
    gauges: Arc<GaugeStorage>,
    histograms: Arc<HistogramStorage>,
}

impl CliRecorderHandle {
    pub fn get_counter(&self, key: &str) -> Option<u64> {
        self.counters.values.read().get(key).copied()
    }

    pub fn get_gauge(&self, key: &str) -> Option<f64> {
        self.gauges.values.read().get(key).copied()
    }

    /// Print all collected metrics to stderr.
    ///
    /// Stdout may carry the instruction trace, so the summary stays off it.
    pub fn print_summary(&self) {
        let counters = self.counters.values.read();
        let gauges = self.gauges.values.read();
        let histograms = self.histograms.values.read();

        if counters.is_empty() && gauges.is_empty() && histograms.is_empty() {
            eprintln!("No metrics collected.");
            return;
        }

        eprintln!();
        eprintln!("## Metrics Summary");
        eprintln!();

        if !counters.is_empty() {
            eprintln!("### Counters");
            let mut keys: Vec<_> = counters.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(value) = counters.get(key) {
                    eprintln!("  {key}: {value}");
                }
            }
            eprintln!();
        }

        if !gauges.is_empty() {
            eprintln!("### Gauges");
            let mut keys: Vec<_> = gauges.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(value) = gauges.get(key) {
                    eprintln!("  {key}: {value:.6}");
                }
            }
            eprintln!();
        }

        if !histograms.is_empty() {
            eprintln!("### Histograms");
            let mut keys: Vec<_> = histograms.keys().collect();
            keys.sort();
            for key in keys {
                if let Some(values) = histograms.get(key)
                    && !values.is_empty()
                {
                    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let avg = values.iter().sum::<f64>() / values.len() as f64;
                    eprintln!(
                        "  {key}: count={}, min={min:.6}, max={max:.6}, avg={avg:.6}",
                        values.len()
                    );
                }
            }
            eprintln!();
        }
    }
}
