use std::collections::HashMap;
use std::time::Instant;

use parking_lot::Mutex;

/// A monotonically non-decreasing float counter.
#[derive(Debug, Clone)]
struct CounterState {
    value: f64,
}

/// An arbitrary, settable float.
#[derive(Debug, Clone)]
struct GaugeState {
    value: f64,
}

/// Fixed bucket boundaries with cumulative per-bucket counts (§4.3).
#[derive(Debug, Clone)]
struct HistogramState {
    buckets: Vec<f64>,
    cumulative_counts: Vec<u64>,
    count: u64,
    sum: f64,
}

impl HistogramState {
    fn new(mut buckets: Vec<f64>) -> Self {
        buckets.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = buckets.len();
        Self {
            buckets,
            cumulative_counts: vec![0; n],
            count: 0,
            sum: 0.0,
        }
    }

    fn observe(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        for (boundary, bucket_count) in self.buckets.iter().zip(self.cumulative_counts.iter_mut())
        {
            if v <= *boundary {
                *bucket_count += 1;
            }
        }
    }
}

#[derive(Debug, Clone)]
enum MetricState {
    Counter(CounterState),
    Gauge(GaugeState),
    Histogram(HistogramState),
}

struct Entry {
    help: String,
    state: MetricState,
    last_updated: Instant,
}

/// In-memory registry of counters, gauges, and histograms (§4.3).
///
/// Operations against an unregistered name, or against a name registered
/// as a different kind, are silent no-ops — "never panic, never
/// auto-create" — a small hand-rolled exposition registry rather than
/// pulling in the `prometheus` crate for something this size.
#[derive(Default)]
pub struct MetricsSink {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_counter(&self, name: &str, help: &str) {
        self.entries.lock().entry(name.to_string()).or_insert(Entry {
            help: help.to_string(),
            state: MetricState::Counter(CounterState { value: 0.0 }),
            last_updated: Instant::now(),
        });
    }

    pub fn register_gauge(&self, name: &str, help: &str) {
        self.entries.lock().entry(name.to_string()).or_insert(Entry {
            help: help.to_string(),
            state: MetricState::Gauge(GaugeState { value: 0.0 }),
            last_updated: Instant::now(),
        });
    }

    pub fn register_histogram(&self, name: &str, help: &str, buckets: Vec<f64>) {
        self.entries.lock().entry(name.to_string()).or_insert(Entry {
            help: help.to_string(),
            state: MetricState::Histogram(HistogramState::new(buckets)),
            last_updated: Instant::now(),
        });
    }

    pub fn increment(&self, name: &str, delta: f64) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(name) {
            if let MetricState::Counter(c) = &mut entry.state {
                c.value += delta.max(0.0);
                entry.last_updated = Instant::now();
            }
        }
    }

    pub fn set(&self, name: &str, value: f64) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(name) {
            if let MetricState::Gauge(g) = &mut entry.state {
                g.value = value;
                entry.last_updated = Instant::now();
            }
        }
    }

    pub fn observe(&self, name: &str, value: f64) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(name) {
            if let MetricState::Histogram(h) = &mut entry.state {
                h.observe(value);
                entry.last_updated = Instant::now();
            }
        }
    }

    pub fn counter_value(&self, name: &str) -> Option<f64> {
        let entries = self.entries.lock();
        match &entries.get(name)?.state {
            MetricState::Counter(c) => Some(c.value),
            _ => None,
        }
    }

    pub fn gauge_value(&self, name: &str) -> Option<f64> {
        let entries = self.entries.lock();
        match &entries.get(name)?.state {
            MetricState::Gauge(g) => Some(g.value),
            _ => None,
        }
    }

    pub fn histogram_count(&self, name: &str) -> Option<u64> {
        let entries = self.entries.lock();
        match &entries.get(name)?.state {
            MetricState::Histogram(h) => Some(h.count),
            _ => None,
        }
    }

    /// Renders the Prometheus 0.0.4 text exposition format (§4.3, §6).
    pub fn export_text(&self) -> String {
        let entries = self.entries.lock();
        let mut names: Vec<&String> = entries.keys().collect();
        names.sort();
        let mut out = String::new();
        for name in names {
            let entry = &entries[name];
            match &entry.state {
                MetricState::Counter(c) => {
                    out.push_str(&format!("# HELP {name} {}\n", entry.help));
                    out.push_str(&format!("# TYPE {name} counter\n"));
                    out.push_str(&format!("{name} {}\n", format_float(c.value)));
                }
                MetricState::Gauge(g) => {
                    out.push_str(&format!("# HELP {name} {}\n", entry.help));
                    out.push_str(&format!("# TYPE {name} gauge\n"));
                    out.push_str(&format!("{name} {}\n", format_float(g.value)));
                }
                MetricState::Histogram(h) => {
                    out.push_str(&format!("# HELP {name} {}\n", entry.help));
                    out.push_str(&format!("# TYPE {name} histogram\n"));
                    for (boundary, count) in h.buckets.iter().zip(h.cumulative_counts.iter()) {
                        out.push_str(&format!(
                            "{name}_bucket{{le=\"{}\"}} {}\n",
                            format_float(*boundary),
                            count
                        ));
                    }
                    out.push_str(&format!("{name}_bucket{{le=\"+Inf\"}} {}\n", h.count));
                    out.push_str(&format!("{name}_count {}\n", h.count));
                    out.push_str(&format!("{name}_sum {}\n", format_float(h.sum)));
                }
            }
        }
        out
    }
}

fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_metric_operations_are_silent_no_ops() {
        let sink = MetricsSink::new();
        sink.increment("unknown_counter", 1.0);
        assert_eq!(sink.counter_value("unknown_counter"), None);
    }

    #[test]
    fn wrong_typed_operation_is_silent_no_op() {
        let sink = MetricsSink::new();
        sink.register_gauge("g", "a gauge");
        sink.increment("g", 1.0); // increment on a gauge: no-op
        assert_eq!(sink.gauge_value("g"), Some(0.0));
    }

    #[test]
    fn histogram_bucket_counts_are_monotonic_across_buckets() {
        let sink = MetricsSink::new();
        sink.register_histogram("h", "a histogram", vec![1.0, 5.0, 10.0]);
        sink.observe("h", 3.0);
        sink.observe("h", 7.0);
        let text = sink.export_text();
        assert!(text.contains("h_bucket{le=\"1\"} 0"));
        assert!(text.contains("h_bucket{le=\"5\"} 1"));
        assert!(text.contains("h_bucket{le=\"10\"} 2"));
        assert!(text.contains("h_bucket{le=\"+Inf\"} 2"));
        assert!(text.contains("h_count 2"));
    }

    #[test]
    fn export_contains_help_and_type_lines() {
        let sink = MetricsSink::new();
        sink.register_counter("c", "a counter");
        sink.increment("c", 3.0);
        let text = sink.export_text();
        assert!(text.contains("# HELP c a counter"));
        assert!(text.contains("# TYPE c counter"));
        assert!(text.contains("c 3"));
    }
}
