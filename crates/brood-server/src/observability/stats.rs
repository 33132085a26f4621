//! Per-method call statistics
//!
//! Workers export cumulative method counters with their metric snapshots.
//! The tracker keeps an hour of periodic samples and derives windowed
//! statistics (trailing minute, trailing hour, all time) for the status
//! report, keyed by component and method.

use brood_api::status::{MethodCallStats, MethodStats};
use brood_api::telemetry::{metric_names, MetricSnapshot};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct MethodCounters {
    calls: f64,
    latency_ms: f64,
    bytes_recv: f64,
    bytes_sent: f64,
}

type MethodKey = (String, String); // (component, method)

struct Sample {
    at: Instant,
    counters: BTreeMap<MethodKey, MethodCounters>,
}

/// Aggregates worker method counters into windowed statistics.
pub struct StatsTracker {
    samples: Mutex<VecDeque<Sample>>,
}

impl StatsTracker {
    pub fn new() -> Self {
        StatsTracker {
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// Fold a round of metric snapshots into the sample history.
    pub fn observe(&self, snapshots: &[MetricSnapshot]) {
        self.observe_at(Instant::now(), snapshots);
    }

    fn observe_at(&self, at: Instant, snapshots: &[MetricSnapshot]) {
        let mut counters: BTreeMap<MethodKey, MethodCounters> = BTreeMap::new();
        for snap in snapshots {
            let (Some(component), Some(method)) =
                (snap.labels.get("component"), snap.labels.get("method"))
            else {
                continue;
            };
            let entry = counters
                .entry((component.clone(), method.clone()))
                .or_default();
            match snap.name.as_str() {
                metric_names::METHOD_COUNT => entry.calls += snap.value,
                metric_names::METHOD_LATENCY_MS => entry.latency_ms += snap.value,
                metric_names::METHOD_BYTES_RECV => entry.bytes_recv += snap.value,
                metric_names::METHOD_BYTES_SENT => entry.bytes_sent += snap.value,
                _ => {}
            }
        }
        if counters.is_empty() {
            return;
        }

        let mut samples = self.lock();
        samples.push_back(Sample { at, counters });
        // Keep one sample at or beyond the hour horizon as the hour
        // baseline.
        while samples.len() >= 2 && at.duration_since(samples[1].at) >= HOUR {
            samples.pop_front();
        }
    }

    /// Windowed statistics per component, methods sorted by name.
    pub fn method_stats(&self) -> BTreeMap<String, Vec<MethodStats>> {
        self.method_stats_at(Instant::now())
    }

    fn method_stats_at(&self, now: Instant) -> BTreeMap<String, Vec<MethodStats>> {
        let samples = self.lock();
        let Some(latest) = samples.back() else {
            return BTreeMap::new();
        };
        let first = samples.front().expect("non-empty sample history");

        let baseline = |window: Duration| -> &Sample {
            // Newest sample at least `window` old; the oldest one when the
            // tracker is younger than the window.
            samples
                .iter()
                .rev()
                .find(|s| now.duration_since(s.at) >= window)
                .unwrap_or(first)
        };
        let minute_base = baseline(MINUTE);
        let hour_base = baseline(HOUR);

        let mut out: BTreeMap<String, Vec<MethodStats>> = BTreeMap::new();
        for (key, total_counters) in &latest.counters {
            let (component, method) = key;
            let stats = MethodStats {
                name: method.clone(),
                minute: window_stats(
                    *total_counters,
                    minute_base.counters.get(key).copied().unwrap_or_default(),
                    now.duration_since(minute_base.at),
                ),
                hour: window_stats(
                    *total_counters,
                    hour_base.counters.get(key).copied().unwrap_or_default(),
                    now.duration_since(hour_base.at),
                ),
                total: window_stats(
                    *total_counters,
                    MethodCounters::default(),
                    now.duration_since(first.at),
                ),
            };
            out.entry(component.clone()).or_default().push(stats);
        }
        out
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Sample>> {
        self.samples.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn window_stats(latest: MethodCounters, baseline: MethodCounters, elapsed: Duration) -> MethodCallStats {
    let calls = (latest.calls - baseline.calls).max(0.0);
    let latency_ms = (latest.latency_ms - baseline.latency_ms).max(0.0);
    let bytes_recv = (latest.bytes_recv - baseline.bytes_recv).max(0.0);
    let bytes_sent = (latest.bytes_sent - baseline.bytes_sent).max(0.0);
    let secs = elapsed.as_secs_f64().max(1.0);
    MethodCallStats {
        num_calls: calls,
        avg_latency_ms: if calls > 0.0 { latency_ms / calls } else { 0.0 },
        recv_kb_per_sec: bytes_recv / 1024.0 / secs,
        sent_kb_per_sec: bytes_sent / 1024.0 / secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Labels;

    fn snapshot(name: &str, component: &str, method: &str, value: f64) -> MetricSnapshot {
        let labels = Labels::from([
            ("component".to_string(), component.to_string()),
            ("method".to_string(), method.to_string()),
        ]);
        MetricSnapshot::counter(name, labels, value)
    }

    fn round(component: &str, method: &str, calls: f64, latency: f64, sent: f64) -> Vec<MetricSnapshot> {
        vec![
            snapshot(metric_names::METHOD_COUNT, component, method, calls),
            snapshot(metric_names::METHOD_LATENCY_MS, component, method, latency),
            snapshot(metric_names::METHOD_BYTES_SENT, component, method, sent),
        ]
    }

    #[test]
    fn test_empty_tracker_reports_nothing() {
        let tracker = StatsTracker::new();
        assert!(tracker.method_stats().is_empty());
    }

    #[test]
    fn test_snapshots_without_method_labels_are_ignored() {
        let tracker = StatsTracker::new();
        tracker.observe(&[MetricSnapshot::counter("other", Labels::new(), 5.0)]);
        assert!(tracker.method_stats().is_empty());
    }

    #[test]
    fn test_minute_window_uses_oldest_sample_when_young() {
        let tracker = StatsTracker::new();
        let t0 = Instant::now();
        tracker.observe_at(t0, &round("A", "Get", 10.0, 100.0, 0.0));
        tracker.observe_at(t0 + Duration::from_secs(30), &round("A", "Get", 40.0, 400.0, 0.0));

        let stats = tracker.method_stats_at(t0 + Duration::from_secs(30));
        let get = &stats["A"][0];
        assert_eq!(get.name, "Get");
        // Tracker is younger than a minute: window is since the first
        // sample, so the delta is 40 - 10.
        assert_eq!(get.minute.num_calls, 30.0);
        assert_eq!(get.minute.avg_latency_ms, 10.0);
        // Total reflects the cumulative counter.
        assert_eq!(get.total.num_calls, 40.0);
        assert_eq!(get.total.avg_latency_ms, 10.0);
    }

    #[test]
    fn test_minute_window_picks_newest_old_enough_sample() {
        let tracker = StatsTracker::new();
        let t0 = Instant::now();
        for (offset, calls) in [(0u64, 10.0), (60, 20.0), (90, 50.0), (120, 80.0)] {
            tracker.observe_at(t0 + Duration::from_secs(offset), &round("A", "Get", calls, 0.0, 0.0));
        }
        let stats = tracker.method_stats_at(t0 + Duration::from_secs(121));
        let get = &stats["A"][0];
        // now - 60s = t0+61; the newest sample at least a minute old is
        // the one at t0+60 with 20 calls.
        assert_eq!(get.minute.num_calls, 60.0);
        assert_eq!(get.total.num_calls, 80.0);
    }

    #[test]
    fn test_sent_rate_is_kb_per_second() {
        let tracker = StatsTracker::new();
        let t0 = Instant::now();
        tracker.observe_at(t0, &round("A", "Put", 1.0, 0.0, 0.0));
        tracker.observe_at(t0 + Duration::from_secs(100), &round("A", "Put", 2.0, 0.0, 204_800.0));

        let stats = tracker.method_stats_at(t0 + Duration::from_secs(100));
        let put = &stats["A"][0];
        // 200 KiB over 100 seconds.
        assert!((put.minute.sent_kb_per_sec - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_methods_grouped_by_component() {
        let tracker = StatsTracker::new();
        let t0 = Instant::now();
        let mut snaps = round("A", "Get", 1.0, 0.0, 0.0);
        snaps.extend(round("A", "Put", 2.0, 0.0, 0.0));
        snaps.extend(round("B", "Get", 3.0, 0.0, 0.0));
        tracker.observe_at(t0, &snaps);

        let stats = tracker.method_stats_at(t0 + Duration::from_secs(1));
        assert_eq!(stats["A"].len(), 2);
        assert_eq!(stats["A"][0].name, "Get");
        assert_eq!(stats["A"][1].name, "Put");
        assert_eq!(stats["B"].len(), 1);
    }

    #[test]
    fn test_history_is_bounded_to_an_hour() {
        let tracker = StatsTracker::new();
        let t0 = Instant::now();
        for i in 0..120u64 {
            tracker.observe_at(
                t0 + Duration::from_secs(i * 60),
                &round("A", "Get", i as f64, 0.0, 0.0),
            );
        }
        // Everything older than an hour before the newest sample is gone,
        // except the baseline sample itself.
        assert!(tracker.lock().len() <= 62);
    }
}
