use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Keeps counter values in memory so tests can assert on names and labels.
/// Install with `metrics::with_local_recorder`.
#[derive(Default)]
pub struct CapturingRecorder {
    counters: Mutex<Vec<(Key, Arc<AtomicU64>)>>,
}

impl CapturingRecorder {
    /// Label sets of every counter registered under `name`.
    pub fn counter_labels(&self, name: &str) -> Vec<Vec<(String, String)>> {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.name() == name)
            .map(|(key, _)| {
                key.labels()
                    .map(|label| (label.key().to_string(), label.value().to_string()))
                    .collect()
            })
            .collect()
    }

    /// Sum of `name` across all label sets.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| key.name() == name)
            .map(|(_, value)| value.load(Ordering::Acquire))
            .sum()
    }
}

impl Recorder for CapturingRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        let mut counters = self.counters.lock().unwrap();
        let value = match counters.iter().find(|(existing, _)| existing == key) {
            Some((_, value)) => value.clone(),
            None => {
                let value = Arc::new(AtomicU64::new(0));
                counters.push((key.clone(), value.clone()));
                value
            }
        };
        Counter::from_arc(value)
    }

    fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}
