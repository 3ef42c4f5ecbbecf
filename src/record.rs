use crate::format::size_label;
use serde::Serialize;
use std::time::Duration;

const MIB: f64 = 1024.0 * 1024.0;

/// One measured data point of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepPoint {
    /// Position of the point in its sweep.
    pub index: usize,
    /// Bytes touched by one iteration of the whole batch (all workers).
    pub size: usize,
    pub iterations: u64,
    pub elapsed: Duration,
    /// Throughput in MiB/s.
    pub throughput: f64,
    /// Wall time per iteration in nanoseconds.
    pub latency_ns: u64,
    pub label: String,
}

/// Throughput in MiB/s for moving `bytes` per iteration `iterations` times.
///
/// The caller guarantees `iterations >= 1` and a non-zero `elapsed`.
#[must_use]
pub fn throughput(bytes: usize, iterations: u64, elapsed: Duration) -> f64 {
    bytes as f64 * iterations as f64 / MIB / elapsed.as_secs_f64()
}

#[must_use]
pub fn latency_ns(iterations: u64, elapsed: Duration) -> u64 {
    (elapsed.as_secs_f64() * 1e9 / iterations as f64) as u64
}

/// Values of several series that share one set of size labels.
///
/// The series are kept in insertion order, which is also the order in which
/// they are handed to an exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMatrix<K> {
    labels: Vec<String>,
    series: Vec<(K, Vec<f64>)>,
}

impl<K> Default for ResultMatrix<K> {
    fn default() -> Self {
        Self {
            labels: Vec::new(),
            series: Vec::new(),
        }
    }
}

impl<K> ResultMatrix<K>
where
    K: Copy + PartialEq,
{
    #[must_use]
    pub fn new(keys: impl IntoIterator<Item = K>) -> Self {
        Self {
            labels: Vec::new(),
            series: keys.into_iter().map(|key| (key, Vec::new())).collect(),
        }
    }

    /// Store `value` for `key` at sweep position `index` and set the shared
    /// label of that position.
    ///
    /// Unknown keys are appended as a new series.
    ///
    /// # Panics
    /// If `index` skips positions of the series or the labels.
    pub fn set(&mut self, key: K, index: usize, value: f64, label: String) {
        let pos = match self.series.iter().position(|(k, _)| *k == key) {
            Some(pos) => pos,
            None => {
                self.series.push((key, Vec::new()));
                self.series.len() - 1
            }
        };
        set_at(&mut self.series[pos].1, index, value);
        set_at(&mut self.labels, index, label);
    }

    #[must_use]
    pub fn series(&self, key: K) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, values)| values.as_slice())
    }
}

impl<K> ResultMatrix<K> {
    #[must_use]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.series.iter().map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &[f64])> + '_ {
        self.series
            .iter()
            .map(|(key, values)| (key, values.as_slice()))
    }

    /// Number of sweep positions with a label.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn set_at<T>(values: &mut Vec<T>, index: usize, value: T) {
    assert!(
        index <= values.len(),
        "sweep index {index} skips positions (have {})",
        values.len()
    );
    if index == values.len() {
        values.push(value);
    } else {
        values[index] = value;
    }
}

/// Compute throughput and latency of a finished batch and store it.
///
/// `size` is the number of bytes touched by one iteration across all workers.
pub fn record<K>(
    results: &mut ResultMatrix<K>,
    key: K,
    index: usize,
    size: usize,
    iterations: u64,
    elapsed: Duration,
) -> SweepPoint
where
    K: Copy + PartialEq,
{
    let throughput = throughput(size, iterations, elapsed);
    let latency_ns = latency_ns(iterations, elapsed);
    let label = size_label(size);
    results.set(key, index, throughput, label.clone());

    log::info!(
        "Size = {}, Speed = {:.2}MB/s, Time = {:.6}s, Single Time = {}ns, iterations = {}",
        label,
        throughput,
        elapsed.as_secs_f64(),
        latency_ns,
        iterations
    );
    SweepPoint {
        index,
        size,
        iterations,
        elapsed,
        throughput,
        latency_ns,
        label,
    }
}

#[cfg(test)]
mod tests {
    use super::{record, ResultMatrix};
    use std::time::Duration;

    #[test]
    fn test_throughput() {
        // 1 MiB moved 10 times in one second
        let mib_per_sec = super::throughput(1024 * 1024, 10, Duration::from_secs(1));
        approx::assert_abs_diff_eq!(mib_per_sec, 10.0, epsilon = 1e-12);

        let mib_per_sec = super::throughput(512, 4096, Duration::from_millis(500));
        approx::assert_abs_diff_eq!(mib_per_sec, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_latency() {
        assert_eq!(super::latency_ns(1000, Duration::from_millis(1)), 1000);
        assert_eq!(super::latency_ns(3, Duration::from_nanos(10)), 3);
    }

    #[test]
    fn test_record_stores_value_and_label() {
        let mut results = ResultMatrix::new(["read", "write"]);
        let point = record(
            &mut results,
            "write",
            0,
            2048,
            1024,
            Duration::from_secs(2),
        );
        assert_eq!(point.label, "2KB");
        assert_eq!(point.index, 0);
        approx::assert_abs_diff_eq!(point.throughput, 1.0, epsilon = 1e-12);

        assert_eq!(results.labels(), ["2KB".to_string()]);
        assert_eq!(results.series("write"), Some([point.throughput].as_slice()));
        assert_eq!(results.series("read"), Some([].as_slice()));
        assert_eq!(results.series("copy"), None);
    }

    #[test]
    fn test_result_matrix_keeps_series_order() {
        let mut results = ResultMatrix::default();
        results.set('b', 0, 1.0, "256B".to_string());
        results.set('a', 0, 2.0, "256B".to_string());
        results.set('b', 1, 3.0, "512B".to_string());
        // overwrite in place
        results.set('b', 1, 4.0, "512B".to_string());

        assert_eq!(results.keys().copied().collect::<Vec<_>>(), vec!['b', 'a']);
        assert_eq!(results.series('b'), Some([1.0, 4.0].as_slice()));
        assert_eq!(results.len(), 2);
    }

    #[test]
    #[should_panic(expected = "skips positions")]
    fn test_result_matrix_rejects_gaps() {
        let mut results = ResultMatrix::new([0]);
        results.set(0, 1, 1.0, "256B".to_string());
    }
}
