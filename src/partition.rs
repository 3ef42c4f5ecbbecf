use std::ops::Range;

/// Static split of `total` units into `workers` equal, contiguous spans.
///
/// Each span has `total / workers` units. The remainder of the integer
/// division is not assigned to any worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    total: usize,
    workers: usize,
}

impl Partition {
    /// # Panics
    /// If `workers` is zero.
    #[must_use]
    pub fn new(total: usize, workers: usize) -> Self {
        assert!(workers > 0, "cannot partition work across zero workers");
        Self { total, workers }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    #[must_use]
    pub fn span_len(&self) -> usize {
        self.total / self.workers
    }

    /// Units that are not covered by any span.
    #[must_use]
    pub fn remainder(&self) -> usize {
        self.total % self.workers
    }

    pub fn spans(&self) -> impl Iterator<Item = Range<usize>> {
        let len = self.span_len();
        (0..self.workers).map(move |worker| worker * len..(worker + 1) * len)
    }

    /// Disjoint mutable views of `items`, one per worker.
    ///
    /// # Panics
    /// If `items` is shorter than the partitioned range.
    pub fn split_mut<'a, T>(&self, items: &'a mut [T]) -> Vec<&'a mut [T]> {
        let len = self.span_len();
        if len == 0 {
            return (0..self.workers).map(|_| Default::default()).collect();
        }
        items[..len * self.workers].chunks_exact_mut(len).collect()
    }

    /// Shared views of `items`, one per worker.
    ///
    /// # Panics
    /// If `items` is shorter than the partitioned range.
    pub fn split<'a, T>(&self, items: &'a [T]) -> Vec<&'a [T]> {
        let len = self.span_len();
        if len == 0 {
            return vec![&[][..]; self.workers];
        }
        items[..len * self.workers].chunks_exact(len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Partition;

    #[test]
    fn test_spans_are_disjoint_and_equal() {
        for total in [0, 1, 7, 256, 1000, 1 << 20] {
            for workers in 1..=9 {
                let partition = Partition::new(total, workers);
                let spans: Vec<_> = partition.spans().collect();
                assert_eq!(spans.len(), workers);
                assert!(spans.iter().all(|span| span.len() == total / workers));
                assert!(spans.windows(2).all(|w| w[0].end <= w[1].start));

                let covered: usize = spans.iter().map(std::ops::Range::len).sum();
                assert!(covered <= total);
                assert_eq!(total - covered, partition.remainder());
                assert!(partition.remainder() < workers);
            }
        }
    }

    #[test]
    fn test_split_mut() {
        let mut data: Vec<u32> = (0..10).collect();
        let partition = Partition::new(data.len(), 3);
        let parts = partition.split_mut(&mut data);
        assert_eq!(parts.len(), 3);
        similar_asserts::assert_eq!(
            have: parts.iter().map(|p| p.to_vec()).collect::<Vec<_>>(),
            want: vec![vec![0, 1, 2], vec![3, 4, 5], vec![6, 7, 8]],
        );
        for part in parts {
            part.fill(0);
        }
        // the remainder is untouched
        assert_eq!(data, vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 9]);
    }

    #[test]
    fn test_split_more_workers_than_items() {
        let data = [1u8, 2];
        let parts = Partition::new(data.len(), 4).split(&data);
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|part| part.is_empty()));
    }

    #[test]
    #[should_panic(expected = "zero workers")]
    fn test_zero_workers() {
        let _ = Partition::new(10, 0);
    }
}
