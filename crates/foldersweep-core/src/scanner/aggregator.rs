/// Batches per-folder results so the consumer gets a handful of updates
/// per scan instead of one per subfolder.
use crate::model::SizeResult;
use tracing::warn;

/// Smallest batch size, regardless of scan size.
pub const MIN_BATCH: usize = 5;

/// A batch is flushed roughly every `1 / BATCH_DIVISOR` of the scan (5 %).
pub const BATCH_DIVISOR: usize = 20;

/// Flush threshold for a scan of `total` folders: `max(5, total / 20)`.
pub fn batch_threshold(total: usize) -> usize {
    (total / BATCH_DIVISOR).max(MIN_BATCH)
}

#[derive(Debug)]
pub struct ResultAggregator {
    total: usize,
    threshold: usize,
    buffer: Vec<SizeResult>,
    seen: Vec<bool>,
    completed: usize,
}

impl ResultAggregator {
    pub fn new(total: usize) -> Self {
        let threshold = batch_threshold(total);
        Self {
            total,
            threshold,
            buffer: Vec::with_capacity(threshold),
            seen: vec![false; total],
            completed: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Distinct indices received so far.
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Buffer a result; returns a batch once the threshold is reached.
    ///
    /// A second result for an index already seen replaces the buffered
    /// one if it has not been flushed yet (last write wins) and never
    /// bumps `completed` again.
    pub fn push(&mut self, result: SizeResult) -> Option<Vec<SizeResult>> {
        let Some(seen) = self.seen.get_mut(result.index) else {
            warn!(
                "Ignoring result for index {} outside 0..{}",
                result.index, self.total
            );
            return None;
        };

        if *seen {
            match self.buffer.iter_mut().find(|r| r.index == result.index) {
                Some(slot) => *slot = result,
                None => self.buffer.push(result),
            }
        } else {
            *seen = true;
            self.completed += 1;
            self.buffer.push(result);
        }

        if self.buffer.len() >= self.threshold {
            Some(self.take_buffer())
        } else {
            None
        }
    }

    /// Flush everything still buffered. Call once the scan has ended.
    pub fn finish(&mut self) -> Vec<SizeResult> {
        self.take_buffer()
    }

    fn take_buffer(&mut self) -> Vec<SizeResult> {
        std::mem::replace(&mut self.buffer, Vec::with_capacity(self.threshold))
    }
}
