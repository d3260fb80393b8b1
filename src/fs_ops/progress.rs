//! Transfer progress reporting.
//!
//! The copier reports once per buffer write, synchronously on the copying
//! thread. Sinks must return quickly: any blocking work inside `report`
//! stalls the copy.

use serde::Serialize;

/// Snapshot of a running copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferProgress {
    /// Bytes planned for the whole operation.
    pub total_bytes: u64,
    /// Bytes written so far.
    pub copied_bytes: u64,
    /// Name of the file being transferred.
    pub current_file: String,
}

impl TransferProgress {
    /// Completed share in percent; 0 for an empty source, never above 100.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        (self.copied_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0)
    }
}

/// Receiver of progress snapshots.
pub trait ProgressSink {
    fn report(&mut self, progress: &TransferProgress);
}

impl<F> ProgressSink for F
where
    F: FnMut(&TransferProgress),
{
    fn report(&mut self, progress: &TransferProgress) {
        self(progress)
    }
}

/// Sink that drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _progress: &TransferProgress) {}
}

/// Running byte counter shared by all files of one copy.
pub(super) struct ProgressTracker<'a> {
    total: u64,
    copied: u64,
    sink: &'a mut dyn ProgressSink,
}

impl<'a> ProgressTracker<'a> {
    pub(super) fn new(total: u64, sink: &'a mut dyn ProgressSink) -> Self {
        Self { total, copied: 0, sink }
    }

    pub(super) fn advance(&mut self, bytes: u64, current_file: &str) {
        self.copied = self.copied.saturating_add(bytes);
        self.sink.report(&TransferProgress {
            total_bytes: self.total,
            copied_bytes: self.copied,
            current_file: current_file.to_string(),
        });
    }

    pub(super) fn copied(&self) -> u64 {
        self.copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(total: u64, copied: u64) -> TransferProgress {
        TransferProgress { total_bytes: total, copied_bytes: copied, current_file: "f".into() }
    }

    #[test]
    fn percentage_of_empty_source_is_zero() {
        assert_eq!(snap(0, 0).percentage(), 0.0);
    }

    #[test]
    fn percentage_saturates_at_hundred() {
        assert_eq!(snap(10, 5).percentage(), 50.0);
        // source grew while copying
        assert_eq!(snap(10, 25).percentage(), 100.0);
    }

    #[test]
    fn tracker_accumulates_and_reports() {
        let mut seen = Vec::new();
        let mut sink = |p: &TransferProgress| seen.push(p.copied_bytes);
        let mut t = ProgressTracker::new(30, &mut sink);
        t.advance(10, "a");
        t.advance(20, "b");
        assert_eq!(t.copied(), 30);
        drop(t);
        assert_eq!(seen, vec![10, 30]);
    }
}
