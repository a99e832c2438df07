/// One FASTQ read. The four line buffers are allocated once and refilled from
/// the stream each iteration; trimming moves the logical `[start, end)` window
/// over the sequence/quality buffers instead of copying or reallocating.
///
/// Invariant: the sequence and quality windows always have equal length. The
/// reader enforces equal buffer lengths at ingestion and every window
/// operation applies to both.
#[derive(Debug, Default)]
pub struct Record {
    pub header: Vec<u8>,
    pub comment: Vec<u8>,
    seq_buf: Vec<u8>,
    qual_buf: Vec<u8>,
    start: usize,
    end: usize,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current read length.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Sequence bases inside the current trim window.
    pub fn seq(&self) -> &[u8] {
        &self.seq_buf[self.start..self.end]
    }

    /// Quality scores inside the current trim window.
    pub fn qual(&self) -> &[u8] {
        &self.qual_buf[self.start..self.end]
    }

    /// Raw line buffers in FASTQ order, for the reader to refill.
    pub(crate) fn buffers_mut(
        &mut self,
    ) -> (&mut Vec<u8>, &mut Vec<u8>, &mut Vec<u8>, &mut Vec<u8>) {
        (
            &mut self.header,
            &mut self.seq_buf,
            &mut self.comment,
            &mut self.qual_buf,
        )
    }

    /// Resets the trim window to cover the whole sequence after a refill.
    pub(crate) fn reset_window(&mut self) {
        self.start = 0;
        self.end = self.seq_buf.len();
    }

    /// Keep only the first `new_len` bases. O(1), offsets only.
    pub fn truncate(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.len());
        self.end = self.start + new_len;
    }

    /// Keep `[from, to)` of the current window. `to < from` empties the read.
    pub fn keep_window(&mut self, from: usize, to: usize) {
        debug_assert!(from <= self.len() && to <= self.len());
        let base = self.start;
        self.start = base + from;
        self.end = (base + to).max(self.start);
    }

    /// Empty sequence and quality, keeping header and comment so the read can
    /// still be written out under --keep-empty.
    pub fn clear_seq(&mut self) {
        self.end = self.start;
    }
}
