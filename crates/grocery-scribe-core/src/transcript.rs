//! Transcript accumulation for one capture session.
//!
//! Finalized segments only grow; interim text is replaced wholesale on each
//! recognition update. The externally visible transcript is always
//! `finalized + interim`.

/// Accumulates finalized and interim recognition output.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    finalized: String,
    interim: String,
}

impl TranscriptBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a finalized segment in arrival order.
    ///
    /// No truncation, no deduplication. The provider will not revise
    /// finalized text, so this only ever grows within a session.
    pub fn append_final(&mut self, text: &str) {
        self.finalized.push_str(text);
    }

    /// Replace the provisional interim text wholesale (last write wins).
    pub fn set_interim(&mut self, text: &str) {
        self.interim.clear();
        self.interim.push_str(text);
    }

    /// The full transcript at call time: `finalized + interim`.
    pub fn snapshot(&self) -> String {
        let mut full = String::with_capacity(self.finalized.len() + self.interim.len());
        full.push_str(&self.finalized);
        full.push_str(&self.interim);
        full
    }

    /// Clear both fields.
    ///
    /// Called at the start of every recording cycle, never mid-cycle.
    pub fn reset(&mut self) {
        self.finalized.clear();
        self.interim.clear();
    }

    /// True when the snapshot contains no non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.finalized.trim().is_empty() && self.interim.trim().is_empty()
    }
}
