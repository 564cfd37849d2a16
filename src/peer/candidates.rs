use crate::protocol::CandidatePayload;

/// Ordered queue of remote candidates received before the session's remote
/// description is set.
///
/// The buffer is drained exactly once, in FIFO arrival order, at the moment
/// the remote description becomes available. Candidates arriving after that
/// point are applied directly and never pass through here.
#[derive(Debug, Default)]
pub struct CandidateBuffer {
    queued: Vec<CandidatePayload>,
    drained: bool,
}

impl CandidateBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: CandidatePayload) {
        self.queued.push(candidate);
    }

    /// Returns and empties the queue. Subsequent calls return nothing.
    pub fn drain_in_order(&mut self) -> Vec<CandidatePayload> {
        self.drained = true;
        std::mem::take(&mut self.queued)
    }

    pub fn is_drained(&self) -> bool {
        self.drained
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}
