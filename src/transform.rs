//! Payload transform hook
//!
//! Encode/decode stages applied to each chunk before it is stored and after
//! it is read back. An archive holds an ordered chain of stages: encode runs
//! them first to last, decode runs them last to first. An empty chain stores
//! bytes unchanged.
//!
//! Block counts are computed from the raw source length, so the chain as a
//! whole must return exactly as many bytes as it was given. The archive
//! rejects a chunk whose length changes with
//! [`ArchiveError::BadBlock`](crate::ArchiveError).

use std::sync::Arc;

use bytes::Bytes;

/// Stage between the chunker and the block codec
pub trait PayloadTransform: Send + Sync {
    /// Applied to a chunk before it is written
    fn encode(&self, chunk: Bytes) -> Bytes;

    /// Applied to a payload after it is read
    fn decode(&self, payload: Bytes) -> Bytes;
}

/// Ordered stages, shared the same way observers are
#[derive(Clone, Default)]
pub struct TransformChain {
    stages: Vec<Arc<dyn PayloadTransform>>,
}

impl TransformChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; it encodes after every stage already present
    pub fn push(&mut self, stage: Arc<dyn PayloadTransform>) {
        self.stages.push(stage);
    }

    pub fn clear(&mut self) {
        self.stages.clear();
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl PayloadTransform for TransformChain {
    fn encode(&self, chunk: Bytes) -> Bytes {
        self.stages
            .iter()
            .fold(chunk, |bytes, stage| stage.encode(bytes))
    }

    fn decode(&self, payload: Bytes) -> Bytes {
        self.stages
            .iter()
            .rev()
            .fold(payload, |bytes, stage| stage.decode(bytes))
    }
}
