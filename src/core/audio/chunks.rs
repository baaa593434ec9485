//! Reassembly of chunked synthesized audio.
//!
//! Long responses arrive as a run of `audio_chunk` frames followed by either
//! an `is_final` marker on the last chunk or a separate `audio_complete`
//! trailer. Each chunk is base64-decoded on arrival (payloads are padded
//! per chunk, so the strings cannot be concatenated and decoded in one go)
//! and the raw bytes are stitched together for playback.

use tracing::warn;

use crate::core::stream::messages::AudioChunkMessage;

/// Outcome of feeding one chunk to the assembler.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkProgress {
    /// More chunks are expected.
    Accumulating { received: u32, expected: u32 },
    /// The utterance is complete; `audio` holds the stitched bytes.
    Complete { audio: Vec<u8>, total: u32 },
}

/// Accumulates one utterance's audio chunks. Resets itself when an utterance
/// completes, ready for the next one on the same connection.
#[derive(Debug, Default)]
pub struct ChunkAssembler {
    expected: u32,
    received: u32,
    buffer: Vec<u8>,
}

impl ChunkAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk. A chunk whose payload fails to decode is dropped with
    /// a warning; the utterance still completes with the bytes that survived.
    pub fn push(&mut self, chunk: &AudioChunkMessage) -> ChunkProgress {
        // Servers may refine the total while streaming; trust the latest.
        self.expected = chunk.total_chunks;
        self.received += 1;

        match chunk.decode() {
            Some(Ok(bytes)) => self.buffer.extend_from_slice(&bytes),
            Some(Err(e)) => {
                warn!(
                    chunk_index = chunk.chunk_index,
                    error = %e,
                    "Dropping audio chunk with undecodable payload"
                );
            }
            None => {}
        }

        if chunk.is_final {
            ChunkProgress::Complete { audio: self.take(), total: self.reset_counters() }
        } else {
            ChunkProgress::Accumulating { received: self.received, expected: self.expected }
        }
    }

    /// Flush whatever has accumulated. Used when the server announces the end
    /// of an utterance out of band instead of flagging the last chunk.
    /// Returns `None` when nothing is pending (the final chunk already
    /// flushed, or no chunks arrived at all).
    pub fn finish(&mut self) -> Option<(Vec<u8>, u32)> {
        if self.buffer.is_empty() && self.received == 0 {
            return None;
        }
        let audio = self.take();
        let total = self.reset_counters();
        if audio.is_empty() { None } else { Some((audio, total)) }
    }

    /// Discard any partially assembled utterance.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.reset_counters();
    }

    /// True while an utterance is partially assembled.
    pub fn is_active(&self) -> bool {
        self.received > 0 || !self.buffer.is_empty()
    }

    fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    fn reset_counters(&mut self) -> u32 {
        let total = self.received;
        self.received = 0;
        self.expected = 0;
        total
    }
}
