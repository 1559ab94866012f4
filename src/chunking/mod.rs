//! Fixed-size text windowing for embedding and retrieval.
//!
//! Texts are split into windows of `chunk_size` characters where each window
//! after the first repeats the last `overlap` characters of its predecessor.

use crate::error::{AalimError, Result};
use serde::{Deserialize, Serialize};

/// A bounded-length window of a source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content of this window.
    pub text: String,
    /// Position of this window within its parent text.
    pub index: usize,
}

/// Splits text into overlapping fixed-size windows.
///
/// Sizes are measured in `char`s so multi-byte scripts are never cut inside a
/// code point.
#[derive(Debug, Clone, Copy)]
pub struct TextSplitter {
    chunk_size: usize,
    overlap: usize,
}

impl TextSplitter {
    /// Create a splitter. Fails unless `0 <= overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AalimError::Config("chunk_size must be greater than zero".to_string()));
        }
        if overlap >= chunk_size {
            return Err(AalimError::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into windows. Empty text yields no chunks.
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        // Byte offset of every char boundary, plus the end of the string.
        let boundaries: Vec<usize> = text
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(text.len()))
            .collect();
        let char_count = boundaries.len() - 1;

        let mut chunks = Vec::new();
        if char_count == 0 {
            return chunks;
        }

        let step = self.chunk_size - self.overlap;
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(char_count);
            chunks.push(Chunk {
                text: text[boundaries[start]..boundaries[end]].to_string(),
                index: chunks.len(),
            });
            if end == char_count {
                break;
            }
            start += step;
        }

        chunks
    }

    /// Number of chunks `split` produces for a text of `char_count` chars.
    pub fn expected_chunks(&self, char_count: usize) -> usize {
        if char_count == 0 {
            return 0;
        }
        if char_count <= self.chunk_size {
            return 1;
        }
        let step = self.chunk_size - self.overlap;
        (char_count - self.overlap).div_ceil(step)
    }
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}
