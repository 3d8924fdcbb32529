//! Fixed-window text chunker with overlap.
//!
//! Splits file content into windows of `chunk_size` characters, each
//! starting `chunk_size - overlap` characters after the previous one.
//! Downstream indexing depends on these exact boundaries, so the output is
//! a pure function of `(text, chunk_size, overlap)`.
//!
//! # Algorithm
//!
//! 1. `step = chunk_size - overlap`.
//! 2. Emit `text[i .. i + chunk_size]` for `i = 0, step, 2·step, …`.
//! 3. Stop after the first window whose end reaches or passes the end of
//!    the text. That window may be short; it is never padded or split.
//! 4. Empty text produces no chunks.
//!
//! Offsets are counted in `char`s, so a window never cuts through a
//! multi-byte UTF-8 sequence.
//!
//! # Example
//!
//! ```rust
//! use ragdoll_core::chunk::Chunker;
//!
//! let chunker = Chunker::new(4, 2).unwrap();
//! assert_eq!(chunker.chunk("abcdefghij"), vec!["abcd", "cdef", "efgh", "ghij"]);
//! ```

use crate::error::{Error, Result};

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when `chunk_size == 0` or `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::config("chunk_size must be a positive integer"));
        }
        if overlap >= chunk_size {
            return Err(Error::config(format!(
                "overlap ({}) must be less than chunk_size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into overlapping windows.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }

        // Byte offset of every char, plus the end of the string.
        let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let char_len = offsets.len();
        offsets.push(text.len());

        let step = self.chunk_size - self.overlap;
        let mut chunks = Vec::with_capacity(char_len / step + 1);
        let mut start = 0;

        loop {
            let end = start + self.chunk_size;
            let byte_end = offsets[end.min(char_len)];
            chunks.push(text[offsets[start]..byte_end].to_string());

            if end >= char_len {
                break;
            }
            start += step;
        }

        chunks
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            chunk_size: 8192,
            overlap: 2000,
        }
    }
}
