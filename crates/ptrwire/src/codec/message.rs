//! Message framing.
//!
//! A message is one or more segments. The first word of segment 0 is the
//! root pointer. On a stream, segments are preceded by a table:
//!
//! ```text
//! u32 segment_count - 1
//! u32 segment_size_in_words * segment_count
//! padding to a word boundary
//! segment bytes...
//! ```

use tracing::debug;

use crate::codec::blob::{Blob, FromBlob, ReadOptions};
use crate::codec::primitives::{Reader, Writer};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{BYTES_PER_WORD, MAX_SEGMENTS};

/// A received message borrowing its segments.
#[derive(Debug, Clone)]
pub struct Message<'a> {
    segments: Vec<&'a [u8]>,
    options: ReadOptions,
}

impl<'a> Message<'a> {
    /// Wraps a single segment whose first word is the root pointer.
    pub fn from_segment(segment: &'a [u8]) -> Result<Self, DecodeError> {
        if segment.len() < BYTES_PER_WORD {
            return Err(DecodeError::OutOfBounds {
                offset: 0,
                len: BYTES_PER_WORD,
                size: segment.len(),
            });
        }
        Ok(Self {
            segments: vec![segment],
            options: ReadOptions::default(),
        })
    }

    /// Parses a framed stream: segment table followed by segment data.
    pub fn from_stream(bytes: &'a [u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader::new(bytes);

        let count = reader.read_u32("segment count")? as usize + 1;
        if count > MAX_SEGMENTS {
            return Err(DecodeError::InvalidSegmentTable {
                context: "too many segments",
            });
        }

        let mut sizes = Vec::with_capacity(count);
        for _ in 0..count {
            sizes.push(reader.read_u32("segment size")? as usize);
        }
        reader.align_to_word("segment table padding")?;

        let mut segments = Vec::with_capacity(count);
        for words in sizes {
            let len = words
                .checked_mul(BYTES_PER_WORD)
                .ok_or(DecodeError::InvalidSegmentTable {
                    context: "segment size overflows",
                })?;
            if len > reader.remaining_len() {
                return Err(DecodeError::InvalidSegmentTable {
                    context: "segment exceeds input",
                });
            }
            segments.push(reader.read_bytes(len, "segment")?);
        }

        if segments[0].len() < BYTES_PER_WORD {
            return Err(DecodeError::InvalidSegmentTable {
                context: "first segment has no root pointer",
            });
        }

        debug!(
            segments = segments.len(),
            bytes = reader.position(),
            trailing = reader.remaining_len(),
            "parsed message frame"
        );

        Ok(Self {
            segments,
            options: ReadOptions::default(),
        })
    }

    /// Replaces the read options used by blobs from this message.
    pub fn with_options(mut self, options: ReadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> Option<&'a [u8]> {
        self.segments.get(index).copied()
    }

    /// Blob over segment 0 rooted at the root pointer word.
    pub fn root(&self) -> Blob<'a> {
        Blob::with_options(self.segments[0], 0, self.options)
    }

    /// Dereferences the root pointer as `T`.
    pub fn root_struct<T: FromBlob<'a>>(&self) -> Result<Option<T>, DecodeError> {
        self.root().read_struct(0)
    }
}

/// Frames single-segment message bytes for a stream.
///
/// A segment that is not a whole number of words is zero padded, and the
/// table records the padded size.
pub fn frame_segment(segment: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let words = segment.len().div_ceil(BYTES_PER_WORD);
    let size = u32::try_from(words).map_err(|_| EncodeError::LengthExceedsLimit {
        field: "segment words",
        len: words,
        max: u32::MAX as usize,
    })?;

    let mut writer = Writer::with_capacity(BYTES_PER_WORD + words * BYTES_PER_WORD);
    writer.write_u32(0);
    writer.write_u32(size);
    writer.pad_to_word();
    writer.write_bytes(segment);
    writer.pad_to_word();
    Ok(writer.into_bytes())
}
