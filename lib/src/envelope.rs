//! Parser for the binary update envelope served by the status service.
//!
//! Layout, as transmitted:
//!
//! | bytes | field | endianness |
//! |-------|-------|------------|
//! | 2 | magic, always `0xFF00` | big |
//! | 1 | header length, including the magic | - |
//! | 2 | wakeup hint | big |
//! | 1 | image count | - |
//! | header length - 6 | padding | - |
//! | 4 * image count | absolute segment offsets | little |
//!
//! Each segment runs up to the next listed offset, the last one to the end
//! of the envelope. Parsing only computes boundaries; segment bytes are
//! borrowed from the input when needed. A well-formed envelope also places
//! the first segment directly after the index, which
//! [`Envelope::check_contiguous`] verifies before anything is decrypted.

use bytes::Buf;
use log::debug;
use thiserror::Error;

pub const MAGIC: u16 = 0xFF00;

/// Smallest header that carries every field we read.
pub const MIN_HEADER_LENGTH: u8 = 6;

const OFFSET_SIZE: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("invalid header: expected magic 0xFF00, found {found:?}")]
    InvalidHeader { found: Option<u16> },
    #[error("unsupported header length {header_length} (minimum {MIN_HEADER_LENGTH})")]
    UnsupportedVersion { header_length: u8 },
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(#[from] Malformation),
}

/// Structural problems found after the header has been accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Malformation {
    #[error("header length {header_length} exceeds envelope length {len}")]
    HeaderOverrun { header_length: usize, len: usize },
    #[error("index of {image_count} offsets ends at {end}, past envelope length {len}")]
    IndexOverrun {
        image_count: u8,
        end: usize,
        len: usize,
    },
    #[error("segment {index} starts at {actual}, expected {expected}")]
    Misaligned {
        index: usize,
        expected: usize,
        actual: usize,
    },
    #[error("segment {index} offset {offset} does not follow previous offset {previous}")]
    NotIncreasing {
        index: usize,
        previous: usize,
        offset: usize,
    },
    #[error("segment {index} offset {offset} is past envelope length {len}")]
    OutOfBounds {
        index: usize,
        offset: usize,
        len: usize,
    },
}

/// Byte range of one encrypted image within an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub offset: usize,
    pub len: usize,
}

impl Segment {
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Borrow this segment's bytes out of the envelope it was parsed from.
    pub fn bytes<'a>(&self, envelope: &'a [u8]) -> &'a [u8] {
        &envelope[self.offset..self.end()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub header_length: u8,
    /// Seconds until the service expects the device to check back. Informational.
    pub wakeup_hint: u16,
    /// First byte past the offset index, where segment data should begin.
    pub data_start: usize,
    pub segments: Vec<Segment>,
}

impl Envelope {
    pub fn parse(data: &[u8]) -> Result<Self, EnvelopeError> {
        let len = data.len();
        let mut cursor = data;

        if cursor.remaining() < 2 {
            return Err(EnvelopeError::InvalidHeader { found: None });
        }
        let magic = cursor.get_u16();
        if magic != MAGIC {
            return Err(EnvelopeError::InvalidHeader { found: Some(magic) });
        }
        if cursor.remaining() < (MIN_HEADER_LENGTH as usize - 2) {
            return Err(EnvelopeError::InvalidHeader { found: Some(magic) });
        }

        let header_length = cursor.get_u8();
        debug!("header length: {header_length}");
        if header_length < MIN_HEADER_LENGTH {
            return Err(EnvelopeError::UnsupportedVersion { header_length });
        }

        let wakeup_hint = cursor.get_u16();
        debug!("wakeup hint: {wakeup_hint}");
        let image_count = cursor.get_u8();
        debug!("image count: {image_count}");

        let padding = (header_length - MIN_HEADER_LENGTH) as usize;
        if cursor.remaining() < padding {
            return Err(Malformation::HeaderOverrun {
                header_length: header_length as usize,
                len,
            }
            .into());
        }
        cursor.advance(padding);

        let index_end = header_length as usize + image_count as usize * OFFSET_SIZE;
        if index_end > len {
            return Err(Malformation::IndexOverrun {
                image_count,
                end: index_end,
                len,
            }
            .into());
        }

        let offsets: Vec<usize> = (0..image_count)
            .map(|_| cursor.get_u32_le() as usize)
            .collect();
        debug!("offsets: {offsets:?}");

        let segments = segments_from_offsets(&offsets, len)?;
        Ok(Envelope {
            header_length,
            wakeup_hint,
            data_start: index_end,
            segments,
        })
    }

    pub fn image_count(&self) -> usize {
        self.segments.len()
    }

    /// Check that the segments tile the envelope from the end of the index
    /// onwards, i.e. that a reader walking the stream meets each segment
    /// exactly where the index says it starts.
    pub fn check_contiguous(&self) -> Result<(), Malformation> {
        let mut position = self.data_start;
        for (index, segment) in self.segments.iter().enumerate() {
            if segment.offset != position {
                return Err(Malformation::Misaligned {
                    index,
                    expected: position,
                    actual: segment.offset,
                });
            }
            position = segment.end();
        }
        Ok(())
    }
}

/// Turn absolute start offsets into segments, the last one ending at `len`.
fn segments_from_offsets(offsets: &[usize], len: usize) -> Result<Vec<Segment>, Malformation> {
    let mut segments = Vec::with_capacity(offsets.len());
    for (index, &offset) in offsets.iter().enumerate() {
        if let Some(previous) = segments.last().map(|s: &Segment| s.offset)
            && offset <= previous
        {
            return Err(Malformation::NotIncreasing {
                index,
                previous,
                offset,
            });
        }
        if offset > len {
            return Err(Malformation::OutOfBounds { index, offset, len });
        }
        let end = offsets.get(index + 1).copied().unwrap_or(len).clamp(offset, len);
        segments.push(Segment {
            offset,
            len: end - offset,
        });
    }
    Ok(segments)
}

/// Lay out an envelope the way the service does: header, zero padding up to
/// `header_length`, the offset index, then each segment back to back. Used to
/// build fixtures; the device itself never encodes.
///
/// Panics if `header_length` is below [`MIN_HEADER_LENGTH`] or there are more
/// than 255 segments.
pub fn encode<S: AsRef<[u8]>>(header_length: u8, wakeup_hint: u16, segments: &[S]) -> Vec<u8> {
    assert!(header_length >= MIN_HEADER_LENGTH, "header too short");
    let image_count = u8::try_from(segments.len()).expect("at most 255 segments");

    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.push(header_length);
    out.extend_from_slice(&wakeup_hint.to_be_bytes());
    out.push(image_count);
    out.resize(header_length as usize, 0);

    let mut offset = header_length as usize + segments.len() * OFFSET_SIZE;
    for segment in segments {
        out.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += segment.as_ref().len();
    }
    for segment in segments {
        out.extend_from_slice(segment.as_ref());
    }
    out
}
