//! Run-length coding of packed 2-bit pixel data.
//!
//! Every byte below [`ESCAPE`] is a literal. [`ESCAPE`] introduces a run: the
//! next byte is a repeat count and the one after it is the value to repeat.
//! A literal `0xFF` can only be expressed as a run of length one.

pub const ESCAPE: u8 = 0xFF;

/// Result of expanding one image's worth of run-length data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Exactly the requested number of bytes was produced.
    Complete(Vec<u8>),
    /// The input ran out first. Carries whatever was produced up to that point.
    Truncated(Vec<u8>),
}

impl Decoded {
    pub fn is_complete(&self) -> bool {
        matches!(self, Decoded::Complete(_))
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Decoded::Complete(bytes) | Decoded::Truncated(bytes) => bytes,
        }
    }
}

/// Expand `input` until `expected_len` bytes have been produced. Input left
/// over after that point is ignored, and a run that would overshoot is cut
/// short.
pub fn decode(input: &[u8], expected_len: usize) -> Decoded {
    let mut output = Vec::with_capacity(expected_len);
    let mut bytes = input.iter().copied();

    while output.len() < expected_len {
        let Some(value) = bytes.next() else {
            return Decoded::Truncated(output);
        };
        if value != ESCAPE {
            output.push(value);
            continue;
        }
        let (Some(count), Some(repeated)) = (bytes.next(), bytes.next()) else {
            return Decoded::Truncated(output);
        };
        let count = (count as usize).min(expected_len - output.len());
        output.resize(output.len() + count, repeated);
    }

    Decoded::Complete(output)
}

/// Compress packed pixel data into the format [`decode`] reads. Runs of three
/// or more, and every `0xFF`, are written as escapes.
pub fn encode(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        let value = input[i];
        let run = input[i..]
            .iter()
            .take(u8::MAX as usize)
            .take_while(|&&b| b == value)
            .count();
        if run >= 3 || value == ESCAPE {
            output.extend_from_slice(&[ESCAPE, run as u8, value]);
        } else {
            output.extend(std::iter::repeat_n(value, run));
        }
        i += run;
    }
    output
}
