//! Turns a fetched envelope into the list of images to show.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::{Envelope, EnvelopeError};
use crate::identity::DeviceIdentity;
use crate::rle::{self, Decoded};
use crate::seal::{self, SealError};
use crate::{DecodedImage, Geometry};

/// What to do with an image whose run-length data ends before every pixel is covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncatedImagePolicy {
    /// Drop the image, the same as if it had failed to decrypt.
    #[default]
    Reject,
    /// Keep the image and fill the missing pixels with white.
    Pad,
}

/// A problem with one image. The other images in the update are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("image {index} failed to decrypt: {source}")]
    DecryptionFailed { index: usize, source: SealError },
    #[error("image {index} decoded to {actual} of {expected} bytes")]
    DecodeTruncated {
        index: usize,
        expected: usize,
        actual: usize,
    },
}

impl ImageError {
    pub fn index(&self) -> usize {
        match self {
            ImageError::DecryptionFailed { index, .. }
            | ImageError::DecodeTruncated { index, .. } => *index,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpdateError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error("update contains no images")]
    Empty,
    #[error("none of the {} images in the update could be decoded", .failures.len())]
    NoUsableImages { failures: Vec<ImageError> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub wakeup_hint: u16,
    /// Successfully decoded images, in envelope order.
    pub images: Vec<DecodedImage>,
    /// Images that were left out, and why.
    pub skipped: Vec<ImageError>,
}

/// Parse, decrypt and decompress every image in `data`.
///
/// A structurally broken envelope fails the whole update. Individual images
/// that fail are skipped and reported in [`Update::skipped`]; the update only
/// fails if that leaves nothing to show.
pub fn decode_update(
    data: &[u8],
    identity: &DeviceIdentity,
    geometry: Geometry,
    policy: TruncatedImagePolicy,
) -> Result<Update, UpdateError> {
    let envelope = Envelope::parse(data)?;
    envelope
        .check_contiguous()
        .map_err(EnvelopeError::MalformedEnvelope)?;
    if envelope.image_count() == 0 {
        return Err(UpdateError::Empty);
    }

    let mut images = Vec::with_capacity(envelope.image_count());
    let mut skipped = Vec::new();
    for (index, segment) in envelope.segments.iter().enumerate() {
        debug!(
            "decoding image {index} ({} bytes at offset {})",
            segment.len, segment.offset
        );
        match decode_image(index, segment.bytes(data), identity, geometry, policy) {
            Ok(image) => images.push(image),
            Err(err) => {
                warn!("skipping {err}");
                skipped.push(err);
            }
        }
    }

    if images.is_empty() {
        return Err(UpdateError::NoUsableImages { failures: skipped });
    }
    Ok(Update {
        wakeup_hint: envelope.wakeup_hint,
        images,
        skipped,
    })
}

fn decode_image(
    index: usize,
    sealed: &[u8],
    identity: &DeviceIdentity,
    geometry: Geometry,
    policy: TruncatedImagePolicy,
) -> Result<DecodedImage, ImageError> {
    let plaintext = seal::open(sealed, &identity.secret_key)
        .map_err(|source| ImageError::DecryptionFailed { index, source })?;

    let expected = geometry.packed_len();
    match rle::decode(&plaintext, expected) {
        Decoded::Complete(packed) => Ok(DecodedImage::new(geometry, packed)),
        Decoded::Truncated(packed) => match policy {
            TruncatedImagePolicy::Reject => Err(ImageError::DecodeTruncated {
                index,
                expected,
                actual: packed.len(),
            }),
            TruncatedImagePolicy::Pad => {
                warn!(
                    "image {index} decoded to {} of {expected} bytes, padding with white",
                    packed.len()
                );
                Ok(DecodedImage::new(geometry, packed))
            }
        },
    }
}
