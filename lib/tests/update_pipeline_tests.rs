//! End-to-end tests of the decode pipeline: envelopes are built the way the
//! update service builds them (run-length encode, seal, index) and then fed
//! through `decode_update`.

use statuspanel::envelope::{self, EnvelopeError, Malformation};
use statuspanel::palette::{self, ACCENT, BLACK, WHITE};
use statuspanel::update::ImageError;
use statuspanel::{
    DecodedImage, DeviceIdentity, Geometry, TruncatedImagePolicy, UpdateError, decode_update, rle,
    seal,
};

const GEOMETRY: Geometry = Geometry::new(16, 8);

/// Packed pixel data with every pixel set to `index`.
fn solid(index: u8) -> Vec<u8> {
    let byte = index | (index << 2) | (index << 4) | (index << 6);
    vec![byte; GEOMETRY.packed_len()]
}

fn sealed_image(identity: &DeviceIdentity, packed: &[u8]) -> Vec<u8> {
    seal::seal(&rle::encode(packed), &identity.public_key).expect("seal")
}

fn build_envelope(segments: &[Vec<u8>]) -> Vec<u8> {
    envelope::encode(6, 300, segments)
}

#[test]
fn test_decodes_every_image_in_order() {
    let identity = DeviceIdentity::generate();
    let data = build_envelope(&[
        sealed_image(&identity, &solid(0)),
        sealed_image(&identity, &solid(1)),
    ]);

    let update = decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject).unwrap();

    assert_eq!(update.wakeup_hint, 300);
    assert!(update.skipped.is_empty());
    assert_eq!(update.images.len(), 2);
    assert!(update.images[0].to_rgb().pixels().all(|p| *p == BLACK));
    assert!(update.images[1].to_rgb().pixels().all(|p| *p == ACCENT));
}

#[test]
fn test_mixed_pixels_survive_the_pipeline() {
    let identity = DeviceIdentity::generate();
    let mut packed = solid(2);
    packed[0] = 0b10_01_00_10;
    let data = build_envelope(&[sealed_image(&identity, &packed)]);

    let update = decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject).unwrap();
    let rgb = update.images[0].to_rgb();
    assert_eq!(*rgb.get_pixel(0, 0), WHITE);
    assert_eq!(*rgb.get_pixel(1, 0), BLACK);
    assert_eq!(*rgb.get_pixel(2, 0), ACCENT);
    assert_eq!(*rgb.get_pixel(3, 0), WHITE);
    assert_eq!(update.images[0], DecodedImage::new(GEOMETRY, packed));
}

#[test]
fn test_undecryptable_image_is_skipped() {
    let identity = DeviceIdentity::generate();
    let stranger = DeviceIdentity::generate();
    let data = build_envelope(&[
        sealed_image(&identity, &solid(0)),
        sealed_image(&stranger, &solid(1)),
        sealed_image(&identity, &solid(2)),
    ]);

    let update = decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject).unwrap();

    assert_eq!(update.images.len(), 2);
    assert_eq!(update.skipped.len(), 1);
    assert!(matches!(
        update.skipped[0],
        ImageError::DecryptionFailed { index: 1, .. }
    ));
    assert!(update.images[1].to_rgb().pixels().all(|p| *p == WHITE));
}

#[test]
fn test_all_images_failing_fails_the_update() {
    let identity = DeviceIdentity::generate();
    let stranger = DeviceIdentity::generate();
    let data = build_envelope(&[
        sealed_image(&stranger, &solid(0)),
        sealed_image(&stranger, &solid(1)),
    ]);

    match decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject) {
        Err(UpdateError::NoUsableImages { failures }) => {
            let indices: Vec<usize> = failures.iter().map(ImageError::index).collect();
            assert_eq!(indices, vec![0, 1]);
        }
        other => panic!("expected NoUsableImages, got {other:?}"),
    }
}

#[test]
fn test_truncated_image_rejected_by_default() {
    let identity = DeviceIdentity::generate();
    let short = &solid(0)[..GEOMETRY.packed_len() / 2];
    let data = build_envelope(&[
        sealed_image(&identity, short),
        sealed_image(&identity, &solid(1)),
    ]);

    let update = decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject).unwrap();

    assert_eq!(update.images.len(), 1);
    assert_eq!(
        update.skipped,
        vec![ImageError::DecodeTruncated {
            index: 0,
            expected: GEOMETRY.packed_len(),
            actual: GEOMETRY.packed_len() / 2,
        }]
    );
}

#[test]
fn test_truncated_image_padded_when_allowed() {
    let identity = DeviceIdentity::generate();
    let short = &solid(0)[..GEOMETRY.packed_len() / 2];
    let data = build_envelope(&[sealed_image(&identity, short)]);

    let update = decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Pad).unwrap();

    assert!(update.skipped.is_empty());
    let packed = update.images[0].packed();
    assert_eq!(packed.len(), GEOMETRY.packed_len());
    assert!(packed[..GEOMETRY.packed_len() / 2].iter().all(|&b| b == 0));
    assert!(packed[GEOMETRY.packed_len() / 2..].iter().all(|&b| b == palette::BLANK));
}

#[test]
fn test_bad_magic_processes_nothing() {
    let identity = DeviceIdentity::generate();
    let mut data = build_envelope(&[sealed_image(&identity, &solid(0))]);
    data[0] = 0x00;

    assert_eq!(
        decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject),
        Err(UpdateError::Envelope(EnvelopeError::InvalidHeader {
            found: Some(0x0000)
        }))
    );
}

#[test]
fn test_misaligned_segment_fails_the_update() {
    let identity = DeviceIdentity::generate();
    let mut data = build_envelope(&[sealed_image(&identity, &solid(0))]);
    // Point the only segment two bytes into its own data.
    data[6] += 2;

    assert_eq!(
        decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject),
        Err(UpdateError::Envelope(EnvelopeError::MalformedEnvelope(
            Malformation::Misaligned {
                index: 0,
                expected: 10,
                actual: 12,
            }
        )))
    );
}

#[test]
fn test_empty_update() {
    let identity = DeviceIdentity::generate();
    let data = build_envelope(&[]);
    assert_eq!(
        decode_update(&data, &identity, GEOMETRY, TruncatedImagePolicy::Reject),
        Err(UpdateError::Empty)
    );
}

#[test]
fn test_reference_geometry_round_trip() {
    let identity = DeviceIdentity::generate();
    let geometry = Geometry::REFERENCE;
    let mut packed = vec![palette::BLANK; geometry.packed_len()];
    for (i, byte) in packed.iter_mut().enumerate().step_by(97) {
        *byte = (i % 251) as u8;
    }
    let sealed = seal::seal(&rle::encode(&packed), &identity.public_key).unwrap();
    let data = build_envelope(&[sealed]);

    let update = decode_update(&data, &identity, geometry, TruncatedImagePolicy::Reject).unwrap();
    assert_eq!(update.images, vec![DecodedImage::new(geometry, packed)]);
    assert_eq!(update.images[0].to_rgb().dimensions(), (640, 384));
}
