use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use crypto_box::aead::OsRng;
use crypto_box::{PublicKey, SecretKey};
use thiserror::Error;
use url::form_urlencoded;
use uuid::Uuid;

use crate::seal::KEY_SIZE;

const PAIRING_URL_PREFIX: &str = "statuspanel:r2?";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("public key does not belong to secret key")]
    KeyMismatch,
    #[error("expected a {KEY_SIZE} byte key, got {0} bytes")]
    KeyLength(usize),
}

/// Who this device is to the update service. Generated once on first boot and
/// never changed afterwards; the service seals every image for `public_key`.
#[derive(Clone)]
pub struct DeviceIdentity {
    pub id: String,
    pub public_key: PublicKey,
    pub secret_key: SecretKey,
}

impl DeviceIdentity {
    pub fn generate() -> Self {
        let secret_key = SecretKey::generate(&mut OsRng);
        Self {
            id: Uuid::new_v4().to_string(),
            public_key: secret_key.public_key(),
            secret_key,
        }
    }

    /// Rebuild an identity from stored key bytes, rejecting pairs that don't match.
    pub fn from_parts(
        id: String,
        public_key: &[u8],
        secret_key: &[u8],
    ) -> Result<Self, IdentityError> {
        let public_key = PublicKey::from(key_bytes(public_key)?);
        let secret_key = SecretKey::from(key_bytes(secret_key)?);
        if secret_key.public_key() != public_key {
            return Err(IdentityError::KeyMismatch);
        }
        Ok(Self {
            id,
            public_key,
            secret_key,
        })
    }

    /// URL the companion app scans to register this device and learn its key.
    pub fn pairing_url(&self) -> String {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("id", &self.id)
            .append_pair("pk", &STANDARD.encode(self.public_key.as_bytes()))
            .finish();
        format!("{PAIRING_URL_PREFIX}{query}")
    }
}

impl fmt::Debug for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceIdentity")
            .field("id", &self.id)
            .field("public_key", &STANDARD.encode(self.public_key.as_bytes()))
            .finish_non_exhaustive()
    }
}

fn key_bytes(bytes: &[u8]) -> Result<[u8; KEY_SIZE], IdentityError> {
    bytes
        .try_into()
        .map_err(|_| IdentityError::KeyLength(bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = DeviceIdentity::generate();
        let b = DeviceIdentity::generate();
        assert_ne!(a.id, b.id);
        assert_ne!(a.public_key, b.public_key);
        assert_eq!(a.secret_key.public_key(), a.public_key);
    }

    #[test]
    fn test_pairing_url() {
        let secret = [7u8; KEY_SIZE];
        let public = SecretKey::from(secret).public_key();
        let identity = DeviceIdentity::from_parts(
            "0f8c2d4e-1111-2222-3333-444455556666".to_string(),
            public.as_bytes(),
            &secret,
        )
        .unwrap();

        let url = identity.pairing_url();
        assert!(url.starts_with("statuspanel:r2?id=0f8c2d4e-1111-2222-3333-444455556666&pk="));

        let query = url.strip_prefix(PAIRING_URL_PREFIX).unwrap();
        let pk = form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "pk")
            .map(|(_, v)| v.into_owned())
            .unwrap();
        assert_eq!(STANDARD.decode(pk).unwrap(), public.as_bytes());
    }

    #[test]
    fn test_from_parts_rejects_mismatch() {
        let a = DeviceIdentity::generate();
        let b = DeviceIdentity::generate();
        let result = DeviceIdentity::from_parts(
            a.id.clone(),
            a.public_key.as_bytes(),
            &b.secret_key.to_bytes(),
        );
        assert!(matches!(result, Err(IdentityError::KeyMismatch)));
    }

    #[test]
    fn test_from_parts_rejects_bad_length() {
        let result = DeviceIdentity::from_parts("x".into(), &[0u8; 31], &[0u8; 32]);
        assert!(matches!(result, Err(IdentityError::KeyLength(31))));
    }

    #[test]
    fn test_debug_hides_secret() {
        let identity = DeviceIdentity::generate();
        let debug = format!("{identity:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains(&identity.id));
    }
}
