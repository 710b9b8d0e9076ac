//! Message encryption for Web Push (RFC 8291) using the `aes128gcm`
//! content coding (RFC 8188), single record.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes128Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use p256::elliptic_curve::ecdh::diffie_hellman;
use p256::elliptic_curve::rand_core::{OsRng, RngCore};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use sha2::Sha256;

use crate::{PushError, Result, base64url};

/// Record size advertised in the content-coding header.
pub const RECORD_SIZE: u32 = 4096;

/// Largest plaintext that fits in one 4096-byte push message.
pub const MAX_PAYLOAD_SIZE: usize = 3993;

const SALT_SIZE: usize = 16;
const AUTH_SECRET_SIZE: usize = 16;
const KEY_INFO_PREFIX: &[u8] = b"WebPush: info\0";
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";
const LAST_RECORD_DELIMITER: u8 = 0x02;

/// Encrypt `payload` for the user agent identified by `p256dh` / `auth`.
pub fn encrypt(payload: &[u8], p256dh: &str, auth: &str) -> Result<Vec<u8>> {
    let ua_public = decode_ua_public(p256dh)?;
    let auth_secret = decode_auth_secret(auth)?;

    let ephemeral = SecretKey::random(&mut OsRng);
    let mut salt = [0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    encrypt_with(payload, &ua_public, &auth_secret, &ephemeral, &salt)
}

/// Encrypt with caller-supplied ephemeral key and salt.
pub(crate) fn encrypt_with(
    payload: &[u8],
    ua_public: &PublicKey,
    auth_secret: &[u8],
    ephemeral: &SecretKey,
    salt: &[u8; SALT_SIZE],
) -> Result<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(PushError::PayloadTooLarge {
            size: payload.len(),
            limit: MAX_PAYLOAD_SIZE,
        });
    }

    let as_public = ephemeral.public_key().to_encoded_point(false);
    let ua_public_bytes = ua_public.to_encoded_point(false);

    let shared = diffie_hellman(ephemeral.to_nonzero_scalar(), ua_public.as_affine());

    let (cek, nonce) = derive_content_keys(
        shared.raw_secret_bytes().as_slice(),
        auth_secret,
        ua_public_bytes.as_bytes(),
        as_public.as_bytes(),
        salt,
    )?;

    let mut plaintext = Vec::with_capacity(payload.len() + 1);
    plaintext.extend_from_slice(payload);
    plaintext.push(LAST_RECORD_DELIMITER);

    let cipher = Aes128Gcm::new_from_slice(&cek)
        .map_err(|e| PushError::Encryption(format!("content key: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
        .map_err(|_| PushError::Encryption("AES-GCM encryption failed".to_string()))?;

    let key_id = as_public.as_bytes();
    let mut body = Vec::with_capacity(SALT_SIZE + 5 + key_id.len() + ciphertext.len());
    body.extend_from_slice(salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(key_id.len() as u8);
    body.extend_from_slice(key_id);
    body.extend_from_slice(&ciphertext);
    Ok(body)
}

/// RFC 8291 §3.4 key schedule, returning `(CEK, NONCE)`.
pub(crate) fn derive_content_keys(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8],
) -> Result<([u8; 16], [u8; 12])> {
    let expand_err = |_| PushError::Encryption("HKDF expansion failed".to_string());

    let mut ikm = [0u8; 32];
    Hkdf::<Sha256>::new(Some(auth_secret), ecdh_secret)
        .expand_multi_info(&[KEY_INFO_PREFIX, ua_public, as_public], &mut ikm)
        .map_err(expand_err)?;

    let prk = Hkdf::<Sha256>::new(Some(salt), &ikm);

    let mut cek = [0u8; 16];
    prk.expand(CEK_INFO, &mut cek).map_err(expand_err)?;

    let mut nonce = [0u8; 12];
    prk.expand(NONCE_INFO, &mut nonce).map_err(expand_err)?;

    Ok((cek, nonce))
}

fn decode_ua_public(p256dh: &str) -> Result<PublicKey> {
    let bytes = base64url::decode(p256dh)
        .map_err(|e| PushError::InvalidSubscription(format!("p256dh: {}", e)))?;
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|_| PushError::InvalidSubscription("p256dh is not a P-256 point".to_string()))
}

fn decode_auth_secret(auth: &str) -> Result<Vec<u8>> {
    let bytes = base64url::decode(auth)
        .map_err(|e| PushError::InvalidSubscription(format!("auth: {}", e)))?;
    if bytes.len() != AUTH_SECRET_SIZE {
        return Err(PushError::InvalidSubscription(format!(
            "auth secret must be {} bytes, got {}",
            AUTH_SECRET_SIZE,
            bytes.len()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// User-agent side of RFC 8291, used to check what the server produced.
    fn decrypt(body: &[u8], ua_secret: &SecretKey, auth_secret: &[u8]) -> Vec<u8> {
        let salt = &body[..16];
        let rs = u32::from_be_bytes(body[16..20].try_into().unwrap());
        assert_eq!(rs, RECORD_SIZE);
        let id_len = body[20] as usize;
        let as_public_bytes = &body[21..21 + id_len];
        let ciphertext = &body[21 + id_len..];

        let as_public = PublicKey::from_sec1_bytes(as_public_bytes).unwrap();
        let shared = diffie_hellman(ua_secret.to_nonzero_scalar(), as_public.as_affine());
        let ua_public = ua_secret.public_key().to_encoded_point(false);

        let (cek, nonce) = derive_content_keys(
            shared.raw_secret_bytes().as_slice(),
            auth_secret,
            ua_public.as_bytes(),
            as_public_bytes,
            salt,
        )
        .unwrap();

        let cipher = Aes128Gcm::new_from_slice(&cek).unwrap();
        let mut plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext)
            .unwrap();
        assert_eq!(plaintext.pop(), Some(LAST_RECORD_DELIMITER));
        plaintext
    }

    #[test]
    fn test_encrypt_decrypts_on_user_agent_side() {
        let ua_secret = SecretKey::random(&mut OsRng);
        let p256dh = base64url::encode(ua_secret.public_key().to_encoded_point(false).as_bytes());
        let auth = [9u8; 16];

        let payload = br#"{"title":"Hello","body":"World"}"#;
        let body = encrypt(payload, &p256dh, &base64url::encode(auth)).unwrap();

        assert_eq!(body[20], 65);
        assert_eq!(body.len(), 16 + 4 + 1 + 65 + payload.len() + 1 + 16);
        assert_eq!(decrypt(&body, &ua_secret, &auth), payload);
    }

    #[test]
    fn test_fixed_salt_and_key_are_deterministic() {
        let ua_secret = SecretKey::random(&mut OsRng);
        let ephemeral = SecretKey::random(&mut OsRng);
        let salt = [3u8; 16];
        let auth = [5u8; 16];

        let a = encrypt_with(b"same", &ua_secret.public_key(), &auth, &ephemeral, &salt).unwrap();
        let b = encrypt_with(b"same", &ua_secret.public_key(), &auth, &ephemeral, &salt).unwrap();
        assert_eq!(a, b);
        assert_eq!(&a[..16], &salt);
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let ua_secret = SecretKey::random(&mut OsRng);
        let p256dh = base64url::encode(ua_secret.public_key().to_encoded_point(false).as_bytes());
        let payload = vec![b'x'; MAX_PAYLOAD_SIZE + 1];

        assert!(matches!(
            encrypt(&payload, &p256dh, &base64url::encode([1u8; 16])),
            Err(PushError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_subscription_keys() {
        let ua_secret = SecretKey::random(&mut OsRng);
        let p256dh = base64url::encode(ua_secret.public_key().to_encoded_point(false).as_bytes());

        assert!(matches!(
            encrypt(b"x", "AAAA", &base64url::encode([1u8; 16])),
            Err(PushError::InvalidSubscription(_))
        ));
        assert!(matches!(
            encrypt(b"x", &p256dh, &base64url::encode([1u8; 8])),
            Err(PushError::InvalidSubscription(_))
        ));
    }
}
