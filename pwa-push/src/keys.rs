//! VAPID key pair (RFC 8292).
//!
//! The public key is the 65-byte uncompressed SEC1 point handed to browsers
//! as `applicationServerKey`. The private key is a PEM document. Both are
//! stored base64url-encoded, the way the host application persists them.

use p256::ecdsa::SigningKey;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::DecodePrivateKey;
use p256::pkcs8::LineEnding;
use p256::{PublicKey, SecretKey};
use serde::{Deserialize, Serialize};

use crate::{PushError, Result, base64url};

/// Length of an uncompressed P-256 point.
pub const PUBLIC_KEY_SIZE: usize = 65;

/// VAPID key pair as persisted by the host application.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VapidKeyPair {
    /// Uncompressed public point (base64url, 65 bytes decoded).
    pub public_key: String,
    /// PEM-encoded EC private key (base64url-wrapped).
    pub private_key: String,
}

impl std::fmt::Debug for VapidKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VapidKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl VapidKeyPair {
    /// Generate a fresh P-256 key pair.
    pub fn generate() -> Result<Self> {
        let secret = SecretKey::random(&mut OsRng);
        let pem = secret
            .to_sec1_pem(LineEnding::LF)
            .map_err(|e| PushError::KeyLoad(format!("failed to export private key: {}", e)))?;

        let public = secret.public_key().to_encoded_point(false);

        Ok(Self {
            public_key: base64url::encode(public.as_bytes()),
            private_key: base64url::encode(pem.as_bytes()),
        })
    }

    /// Build from persisted base64url strings, checking that both halves match.
    pub fn from_base64url(public_key: &str, private_key: &str) -> Result<Self> {
        let keys = Self {
            public_key: public_key.trim().to_string(),
            private_key: private_key.trim().to_string(),
        };
        keys.validate()?;
        Ok(keys)
    }

    /// Check that the public key is a valid point belonging to the private key.
    pub fn validate(&self) -> Result<()> {
        let public = self.public_key()?;
        let secret = self.secret_key()?;

        if secret.public_key() != public {
            return Err(PushError::KeyLoad(
                "public key does not belong to the private key".to_string(),
            ));
        }
        Ok(())
    }

    /// Decoded 65-byte public key.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>> {
        let bytes = base64url::decode(&self.public_key)
            .map_err(|e| PushError::KeyLoad(format!("public key: {}", e)))?;

        if bytes.len() != PUBLIC_KEY_SIZE || bytes[0] != 0x04 {
            return Err(PushError::KeyLoad(format!(
                "public key must be a {}-byte uncompressed P-256 point, got {} bytes",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Parsed public key.
    pub fn public_key(&self) -> Result<PublicKey> {
        let bytes = self.public_key_bytes()?;
        PublicKey::from_sec1_bytes(&bytes)
            .map_err(|_| PushError::KeyLoad("public key is not a point on P-256".to_string()))
    }

    /// PEM text of the private key.
    pub fn private_key_pem(&self) -> Result<String> {
        let bytes = base64url::decode(&self.private_key)
            .map_err(|e| PushError::KeyLoad(format!("private key: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|_| PushError::KeyLoad("private key PEM is not valid UTF-8".to_string()))
    }

    /// Parsed private key.
    pub fn secret_key(&self) -> Result<SecretKey> {
        parse_private_key_pem(&self.private_key_pem()?)
    }

    /// ECDSA signing key for VAPID JWTs.
    pub fn signing_key(&self) -> Result<SigningKey> {
        Ok(SigningKey::from(self.secret_key()?))
    }
}

/// Parse an EC private key in SEC1 (`EC PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`) PEM form.
pub fn parse_private_key_pem(pem: &str) -> Result<SecretKey> {
    let pem = pem.trim();
    if pem.is_empty() {
        return Err(PushError::KeyLoad("private key is empty".to_string()));
    }

    if pem.contains("BEGIN EC PRIVATE KEY") {
        SecretKey::from_sec1_pem(pem)
            .map_err(|e| PushError::KeyLoad(format!("invalid SEC1 PEM: {}", e)))
    } else if pem.contains("BEGIN PRIVATE KEY") {
        SecretKey::from_pkcs8_pem(pem)
            .map_err(|e| PushError::KeyLoad(format!("invalid PKCS#8 PEM: {}", e)))
    } else {
        Err(PushError::KeyLoad(
            "private key is not a PEM-encoded EC key".to_string(),
        ))
    }
}
