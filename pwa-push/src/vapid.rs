//! VAPID JWT construction (RFC 8292).
//!
//! Each push request carries a freshly signed ES256 token whose audience is
//! the origin of the push service endpoint. Signing goes through the
//! [`DerSigner`] seam: the signer hands back an ASN.1 DER signature, which is
//! transcoded to the raw `r || s` form JWS requires.

use chrono::Utc;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{PushError, Result, base64url, keys, signature};

/// Token lifetime in seconds (12 hours).
pub const JWT_EXPIRATION_SECS: i64 = 12 * 60 * 60;

/// Produces DER-encoded ECDSA P-256 / SHA-256 signatures.
pub trait DerSigner: Send + Sync {
    /// Sign `message`, returning `SEQUENCE { INTEGER r, INTEGER s }`.
    fn sign_der(&self, message: &[u8]) -> Result<Vec<u8>>;
}

impl DerSigner for SigningKey {
    fn sign_der(&self, message: &[u8]) -> Result<Vec<u8>> {
        let signature: Signature = self
            .try_sign(message)
            .map_err(|e| PushError::Signing(e.to_string()))?;
        Ok(signature.to_der().as_bytes().to_vec())
    }
}

/// JOSE header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VapidHeader {
    /// Token type.
    pub typ: String,
    /// Signature algorithm.
    pub alg: String,
}

impl Default for VapidHeader {
    fn default() -> Self {
        Self {
            typ: "JWT".to_string(),
            alg: "ES256".to_string(),
        }
    }
}

/// VAPID claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VapidClaims {
    /// Origin of the push service.
    pub aud: String,
    /// Expiration (Unix seconds).
    pub exp: i64,
    /// Contact URI of the application server.
    pub sub: String,
}

/// Builds signed VAPID tokens with a loaded signer.
pub struct VapidJwtBuilder<S = SigningKey> {
    signer: S,
    subject: String,
}

impl VapidJwtBuilder<SigningKey> {
    /// Load the signer from a PEM private key.
    pub fn from_pem(private_key_pem: &str, admin_email: &str) -> Result<Self> {
        let secret = keys::parse_private_key_pem(private_key_pem)?;
        Ok(Self::new(SigningKey::from(secret), admin_email))
    }
}

impl<S: DerSigner> VapidJwtBuilder<S> {
    /// Create a builder around an existing signer.
    pub fn new(signer: S, admin_email: &str) -> Self {
        Self {
            signer,
            subject: subject_for(admin_email),
        }
    }

    /// The `sub` claim this builder emits.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Build a token for `endpoint`, expiring 12 hours from now.
    pub fn build(&self, endpoint: &str) -> Result<String> {
        self.build_at(endpoint, Utc::now().timestamp())
    }

    /// Build a token for `endpoint` as of Unix time `now`.
    pub fn build_at(&self, endpoint: &str, now: i64) -> Result<String> {
        let header = VapidHeader::default();
        let claims = VapidClaims {
            aud: audience(endpoint)?,
            exp: now + JWT_EXPIRATION_SECS,
            sub: self.subject.clone(),
        };

        let signing_input = format!(
            "{}.{}",
            base64url::encode(serde_json::to_vec(&header)?),
            base64url::encode(serde_json::to_vec(&claims)?)
        );

        let der = self.signer.sign_der(signing_input.as_bytes())?;
        let raw = signature::der_to_raw(&der)?;

        Ok(format!("{}.{}", signing_input, base64url::encode(raw)))
    }
}

/// Build a VAPID token in one call.
///
/// Parses the key on every call; dispatch paths hold a [`VapidJwtBuilder`] instead.
pub fn build_jwt(endpoint: &str, private_key_pem: &str, admin_email: &str) -> Result<String> {
    VapidJwtBuilder::from_pem(private_key_pem, admin_email)?.build(endpoint)
}

/// `scheme://host` of a push endpoint.
pub fn audience(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| PushError::InvalidSubscription(format!("endpoint {}: {}", endpoint, e)))?;

    let host = url.host_str().ok_or_else(|| {
        PushError::InvalidSubscription(format!("endpoint {} has no host", endpoint))
    })?;

    Ok(format!("{}://{}", url.scheme(), host))
}

fn subject_for(admin_email: &str) -> String {
    let email = admin_email.trim();
    if email.starts_with("mailto:") || email.starts_with("https:") {
        email.to_string()
    } else {
        format!("mailto:{}", email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VapidKeyPair;
    use p256::ecdsa::signature::Verifier;

    struct FailingSigner;

    impl DerSigner for FailingSigner {
        fn sign_der(&self, _message: &[u8]) -> Result<Vec<u8>> {
            Err(PushError::Signing("engine refused".to_string()))
        }
    }

    struct CorruptSigner;

    impl DerSigner for CorruptSigner {
        fn sign_der(&self, _message: &[u8]) -> Result<Vec<u8>> {
            Ok(vec![0x31, 0x02, 0x02, 0x00])
        }
    }

    fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str) -> T {
        serde_json::from_slice(&base64url::decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn test_audience_strips_path() {
        assert_eq!(
            audience("https://fcm.googleapis.com/fcm/send/xyz123").unwrap(),
            "https://fcm.googleapis.com"
        );
        assert_eq!(
            audience("https://updates.push.services.mozilla.com:443/wpush/v2/abc").unwrap(),
            "https://updates.push.services.mozilla.com"
        );
    }

    #[test]
    fn test_audience_rejects_bad_endpoint() {
        assert!(matches!(audience("not a url"), Err(PushError::InvalidSubscription(_))));
        assert!(matches!(
            audience("mailto:admin@example.com"),
            Err(PushError::InvalidSubscription(_))
        ));
    }

    #[test]
    fn test_subject_prefix() {
        assert_eq!(subject_for("admin@example.com"), "mailto:admin@example.com");
        assert_eq!(subject_for("mailto:admin@example.com"), "mailto:admin@example.com");
        assert_eq!(subject_for("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_token_structure() {
        let keys = VapidKeyPair::generate().unwrap();
        let builder = VapidJwtBuilder::new(keys.signing_key().unwrap(), "admin@example.com");

        let token = builder.build_at("https://push.example.com/abc", 1_700_000_000).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header: serde_json::Value = decode_segment(parts[0]);
        assert_eq!(header["alg"], "ES256");
        assert_eq!(header["typ"], "JWT");

        let claims: VapidClaims = decode_segment(parts[1]);
        assert_eq!(claims.aud, "https://push.example.com");
        assert_eq!(claims.exp, 1_700_000_000 + 43_200);
        assert_eq!(claims.sub, "mailto:admin@example.com");

        assert_eq!(base64url::decode(parts[2]).unwrap().len(), 64);
    }

    #[test]
    fn test_signature_verifies() {
        let keys = VapidKeyPair::generate().unwrap();
        let builder = VapidJwtBuilder::new(keys.signing_key().unwrap(), "admin@example.com");
        let token = builder.build("https://push.example.com/abc").unwrap();

        let (signing_input, sig) = token.rsplit_once('.').unwrap();
        let signature = Signature::from_slice(&base64url::decode(sig).unwrap()).unwrap();
        let verifying_key = p256::ecdsa::VerifyingKey::from(&keys.public_key().unwrap());

        verifying_key.verify(signing_input.as_bytes(), &signature).unwrap();
    }

    #[test]
    fn test_build_jwt_from_pem() {
        let keys = VapidKeyPair::generate().unwrap();
        let pem = keys.private_key_pem().unwrap();

        let token = build_jwt("https://fcm.googleapis.com/fcm/send/xyz123", &pem, "a@b.c").unwrap();
        let claims: VapidClaims = decode_segment(token.split('.').nth(1).unwrap());
        assert_eq!(claims.aud, "https://fcm.googleapis.com");
    }

    #[test]
    fn test_invalid_pem_is_key_load_error() {
        let err = build_jwt("https://push.example.com/abc", "garbage", "a@b.c").unwrap_err();
        assert!(matches!(err, PushError::KeyLoad(_)));
    }

    #[test]
    fn test_signer_failures_propagate() {
        let builder = VapidJwtBuilder::new(FailingSigner, "a@b.c");
        assert!(matches!(
            builder.build("https://push.example.com/abc"),
            Err(PushError::Signing(_))
        ));

        let builder = VapidJwtBuilder::new(CorruptSigner, "a@b.c");
        assert!(matches!(
            builder.build("https://push.example.com/abc"),
            Err(PushError::SignatureFormat(_))
        ));
    }
}
