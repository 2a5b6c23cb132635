//! Developer credentials: ES256-signed, time-bounded tokens proving the
//! application's identity to the catalog service.
//!
//! A credential is three base64url parts joined by `.`:
//! `header.claims.signature`, where the header is `{"alg":"ES256","kid":…}`,
//! the claims are `{"iss":…,"iat":…,"exp":…}` and the signature is the raw
//! 64-byte `r‖s` ECDSA P-256/SHA-256 signature over `header.claims`.

use std::fmt::Debug;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, VerifyingKey};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CredentialError;
use crate::keys::SigningKeyMaterial;

/// Seconds a credential stays valid after issuance (about six months).
pub const FIXED_VALIDITY_SECS: i64 = 15_777_000;

/// The only signing algorithm the catalog service accepts.
pub const ALGORITHM: &str = "ES256";

const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialHeader {
    pub alg: String,
    pub kid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A signed developer credential.
///
/// Immutable once created. `Debug` shows the header and claims but never the
/// encoded token or signature.
#[derive(Clone, PartialEq, Eq)]
pub struct DeveloperCredential {
    header: CredentialHeader,
    claims: CredentialClaims,
    signature: Vec<u8>,
    encoded: String,
}

impl Debug for DeveloperCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeveloperCredential")
            .field("header", &self.header)
            .field("claims", &self.claims)
            .field("chars", &self.encoded.len())
            .finish_non_exhaustive()
    }
}

impl DeveloperCredential {
    pub fn header(&self) -> &CredentialHeader {
        &self.header
    }

    pub fn claims(&self) -> &CredentialClaims {
        &self.claims
    }

    /// The raw `r‖s` signature bytes.
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The dot-delimited credential string to present to the service.
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn into_string(self) -> String {
        self.encoded
    }

    /// The `header.claims` prefix that the signature covers.
    pub fn signing_input(&self) -> &str {
        let end = self.encoded.rfind('.').unwrap_or(self.encoded.len());
        &self.encoded[..end]
    }

    /// Parse a credential string without verifying its signature.
    pub fn decode(token: &str) -> Result<Self, CredentialError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CredentialError::Malformed(
                "expected three dot-separated parts".to_string(),
            ));
        };

        let header: CredentialHeader = decode_part("header", header_b64)?;
        let claims: CredentialClaims = decode_part("claims", claims_b64)?;
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| CredentialError::Malformed(format!("signature: {e}")))?;
        if signature.len() != SIGNATURE_LEN {
            return Err(CredentialError::Malformed(format!(
                "signature is {} bytes, expected {SIGNATURE_LEN}",
                signature.len()
            )));
        }

        Ok(Self {
            header,
            claims,
            signature,
            encoded: token.to_string(),
        })
    }

    /// Verify the signature against an SPKI PEM public key and return the
    /// claims.
    ///
    /// Expiry is not enforced; see [Self::is_expired] and
    /// [Self::needs_refresh].
    pub fn verify(&self, public_key_pem: &str) -> Result<CredentialClaims, CredentialError> {
        let key = DecodingKey::from_ec_pem(public_key_pem.as_bytes())
            .map_err(CredentialError::Verification)?;
        let mut validation = Validation::new(Algorithm::ES256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<CredentialClaims>(self.as_str(), &key, &validation)
            .map_err(CredentialError::Verification)?;
        Ok(data.claims)
    }

    /// Check the signature with an already loaded public key.
    pub fn verify_with(&self, key: &VerifyingKey) -> bool {
        let Ok(signature) = Signature::from_slice(&self.signature) else {
            return false;
        };
        key.verify(self.signing_input().as_bytes(), &signature).is_ok()
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.claims.exp
    }

    /// Whether the credential expires within `margin_secs` of `now` and
    /// should be reissued.
    pub fn needs_refresh(&self, now: i64, margin_secs: i64) -> bool {
        self.claims.exp.saturating_sub(now) <= margin_secs
    }
}

/// Issue a developer credential at `issued_at` (Unix seconds).
///
/// Pure function of its inputs apart from the ECDSA nonce.
pub fn issue_developer_credential(
    issuer: &str,
    key_id: &str,
    private_key_pem: &str,
    issued_at: i64,
) -> Result<DeveloperCredential, CredentialError> {
    let key = SigningKeyMaterial::from_pem(private_key_pem)?;
    sign_developer_credential(&key, issuer, key_id, issued_at)
}

/// Issue a developer credential valid from now.
pub fn generate_developer_credential(
    issuer: &str,
    key_id: &str,
    private_key_pem: &str,
) -> Result<DeveloperCredential, CredentialError> {
    let now = chrono::Utc::now().timestamp();
    issue_developer_credential(issuer, key_id, private_key_pem, now)
}

/// Sign a developer credential with already loaded key material.
pub fn sign_developer_credential(
    key: &SigningKeyMaterial,
    issuer: &str,
    key_id: &str,
    issued_at: i64,
) -> Result<DeveloperCredential, CredentialError> {
    let header = CredentialHeader {
        alg: ALGORITHM.to_string(),
        kid: key_id.to_string(),
    };
    let exp = issued_at
        .checked_add(FIXED_VALIDITY_SECS)
        .ok_or(CredentialError::IssuedAtOutOfRange(issued_at))?;
    let claims = CredentialClaims {
        iss: issuer.to_string(),
        iat: issued_at,
        exp,
    };

    let header_b64 = encode_part("header", &header)?;
    let claims_b64 = encode_part("claims", &claims)?;
    let signing_input = format!("{header_b64}.{claims_b64}");

    let signature: Signature = key
        .signing_key()
        .try_sign(signing_input.as_bytes())
        .map_err(|e| {
            warn!("failed to sign developer credential");
            CredentialError::Signing(e)
        })?;
    let signature = signature.to_bytes().to_vec();

    let encoded = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(&signature));
    debug!(
        kid = key_id,
        iss = issuer,
        exp = claims.exp,
        chars = encoded.len(),
        "issued developer credential"
    );

    Ok(DeveloperCredential {
        header,
        claims,
        signature,
        encoded,
    })
}

fn encode_part<T: Serialize>(part: &'static str, value: &T) -> Result<String, CredentialError> {
    let json = serde_json::to_vec(value)
        .map_err(|source| CredentialError::Serialization { part, source })?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_part<T: DeserializeOwned>(part: &str, encoded: &str) -> Result<T, CredentialError> {
    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CredentialError::Malformed(format!("{part}: {e}")))?;
    serde_json::from_slice(&json).map_err(|e| CredentialError::Malformed(format!("{part}: {e}")))
}
