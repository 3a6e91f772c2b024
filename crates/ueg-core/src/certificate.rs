//! Entropy certificates: the ingestion gate's attestation of a source's
//! obfuscation ratio at admission time.
//!
//! Layout: `b"UEGC"`, a version byte, the ratio as little-endian `f64`, then
//! the declared source language as UTF-8.

use serde::{Deserialize, Serialize};

const MAGIC: &[u8; 4] = b"UEGC";
const VERSION: u8 = 1;
const HEADER_LEN: usize = MAGIC.len() + 1 + 8;

/// Opaque entropy certificate blob carried by a fragment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntropyCertificate(pub Vec<u8>);

/// The decoded content of a well-formed certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateClaim {
    pub ratio: f64,
    pub language: String,
}

impl EntropyCertificate {
    /// Encodes an attestation of `ratio` for text in `language`.
    pub fn attest(ratio: f64, language: &str) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_LEN + language.len());
        bytes.extend_from_slice(MAGIC);
        bytes.push(VERSION);
        bytes.extend_from_slice(&ratio.to_le_bytes());
        bytes.extend_from_slice(language.as_bytes());
        EntropyCertificate(bytes)
    }

    pub fn is_present(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Decodes the claim, or `None` if the blob is not a certificate.
    pub fn claim(&self) -> Option<CertificateClaim> {
        let bytes = self.0.as_slice();
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC || bytes[4] != VERSION {
            return None;
        }
        let ratio_bytes: [u8; 8] = bytes[5..HEADER_LEN].try_into().ok()?;
        let ratio = f64::from_le_bytes(ratio_bytes);
        if !ratio.is_finite() || ratio < 0.0 {
            return None;
        }
        let language = std::str::from_utf8(&bytes[HEADER_LEN..]).ok()?.to_string();
        Some(CertificateClaim { ratio, language })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attest_then_claim() {
        let cert = EntropyCertificate::attest(0.734, "python");
        let claim = cert.claim().unwrap();
        assert_eq!(claim.ratio, 0.734);
        assert_eq!(claim.language, "python");
    }

    #[test]
    fn empty_certificate_is_absent() {
        let cert = EntropyCertificate::default();
        assert!(!cert.is_present());
        assert!(cert.claim().is_none());
    }

    #[test]
    fn foreign_blob_is_not_a_certificate() {
        assert!(EntropyCertificate(b"entropy-ok".to_vec()).claim().is_none());
        assert!(EntropyCertificate(b"UEGC".to_vec()).claim().is_none());
    }

    #[test]
    fn non_finite_ratio_rejected() {
        assert!(EntropyCertificate::attest(f64::NAN, "go").claim().is_none());
        assert!(EntropyCertificate::attest(-1.0, "go").claim().is_none());
    }
}
