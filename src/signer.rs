//! Signing the compressed table of contents.

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::rand_core::OsRng;
use rsa::signature::RandomizedSigner;
use rsa::signature::SignatureEncoding;
use rsa::RsaPrivateKey;
use sha1::Sha1;

use base64ct::Base64;
use base64ct::Encoding as _;

use crate::pem;
use crate::XarError;

/// Anything able to produce a detached signature over the compressed TOC
/// and describe itself to the TOC's `<signature>` element.
pub trait Signer {
    /// Sign `data` (the compressed TOC bytes), returning the raw signature.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, XarError>;

    /// The `style` attribute of the `<signature>` element, e.g. `"RSA"`.
    fn signature_style(&self) -> &str;

    /// The exact byte length every call to [`Signer::sign`] produces.
    ///
    /// This reserves the heap slot ahead of actually signing, so it must be
    /// known up front rather than assumed from the key's bit length.
    fn signature_len(&self) -> usize;

    /// PEM certificate bodies (base64, no markers) to embed in the TOC's
    /// `KeyInfo`, leaf certificate first.
    fn certificates(&self) -> &[String];
}

/// A signer that produces no signature: the archive is generated unsigned.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigner;

impl Signer for NoSigner {
    fn sign(&self, _data: &[u8]) -> Result<Vec<u8>, XarError> {
        Ok(Vec::new())
    }

    fn signature_style(&self) -> &str {
        "none"
    }

    fn signature_len(&self) -> usize {
        0
    }

    fn certificates(&self) -> &[String] {
        &[]
    }
}

/// PEM text supplied by the caller to produce a signed archive: a leaf
/// certificate, the private key matching it, and zero or more additional
/// certificates (typically intermediates) to embed alongside the leaf.
///
/// None of this is parsed as X.509 beyond extracting the base64 body: chain
/// construction and trust validation are the caller's concern, not this
/// crate's.
#[derive(Debug, Clone)]
pub struct SignatureResources {
    /// PEM text of the leaf certificate.
    pub certificate_pem: String,
    /// PEM text of the private key matching the leaf certificate.
    pub private_key_pem: String,
    /// PEM text of any additional certificates (e.g. an intermediate CA),
    /// embedded after the leaf in the order given.
    pub additional_certificates_pem: Vec<String>,
}

/// An RSA-SHA1 [`Signer`] built from PEM-encoded key material.
///
/// The signature byte length is not assumed from a standard key size: at
/// construction time, a throwaway probe signature is produced once to
/// measure the actual output length, so non-2048-bit keys (a 3072-bit key
/// signs to 384 bytes, not 256) lay out the heap correctly.
pub struct RsaSigner {
    signing_key: SigningKey<Sha1>,
    certificates: Vec<String>,
    signature_len: usize,
}

const PROBE_MESSAGE: &[u8] = b"xargen-signature-length-probe";

impl RsaSigner {
    /// Parse `resources` and build a signer, probing the signature length
    /// once up front.
    pub fn new(resources: &SignatureResources) -> Result<Self, XarError> {
        let key_der = decode_private_key_der(&resources.private_key_pem)?;
        let private_key = RsaPrivateKey::from_pkcs8_der(&key_der)
            .or_else(|_| RsaPrivateKey::from_pkcs1_der(&key_der))
            .map_err(|e| XarError::InvalidPrivateKey(e.to_string()))?;
        let signing_key = SigningKey::<Sha1>::new(private_key);

        let mut certificates = Vec::with_capacity(1 + resources.additional_certificates_pem.len());
        certificates.push(pem::extract_section(&resources.certificate_pem, "CERTIFICATE")?);
        for extra in &resources.additional_certificates_pem {
            certificates.push(pem::extract_section(extra, "CERTIFICATE")?);
        }

        let probe = signing_key
            .sign_with_rng(&mut OsRng, PROBE_MESSAGE)
            .to_bytes();

        Ok(Self {
            signing_key,
            certificates,
            signature_len: probe.len(),
        })
    }
}

fn decode_private_key_der(pem_text: &str) -> Result<Vec<u8>, XarError> {
    let body = pem::extract_section(pem_text, "PRIVATE KEY")
        .or_else(|_| pem::extract_section(pem_text, "RSA PRIVATE KEY"))?;
    Base64::decode_vec(&body)
        .map_err(|e| XarError::InvalidPrivateKey(e.to_string()))
}

impl Signer for RsaSigner {
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, XarError> {
        let signature = self.signing_key.sign_with_rng(&mut OsRng, data).to_bytes();
        debug_assert_eq!(signature.len(), self.signature_len);
        Ok(signature.to_vec())
    }

    fn signature_style(&self) -> &str {
        "RSA"
    }

    fn signature_len(&self) -> usize {
        self.signature_len
    }

    fn certificates(&self) -> &[String] {
        &self.certificates
    }
}

#[cfg(test)]
mod tests {
    use rsa::pkcs8::EncodePrivateKey;
    use rsa::pkcs8::LineEnding;

    use super::*;

    const FAKE_CERT: &str = "\
-----BEGIN CERTIFICATE-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA
-----END CERTIFICATE-----
";

    fn resources_for(bits: usize) -> SignatureResources {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, bits).unwrap();
        let private_key_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .unwrap()
            .to_string();
        SignatureResources {
            certificate_pem: FAKE_CERT.into(),
            private_key_pem,
            additional_certificates_pem: Vec::new(),
        }
    }

    #[test]
    fn no_signer_signs_empty() {
        let signer = NoSigner;
        assert_eq!(signer.sign(b"anything").unwrap(), Vec::<u8>::new());
        assert_eq!(signer.signature_len(), 0);
    }

    #[test]
    fn probes_signature_length_for_2048_bit_key() {
        let resources = resources_for(2048);
        let signer = RsaSigner::new(&resources).unwrap();
        assert_eq!(signer.signature_len(), 256);
        let signature = signer.sign(b"compressed toc bytes").unwrap();
        assert_eq!(signature.len(), 256);
    }

    #[test]
    fn probes_signature_length_for_non_standard_key() {
        let resources = resources_for(3072);
        let signer = RsaSigner::new(&resources).unwrap();
        assert_eq!(signer.signature_len(), 384);
    }

    #[test]
    fn embeds_leaf_then_additional_certificates() {
        let mut resources = resources_for(2048);
        resources.additional_certificates_pem = vec![FAKE_CERT.into()];
        let signer = RsaSigner::new(&resources).unwrap();
        assert_eq!(signer.certificates().len(), 2);
    }

    #[test]
    fn rejects_garbage_private_key() {
        let resources = SignatureResources {
            certificate_pem: FAKE_CERT.into(),
            private_key_pem: "not a pem at all".into(),
            additional_certificates_pem: Vec::new(),
        };
        assert!(RsaSigner::new(&resources).is_err());
    }
}
