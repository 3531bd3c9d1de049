//! Extraction of the base64 body of a named PEM section.
//!
//! This is deliberately not a full PEM/DER parser: the signer only ever
//! needs the base64 text between a `BEGIN`/`END` marker pair, to either
//! hand to an RSA key parser or to embed verbatim into the TOC's
//! `X509Certificate` element.

use base64ct::Base64;
use base64ct::Encoding;

use crate::XarError;

/// Extract the base64 body of the first `<section>` found in `pem`.
///
/// Matching is by substring containment of `BEGIN <section>` / `END
/// <section>` rather than an exact five-dash prefix, to tolerate minor
/// dash-count variations across PEM producers. Content outside the section
/// — arbitrary leading or trailing text, comments, other sections — is
/// ignored.
pub fn extract_section(pem: &str, section: &str) -> Result<String, XarError> {
    let begin_marker = format!("BEGIN {section}");
    let end_marker = format!("END {section}");
    let begin = pem
        .find(begin_marker.as_str())
        .ok_or_else(|| XarError::MissingPemSection(section.to_string()))?;
    let body_start = pem[begin..]
        .find('\n')
        .map(|i| begin + i + 1)
        .unwrap_or(pem.len());
    let end = pem[body_start..]
        .find(end_marker.as_str())
        .map(|i| body_start + i)
        .ok_or_else(|| XarError::MissingPemSection(section.to_string()))?;
    let body: String = pem[body_start..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if body.is_empty() {
        return Err(XarError::MissingPemSection(section.to_string()));
    }
    // Sanity-check that what we extracted is actually base64 — a
    // corrupted or truncated PEM should fail here rather than silently
    // being embedded into the TOC.
    Base64::decode_vec(&body)
        .map_err(|_| XarError::MissingPemSection(section.to_string()))?;
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERT: &str = "\
-----BEGIN CERTIFICATE-----
MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA
-----END CERTIFICATE-----
";

    #[test]
    fn extracts_clean_body() {
        let body = extract_section(CERT, "CERTIFICATE").unwrap();
        assert_eq!(
            body,
            "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA"
        );
    }

    #[test]
    fn tolerates_surrounding_noise() {
        let noisy = format!(
            "Bag Attributes\n    friendlyName: leaf\n{CERT}\nsome trailing comment\n"
        );
        let clean = extract_section(CERT, "CERTIFICATE").unwrap();
        let from_noisy = extract_section(&noisy, "CERTIFICATE").unwrap();
        assert_eq!(clean, from_noisy);
    }

    #[test]
    fn fails_on_missing_section() {
        match extract_section("no certificate here", "CERTIFICATE") {
            Err(XarError::MissingPemSection(_)) => {}
            other => panic!("expected MissingPemSection, got {other:?}"),
        }
    }

    #[test]
    fn fails_on_empty_body() {
        let empty = "-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n";
        match extract_section(empty, "CERTIFICATE") {
            Err(XarError::MissingPemSection(_)) => {}
            other => panic!("expected MissingPemSection, got {other:?}"),
        }
    }

    #[test]
    fn only_returns_first_section() {
        let two = format!("{CERT}\n{CERT}");
        let body = extract_section(&two, "CERTIFICATE").unwrap();
        assert_eq!(body, "MIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8AMIIBCgKCAQEA");
    }
}
