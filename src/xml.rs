//! The table of contents: its in-memory shape and XML (de)serialization.

use std::fmt::Display;
use std::fmt::Formatter;
use std::time::SystemTime;

use chrono::format::SecondsFormat;
use chrono::DateTime;
use chrono::Utc;
use quick_xml::de::from_str;
use quick_xml::se::to_writer;
use serde::ser::SerializeStruct;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;

use crate::compression::ENCODING_STYLE;
use crate::Checksum;
use crate::XarError;

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const CHECKSUM_STYLE: &str = "sha1";
const SIGNATURE_STYLE: &str = "RSA";
const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

/// The root `<xar>` element.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename = "xar")]
pub struct Xar {
    /// The table of contents.
    pub toc: Toc,
}

/// The `<toc>` element.
///
/// Field order matches the wire contract: creation time, checksum,
/// optional signature metadata, then the file forest.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename = "toc")]
pub struct Toc {
    #[serde(rename = "creation-time")]
    pub creation_time: Timestamp,
    pub checksum: TocChecksum,
    #[serde(
        rename = "signature-creation-time",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub signature_creation_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<TocSignature>,
    #[serde(rename = "file", default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<TocFile>,
}

/// The `<checksum>` element describing the TOC-checksum heap slot.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "checksum")]
pub struct TocChecksum {
    #[serde(rename = "@style")]
    pub style: String,
    pub size: u64,
    pub offset: u64,
}

impl TocChecksum {
    /// The fixed checksum slot: offset 0, size 20 (a SHA-1 digest).
    pub fn sha1() -> Self {
        Self {
            style: CHECKSUM_STYLE.into(),
            size: Checksum::LEN as u64,
            offset: 0,
        }
    }
}

/// The `<signature>` element.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "signature")]
pub struct TocSignature {
    #[serde(rename = "@style")]
    pub style: String,
    pub offset: u64,
    pub size: u64,
    #[serde(rename = "KeyInfo")]
    pub key_info: KeyInfo,
}

impl TocSignature {
    /// Build the signature element for an RSA signature of `size` bytes
    /// reserved right after the checksum slot, embedding `certificates`
    /// leaf-first.
    pub fn rsa(size: u64, certificates: Vec<String>) -> Self {
        Self {
            style: SIGNATURE_STYLE.into(),
            offset: Checksum::LEN as u64,
            size,
            key_info: KeyInfo {
                data: X509Data {
                    certificates: certificates
                        .into_iter()
                        .map(|data| X509Certificate { data })
                        .collect(),
                },
            },
        }
    }
}

/// The `<KeyInfo>` element. Always serializes with the xmldsig namespace.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "KeyInfo")]
pub struct KeyInfo {
    #[serde(rename = "X509Data")]
    pub data: X509Data,
}

impl Serialize for KeyInfo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("KeyInfo", 2)?;
        state.serialize_field("@xmlns", XMLDSIG_NAMESPACE)?;
        state.serialize_field("X509Data", &self.data)?;
        state.end()
    }
}

/// The `<X509Data>` element: an ordered list of certificates.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "X509Data")]
pub struct X509Data {
    #[serde(
        rename = "X509Certificate",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub certificates: Vec<X509Certificate>,
}

/// A single `<X509Certificate>` element: the base64 body of one PEM
/// certificate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "X509Certificate")]
pub struct X509Certificate {
    #[serde(rename = "$value")]
    pub data: String,
}

/// A `<file>` element: either a file (carrying `<data>`) or a directory
/// (carrying nested `<file>` children).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename = "file")]
pub struct TocFile {
    #[serde(rename = "@id")]
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryType,
    #[serde(rename = "file", default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TocFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<TocData>,
}

/// Discriminates a [`TocFile`] as a file or a directory.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// A regular file.
    #[serde(rename = "file")]
    File,
    /// A directory.
    #[serde(rename = "directory")]
    Directory,
}

/// The `<data>` element: a file's location within the heap and its
/// checksums.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "data")]
pub struct TocData {
    pub offset: u64,
    pub size: u64,
    pub length: u64,
    #[serde(rename = "archived-checksum")]
    pub archived_checksum: ChecksumElement,
    #[serde(rename = "extracted-checksum")]
    pub extracted_checksum: ChecksumElement,
    pub encoding: Encoding,
}

/// A checksum value together with its algorithm name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChecksumElement {
    #[serde(rename = "@style")]
    pub style: String,
    #[serde(rename = "$value")]
    pub value: Checksum,
}

impl From<Checksum> for ChecksumElement {
    fn from(value: Checksum) -> Self {
        Self {
            style: CHECKSUM_STYLE.into(),
            value,
        }
    }
}

/// The `<encoding>` element: the payload's compression MIME type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename = "encoding")]
pub struct Encoding {
    #[serde(rename = "@style")]
    pub style: String,
}

impl Default for Encoding {
    fn default() -> Self {
        Self {
            style: ENCODING_STYLE.into(),
        }
    }
}

/// A UTC instant, serialized as an RFC 3339 string with second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp(pub SystemTime);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self(SystemTime::now())
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let date_time: DateTime<Utc> = self.0.into();
        write!(f, "{}", date_time.to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let t = DateTime::parse_from_rfc3339(&s).map_err(serde::de::Error::custom)?;
        Ok(Self(t.to_utc().into()))
    }
}

/// Serialize `xar` to a complete XML document, including the `<?xml?>`
/// declaration.
pub fn to_xml_string(xar: &Xar) -> Result<String, XarError> {
    let mut out = String::new();
    out.push_str(XML_DECLARATION);
    to_writer(&mut out, xar).map_err(|e| XarError::CompressionFailed(e.to_string()))?;
    Ok(out)
}

/// Parse a complete TOC XML document (declaration and all) back into a
/// [`Xar`] value.
pub fn from_xml_str(text: &str) -> Result<Xar, XarError> {
    from_str(text).map_err(|e| XarError::CompressionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toc() -> Toc {
        Toc {
            creation_time: Timestamp::now(),
            checksum: TocChecksum::sha1(),
            signature_creation_time: None,
            signature: None,
            files: vec![TocFile {
                id: 1,
                name: "a.txt".into(),
                kind: EntryType::File,
                children: Vec::new(),
                data: Some(TocData {
                    offset: 20,
                    size: 5,
                    length: 7,
                    archived_checksum: Checksum::hash(b"xxxxxxx").into(),
                    extracted_checksum: Checksum::hash(b"hello").into(),
                    encoding: Encoding::default(),
                }),
            }],
        }
    }

    #[test]
    fn round_trips_through_xml() {
        let toc = sample_toc();
        let xml = to_xml_string(&Xar { toc: toc.clone() }).unwrap();
        assert!(xml.starts_with(XML_DECLARATION));
        let parsed = from_xml_str(&xml).unwrap();
        assert_eq!(parsed.toc, toc);
    }

    #[test]
    fn encoding_style_is_x_gzip() {
        assert_eq!(Encoding::default().style, "application/x-gzip");
    }

    #[test]
    fn file_element_has_no_data_when_directory() {
        let toc = Toc {
            creation_time: Timestamp::now(),
            checksum: TocChecksum::sha1(),
            signature_creation_time: None,
            signature: None,
            files: vec![TocFile {
                id: 1,
                name: "d".into(),
                kind: EntryType::Directory,
                children: vec![TocFile {
                    id: 2,
                    name: "empty".into(),
                    kind: EntryType::File,
                    children: Vec::new(),
                    data: None,
                }],
                data: None,
            }],
        };
        let xml = to_xml_string(&Xar { toc }).unwrap();
        assert!(xml.contains("<type>directory</type>"));
        assert!(xml.contains("<type>file</type>"));
        assert!(!xml.contains("<data>"));
    }

    #[test]
    fn signature_embeds_namespace() {
        let toc = Toc {
            creation_time: Timestamp::now(),
            checksum: TocChecksum::sha1(),
            signature_creation_time: Some("123.0".into()),
            signature: Some(TocSignature::rsa(256, vec!["Zm9v".into()])),
            files: Vec::new(),
        };
        let xml = to_xml_string(&Xar { toc }).unwrap();
        assert!(xml.contains(XMLDSIG_NAMESPACE));
        assert!(xml.contains("<X509Certificate>Zm9v</X509Certificate>"));
        assert!(xml.contains("<signature-creation-time>123.0</signature-creation-time>"));
    }
}
