use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;

use base16ct::HexDisplay;
use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::XarError;

/// A SHA-1 digest, stored raw and displayed as lowercase hex.
///
/// The format permits other hash algorithms, but this core standardizes on
/// SHA-1 for both the TOC checksum and the per-file archived/extracted
/// checksums (support for other algorithms is a Non-goal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(test, derive(arbitrary::Arbitrary))]
#[serde(into = "String", try_from = "String")]
pub struct Checksum([u8; Checksum::LEN]);

impl Checksum {
    /// Size of a SHA-1 digest, in bytes.
    pub const LEN: usize = 20;

    /// Hash `data` with SHA-1.
    pub fn hash(data: &[u8]) -> Self {
        let digest = Sha1::digest(data);
        Self(digest.into())
    }

    /// Build a checksum from a pre-computed 20-byte digest.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, XarError> {
        let array: [u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| XarError::InvalidInput("checksum must be 20 bytes".into()))?;
        Ok(Self(array))
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Checksum {
    fn as_ref(&self) -> &[u8] {
        &self.0[..]
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{:x}", HexDisplay(&self.0[..]))
    }
}

impl FromStr for Checksum {
    type Err = XarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use base16ct::mixed::decode;
        let s = s.trim();
        if s.len() != 2 * Self::LEN {
            return Err(XarError::InvalidInput(format!(
                "expected a {}-character hex string, got {} characters",
                2 * Self::LEN,
                s.len()
            )));
        }
        let mut bytes = [0_u8; Self::LEN];
        decode(s, &mut bytes[..])
            .map_err(|_| XarError::InvalidInput("invalid hex digest".into()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Checksum {
    type Error = XarError;
    fn try_from(other: String) -> Result<Self, Self::Error> {
        other.parse()
    }
}

impl From<Checksum> for String {
    fn from(other: Checksum) -> String {
        other.to_string()
    }
}

#[cfg(test)]
mod tests {
    use arbtest::arbtest;

    use super::*;

    #[test]
    fn known_vector() {
        // SHA-1("hello") per common reference test vectors.
        let checksum = Checksum::hash(b"hello");
        assert_eq!(
            checksum.to_string(),
            "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d"
        );
    }

    #[test]
    fn hash_len_is_twenty() {
        let checksum = Checksum::hash(b"anything");
        assert_eq!(checksum.as_bytes().len(), 20);
    }

    #[test]
    fn to_string_parse_symmetry() {
        arbtest(|u| {
            let expected: Checksum = u.arbitrary()?;
            let string = expected.to_string();
            let actual: Checksum = string.parse().unwrap();
            assert_eq!(expected, actual);
            Ok(())
        });
    }

    #[test]
    fn rejects_wrong_length() {
        assert!("deadbeef".parse::<Checksum>().is_err());
    }
}
