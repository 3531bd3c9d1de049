use std::io::Read;
use std::io::Write;

use crate::XarError;

/// The fixed 28-byte header that precedes every xar archive.
///
/// Unlike the on-disk format's general allowance for a variable-length
/// trailer naming a non-standard checksum algorithm, this core only ever
/// emits [`CHECKSUM_ALGO_SHA1`], so the header is always exactly
/// [`Header::LEN`] bytes (checksum algorithms other than SHA-1 are a
/// Non-goal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(test, derive(arbitrary::Arbitrary))]
pub struct Header {
    /// Compressed TOC length, in bytes.
    pub toc_len_compressed: u64,
    /// Uncompressed TOC length, in bytes.
    pub toc_len_uncompressed: u64,
}

/// SHA-1, the only checksum algorithm id this core writes or accepts.
pub const CHECKSUM_ALGO_SHA1: u32 = 1;

const MAGIC: [u8; 4] = *b"xar!";
const VERSION: u16 = 1;

impl Header {
    /// Size of the encoded header, in bytes.
    pub const LEN: usize = 4 + 2 + 2 + 8 + 8 + 4;

    /// Decode a header from its 28-byte big-endian representation.
    pub fn decode<R: Read>(mut reader: R) -> Result<Self, XarError> {
        let mut bytes = [0_u8; Self::LEN];
        reader.read_exact(&mut bytes[..])?;
        if bytes[0..4] != MAGIC[..] {
            return Err(XarError::InvalidMagic);
        }
        let header_len = u16::from_be_bytes([bytes[4], bytes[5]]) as usize;
        if header_len < Self::LEN {
            return Err(XarError::HeaderTooSmall);
        }
        let toc_len_compressed =
            u64::from_be_bytes(bytes[8..16].try_into().unwrap_or([0_u8; 8]));
        let toc_len_uncompressed =
            u64::from_be_bytes(bytes[16..24].try_into().unwrap_or([0_u8; 8]));
        let checksum_algo = u32::from_be_bytes(bytes[24..28].try_into().unwrap_or([0_u8; 4]));
        if checksum_algo != CHECKSUM_ALGO_SHA1 {
            return Err(XarError::UnsupportedChecksumAlgo);
        }
        // A conformant writer never pads the header beyond `LEN` for
        // checksum algo 1, but a lenient reader still skips any trailer
        // it is told about rather than leaving the stream misaligned.
        if header_len > Self::LEN {
            let mut trailer = reader.take((header_len - Self::LEN) as u64);
            std::io::copy(&mut trailer, &mut std::io::sink())?;
        }
        Ok(Self {
            toc_len_compressed,
            toc_len_uncompressed,
        })
    }

    /// Encode the header to its 28-byte big-endian representation and write
    /// it out.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), XarError> {
        writer.write_all(&MAGIC[..])?;
        writer.write_all(&(Self::LEN as u16).to_be_bytes()[..])?;
        writer.write_all(&VERSION.to_be_bytes()[..])?;
        writer.write_all(&self.toc_len_compressed.to_be_bytes()[..])?;
        writer.write_all(&self.toc_len_uncompressed.to_be_bytes()[..])?;
        writer.write_all(&CHECKSUM_ALGO_SHA1.to_be_bytes()[..])?;
        Ok(())
    }

    /// Encode the header to an owned 28-byte array.
    pub fn encode(&self) -> [u8; Self::LEN] {
        let mut out = [0_u8; Self::LEN];
        let mut cursor = &mut out[..];
        // Writing into a `&mut [u8]` only fails on short buffers, and `out`
        // is always exactly `LEN` bytes.
        let _ = self.write(&mut cursor);
        out
    }
}

#[cfg(test)]
mod tests {
    use arbtest::arbtest;

    use super::*;

    #[test]
    fn round_trip() {
        arbtest(|u| {
            let expected: Header = u.arbitrary()?;
            let encoded = expected.encode();
            let actual = Header::decode(&encoded[..]).unwrap();
            assert_eq!(expected, actual);
            Ok(())
        });
    }

    #[test]
    fn magic_is_first_four_bytes() {
        let header = Header {
            toc_len_compressed: 42,
            toc_len_uncompressed: 100,
        };
        let encoded = header.encode();
        assert_eq!(&encoded[0..4], b"xar!");
        assert_eq!(encoded.len(), Header::LEN);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = [0_u8; Header::LEN];
        bytes[0..4].copy_from_slice(b"zzzz");
        match Header::decode(&bytes[..]) {
            Err(XarError::InvalidMagic) => {}
            other => panic!("expected InvalidMagic, got {other:?}"),
        }
    }

    #[test]
    fn rejects_short_header_size() {
        let mut header = Header {
            toc_len_compressed: 1,
            toc_len_uncompressed: 1,
        }
        .encode();
        // Declare a header size smaller than the fixed layout.
        header[4..6].copy_from_slice(&27_u16.to_be_bytes());
        match Header::decode(&header[..]) {
            Err(XarError::HeaderTooSmall) => {}
            other => panic!("expected HeaderTooSmall, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unsupported_checksum_algo() {
        let mut header = Header {
            toc_len_compressed: 1,
            toc_len_uncompressed: 1,
        }
        .encode();
        header[24..28].copy_from_slice(&3_u32.to_be_bytes());
        match Header::decode(&header[..]) {
            Err(XarError::UnsupportedChecksumAlgo) => {}
            other => panic!("expected UnsupportedChecksumAlgo, got {other:?}"),
        }
    }
}
