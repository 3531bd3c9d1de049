use std::io::Read;
use std::io::Write;

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression as DeflateLevel;

use crate::XarError;

/// The MIME type the TOC advertises for file payload encoding.
///
/// This is a format-level misnomer inherited from the real xar tooling: the
/// bytes stored are *raw* deflate (RFC 1951), with no gzip (RFC 1952)
/// framing and no zlib (RFC 1950) wrapper. Implementations must not
/// prepend the gzip magic just because the style string says "gzip".
pub const ENCODING_STYLE: &str = "application/x-gzip";

/// Compress `data` with raw deflate at the best compression level.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, XarError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), DeflateLevel::best());
    encoder
        .write_all(data)
        .map_err(|e| XarError::CompressionFailed(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| XarError::CompressionFailed(e.to_string()))
}

/// Decompress a raw deflate stream.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, XarError> {
    let mut decoder = DeflateDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| XarError::CompressionFailed(e.to_string()))?;
    Ok(out)
}
