use std::io;

use thiserror::Error;

/// Everything that can go wrong while generating or partially reading a xar
/// archive.
#[derive(Debug, Error)]
pub enum XarError {
    /// A file node had no name, or a file entry's declared size did not
    /// match the number of bytes actually read from its source.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A PEM document did not contain the requested section (or the
    /// section's body was empty).
    #[error("missing PEM section: {0}")]
    MissingPemSection(String),

    /// The private key PEM could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The RSA signing primitive rejected the key or the input.
    #[error("failed to sign: {0}")]
    SignFailed(String),

    /// Deflate or inflate reported an error.
    #[error("compression failed: {0}")]
    CompressionFailed(String),

    /// The underlying reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The stored TOC checksum does not match the computed one.
    #[error("toc checksum mismatch")]
    ChecksumMismatch,

    /// The decompressed TOC length does not match the header's declared
    /// uncompressed length.
    #[error("toc length mismatch")]
    TocLengthMismatch,

    /// The first four bytes of the archive are not `xar!`.
    #[error("invalid magic")]
    InvalidMagic,

    /// The header declares a size smaller than the fixed 28-byte layout.
    #[error("header too small")]
    HeaderTooSmall,

    /// The header declares a checksum algorithm other than SHA-1.
    #[error("unsupported checksum algorithm")]
    UnsupportedChecksumAlgo,
}

impl From<XarError> for io::Error {
    fn from(other: XarError) -> Self {
        match other {
            XarError::Io(e) => e,
            other => io::Error::other(other),
        }
    }
}

/// Convenience alias used throughout the crate's public API.
pub type Result<T> = std::result::Result<T, XarError>;
