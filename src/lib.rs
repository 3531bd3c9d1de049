#![doc = include_str!("../README.md")]

mod archive;
mod checksum;
mod compression;
mod error;
mod header;
mod pem;
mod reader;
mod signer;
mod tree;
mod xml;

// Re-export so callers can mint or parse RSA keys without a separate
// dependency on the same `rsa` version this crate uses.
pub use rsa;

pub use self::archive::generate;
pub use self::checksum::Checksum;
pub use self::compression::compress;
pub use self::compression::decompress;
pub use self::compression::ENCODING_STYLE;
pub use self::error::Result;
pub use self::error::XarError;
pub use self::header::Header;
pub use self::header::CHECKSUM_ALGO_SHA1;
pub use self::pem::extract_section;
pub use self::reader::read_toc;
pub use self::reader::ArchiveToc;
pub use self::signer::NoSigner;
pub use self::signer::RsaSigner;
pub use self::signer::SignatureResources;
pub use self::signer::Signer;
pub use self::tree::walk;
pub use self::tree::DirectoryEntry;
pub use self::tree::FileData;
pub use self::tree::FileEntry;
pub use self::tree::FileNode;
pub use self::xml::EntryType;
pub use self::xml::Timestamp;
pub use self::xml::Toc;
pub use self::xml::TocFile;
