//! Reading back the parts of a xar archive needed to inspect one: the
//! header and the table of contents. Extracting file payloads from the
//! heap is out of scope for this core.

use std::io::Read;

use crate::checksum::Checksum;
use crate::compression;
use crate::header::Header;
use crate::xml;
use crate::XarError;

/// A decoded header and table of contents.
#[derive(Debug, Clone)]
pub struct ArchiveToc {
    /// The fixed archive header.
    pub header: Header,
    /// The table of contents, parsed from its XML.
    pub toc: xml::Toc,
}

/// Read the header and TOC from the start of a xar archive.
///
/// Verifies the stored TOC checksum against the compressed TOC bytes and
/// that the decompressed TOC matches the length the header declares, then
/// parses the TOC XML. The heap (file payloads) is left unread in
/// `reader`.
pub fn read_toc<R: Read>(mut reader: R) -> Result<ArchiveToc, XarError> {
    let header = Header::decode(&mut reader)?;

    let mut compressed_toc = vec![0_u8; header.toc_len_compressed as usize];
    reader.read_exact(&mut compressed_toc)?;

    let mut stored_checksum = [0_u8; Checksum::LEN];
    reader.read_exact(&mut stored_checksum[..])?;
    let stored_checksum = Checksum::from_bytes(&stored_checksum)?;
    let actual_checksum = Checksum::hash(&compressed_toc);
    if stored_checksum != actual_checksum {
        return Err(XarError::ChecksumMismatch);
    }

    let toc_xml_bytes = compression::decompress(&compressed_toc)?;
    if toc_xml_bytes.len() as u64 != header.toc_len_uncompressed {
        return Err(XarError::TocLengthMismatch);
    }

    let toc_xml = String::from_utf8(toc_xml_bytes)
        .map_err(|e| XarError::InvalidInput(e.to_string()))?;
    let xar = xml::from_xml_str(&toc_xml)?;

    Ok(ArchiveToc {
        header,
        toc: xar.toc,
    })
}

#[cfg(test)]
mod tests {
    use crate::signer::NoSigner;
    use crate::tree::FileNode;

    use super::*;

    #[test]
    fn reads_back_a_generated_archive() {
        let roots = vec![FileNode::file("hello.txt", "/hello.txt", 5)];
        let mut out = Vec::new();
        crate::archive::generate(&mut out, roots, &NoSigner, |_| Ok(b"hello".to_vec())).unwrap();

        let archive_toc = read_toc(&out[..]).unwrap();
        assert_eq!(archive_toc.toc.files.len(), 1);
        assert_eq!(archive_toc.toc.files[0].name, "hello.txt");
        assert_eq!(
            archive_toc.toc.files[0].data.as_ref().unwrap().size,
            5
        );
    }

    #[test]
    fn rejects_truncated_archive() {
        let roots = vec![FileNode::file("hello.txt", "/hello.txt", 5)];
        let mut out = Vec::new();
        crate::archive::generate(&mut out, roots, &NoSigner, |_| Ok(b"hello".to_vec())).unwrap();
        out.truncate(out.len() - 1);
        assert!(read_toc(&out[..]).is_err());
    }

    #[test]
    fn rejects_corrupted_toc_checksum() {
        let roots = vec![FileNode::file("hello.txt", "/hello.txt", 5)];
        let mut out = Vec::new();
        crate::archive::generate(&mut out, roots, &NoSigner, |_| Ok(b"hello".to_vec())).unwrap();
        // Flip a byte inside the compressed TOC, leaving the stored
        // checksum for the original bytes in place.
        let flip_at = Header::LEN;
        out[flip_at] ^= 0xff;
        match read_toc(&out[..]) {
            Err(XarError::ChecksumMismatch) => {}
            other => panic!("expected ChecksumMismatch, got {other:?}"),
        }
    }
}
