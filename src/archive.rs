//! Generating a xar archive from an in-memory file forest.
//!
//! This only ever writes archives; reading one back (beyond the header and
//! TOC, see [`crate::reader`]) is out of scope for this core.

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use crate::checksum::Checksum;
use crate::compression;
use crate::header::Header;
use crate::signer::Signer;
use crate::tree;
use crate::tree::FileNode;
use crate::xml;
use crate::XarError;

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the epoch xar
/// reckons `signature-creation-time` from.
const MAC_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Write a xar archive for `roots` to `writer`, signing the TOC with
/// `signer` (use [`crate::signer::NoSigner`] for an unsigned archive).
///
/// `file_data_provider` is called once per file entry, in ascending id
/// order, and must return exactly `entry.data.size` bytes; it is the
/// caller's responsibility to read these bytes from wherever `src_path`
/// names (typically, but not necessarily, a filesystem path).
///
/// Returns the input forest with ids assigned and per-file layout metadata
/// (offset, length, checksums) filled in, for callers that want to inspect
/// what was written.
pub fn generate<W, F>(
    mut writer: W,
    mut roots: Vec<FileNode>,
    signer: &dyn Signer,
    mut file_data_provider: F,
) -> Result<Vec<FileNode>, XarError>
where
    W: Write,
    F: FnMut(&Path) -> Result<Vec<u8>, XarError>,
{
    // Pass 1: assign ids depth-first to every node lacking one.
    tree::assign_ids(&mut roots);

    // Pass 2: plan heap layout. The checksum slot always occupies the first
    // 20 bytes of the heap; an optional signature slot follows it; file
    // payloads are laid out after that, in ascending id order.
    let signature_len = signer.signature_len() as u64;
    let mut heap_cursor = Checksum::LEN as u64 + signature_len;
    let mut payloads: HashMap<u64, Vec<u8>> = HashMap::new();
    {
        let mut entries = tree::collect_file_entries_mut(&mut roots);
        entries.sort_by_key(|entry| entry.id().unwrap_or(0));
        for entry in entries {
            // An entry with a preset offset already carries its compressed
            // payload and checksums (see `FileEntry::with_precomputed_layout`);
            // trust it instead of reading and recompressing.
            if entry.data.is_laid_out() {
                let compressed = entry.data.take_preset_payload().unwrap_or_default();
                debug_assert_eq!(entry.data.offset(), heap_cursor);
                heap_cursor += compressed.len() as u64;
                payloads.insert(entry.id().unwrap_or(0), compressed);
                continue;
            }
            let raw = file_data_provider(&entry.src_path)?;
            if raw.len() as u64 != entry.data.size {
                return Err(XarError::InvalidInput(format!(
                    "{}: declared size {} does not match {} bytes read",
                    entry.name,
                    entry.data.size,
                    raw.len()
                )));
            }
            let compressed = compression::compress(&raw)?;
            entry.data.extracted_checksum = Some(Checksum::hash(&raw));
            entry.data.archived_checksum = Some(Checksum::hash(&compressed));
            entry.data.offset = heap_cursor;
            entry.data.length = compressed.len() as u64;
            entry.data.laid_out = true;
            heap_cursor += compressed.len() as u64;
            payloads.insert(entry.id().unwrap_or(0), compressed);
        }
    }

    // Pass 3: build and serialize the TOC.
    let (signature_creation_time, signature_element) = if signature_len > 0 {
        (
            Some(signature_creation_time()),
            Some(xml::TocSignature::rsa(
                signature_len,
                signer.certificates().to_vec(),
            )),
        )
    } else {
        (None, None)
    };
    let toc = xml::Toc {
        creation_time: xml::Timestamp::now(),
        checksum: xml::TocChecksum::sha1(),
        signature_creation_time,
        signature: signature_element,
        files: roots.iter().map(to_toc_file).collect(),
    };
    let toc_xml = xml::to_xml_string(&xml::Xar { toc })?;
    let toc_xml_bytes = toc_xml.into_bytes();
    let compressed_toc = compression::compress(&toc_xml_bytes)?;

    // Pass 4: emit header, TOC, checksum, optional signature, then payloads.
    let header = Header {
        toc_len_compressed: compressed_toc.len() as u64,
        toc_len_uncompressed: toc_xml_bytes.len() as u64,
    };
    header.write(&mut writer)?;
    writer.write_all(&compressed_toc)?;

    let toc_digest = Checksum::hash(&compressed_toc);
    writer.write_all(toc_digest.as_bytes())?;

    if signature_len > 0 {
        let signature_bytes = signer.sign(&compressed_toc)?;
        debug_assert_eq!(signature_bytes.len() as u64, signature_len);
        writer.write_all(&signature_bytes)?;
    }

    let mut files: Vec<&tree::FileEntry> = tree::walk(&roots)
        .into_iter()
        .filter_map(|(_, node)| match node {
            FileNode::File(entry) => Some(entry),
            FileNode::Directory(_) => None,
        })
        .collect();
    files.sort_by_key(|entry| entry.id().unwrap_or(0));

    let mut written = Checksum::LEN as u64 + signature_len;
    for entry in files {
        let payload = payloads
            .get(&entry.id().unwrap_or(0))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        // Programmer-error indicator per §4.8 Pass 4: a divergence here means
        // layout planning and emission disagree, not that the input is bad.
        debug_assert_eq!(entry.data.offset(), written);
        writer.write_all(payload)?;
        written += payload.len() as u64;
    }

    Ok(roots)
}

fn to_toc_file(node: &FileNode) -> xml::TocFile {
    match node {
        FileNode::File(entry) => xml::TocFile {
            id: entry.id().unwrap_or(0),
            name: entry.name.clone(),
            kind: xml::EntryType::File,
            children: Vec::new(),
            data: Some(xml::TocData {
                offset: entry.data.offset(),
                size: entry.data.size,
                length: entry.data.length(),
                archived_checksum: entry
                    .data
                    .archived_checksum()
                    .unwrap_or_else(|| Checksum::hash(&[]))
                    .into(),
                extracted_checksum: entry
                    .data
                    .extracted_checksum()
                    .unwrap_or_else(|| Checksum::hash(&[]))
                    .into(),
                encoding: xml::Encoding::default(),
            }),
        },
        FileNode::Directory(dir) => xml::TocFile {
            id: dir.id().unwrap_or(0),
            name: dir.name.clone(),
            kind: xml::EntryType::Directory,
            children: dir.children.iter().map(to_toc_file).collect(),
            data: None,
        },
    }
}

fn signature_creation_time() -> String {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = since_epoch.as_secs() as i64 - MAC_EPOCH_OFFSET_SECS;
    // Apple's tooling renders this with one-decimal-place precision, not
    // full nanosecond precision.
    let tenths = since_epoch.subsec_nanos() / 100_000_000;
    format!("{secs}.{tenths}")
}
