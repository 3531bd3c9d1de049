//! The in-memory file forest handed to the archive generator.
//!
//! Building this tree from an actual directory on disk is an external
//! concern (see the crate's top-level docs): this module only defines the
//! node shapes and the depth-first walk over them.

use std::path::Path;
use std::path::PathBuf;

use crate::Checksum;

/// A node in the input forest: either a regular file or a directory.
///
/// Every node optionally carries an `id`, a positive integer unique within
/// the archive. Ids may be pre-assigned by the caller; unassigned ids
/// (`None`) are filled in during generation, in depth-first traversal
/// order.
#[derive(Debug, Clone)]
pub enum FileNode {
    /// A regular file entry.
    File(FileEntry),
    /// A directory and its children.
    Directory(DirectoryEntry),
}

impl FileNode {
    /// Create a new file entry node.
    pub fn file<P: Into<PathBuf>>(name: impl Into<String>, src_path: P, size: u64) -> Self {
        Self::File(FileEntry::new(name, src_path, size))
    }

    /// Create a new directory entry node.
    pub fn directory<P: Into<PathBuf>>(
        name: impl Into<String>,
        src_path: P,
        children: Vec<FileNode>,
    ) -> Self {
        Self::Directory(DirectoryEntry {
            id: None,
            name: name.into(),
            src_path: src_path.into(),
            children,
        })
    }

    /// This node's basename.
    pub fn name(&self) -> &str {
        match self {
            Self::File(entry) => &entry.name,
            Self::Directory(entry) => &entry.name,
        }
    }

    /// This node's source path, as given by the caller at construction
    /// time.
    ///
    /// Descendants carry their own `src_path`; it is never derived by
    /// joining a parent path with a child's name.
    pub fn src_path(&self) -> &Path {
        match self {
            Self::File(entry) => &entry.src_path,
            Self::Directory(entry) => &entry.src_path,
        }
    }

    /// This node's id, if one has been assigned.
    pub fn id(&self) -> Option<u64> {
        match self {
            Self::File(entry) => entry.id,
            Self::Directory(entry) => entry.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: u64) {
        match self {
            Self::File(entry) => entry.id = Some(id),
            Self::Directory(entry) => entry.id = Some(id),
        }
    }
}

/// A regular file entry: a basename, the path its bytes should be read
/// from, and the metadata tracked about its payload.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub(crate) id: Option<u64>,
    /// File basename, as recorded in the TOC.
    pub name: String,
    /// Source path passed to the `file_data_provider` callback during
    /// generation.
    pub src_path: PathBuf,
    /// Payload metadata: size, and (after generation) offset, length, and
    /// checksums.
    pub data: FileData,
}

impl FileEntry {
    /// Create a new file entry with a known uncompressed size and no id
    /// assigned yet.
    pub fn new<P: Into<PathBuf>>(name: impl Into<String>, src_path: P, size: u64) -> Self {
        Self {
            id: None,
            name: name.into(),
            src_path: src_path.into(),
            data: FileData::new(size),
        }
    }

    /// Pre-assign an id to this entry.
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    /// Preset this entry's heap layout and compressed payload, so
    /// [`crate::generate`]'s layout pass trusts `offset`/`compressed`
    /// as-is instead of calling the `file_data_provider` and recompressing.
    ///
    /// `compressed`'s length becomes `length`; `offset` must already
    /// account for this entry's position among its siblings (the
    /// generator still asserts heap contiguity across all entries).
    pub fn with_precomputed_layout(
        mut self,
        offset: u64,
        compressed: Vec<u8>,
        archived_checksum: Checksum,
        extracted_checksum: Checksum,
    ) -> Self {
        self.data.offset = offset;
        self.data.length = compressed.len() as u64;
        self.data.archived_checksum = Some(archived_checksum);
        self.data.extracted_checksum = Some(extracted_checksum);
        self.data.laid_out = true;
        self.data.preset_payload = Some(compressed);
        self
    }

    /// This entry's id, if one has been assigned.
    pub fn id(&self) -> Option<u64> {
        self.id
    }
}

/// A directory entry: a basename, its (largely vestigial) source path, and
/// an ordered sequence of children.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub(crate) id: Option<u64>,
    /// Directory basename, as recorded in the TOC.
    pub name: String,
    /// Source path; directories carry one for symmetry with files, but it
    /// is not read from during generation.
    pub src_path: PathBuf,
    /// Children, in the order they should appear in the TOC.
    pub children: Vec<FileNode>,
}

impl DirectoryEntry {
    /// This entry's id, if one has been assigned.
    pub fn id(&self) -> Option<u64> {
        self.id
    }
}

/// Per-file payload metadata.
///
/// `size` is known up front; `length`, `offset`, and the two checksums are
/// normally filled in by the generator during heap layout planning (§4.8,
/// Pass 2). A caller that already has a compressed payload in hand (for
/// instance, re-generating an archive whose unchanged entries were laid
/// out by an earlier `generate` call) may instead preset all of this via
/// [`FileEntry::with_precomputed_layout`]; the generator then trusts the
/// preset offset and length and skips reading and compressing that entry.
#[derive(Debug, Clone, Default)]
pub struct FileData {
    /// Uncompressed byte length.
    pub size: u64,
    pub(crate) length: u64,
    pub(crate) offset: u64,
    pub(crate) archived_checksum: Option<Checksum>,
    pub(crate) extracted_checksum: Option<Checksum>,
    pub(crate) laid_out: bool,
    pub(crate) preset_payload: Option<Vec<u8>>,
}

impl FileData {
    /// Create fresh, unlaid-out metadata for a file of the given
    /// uncompressed size.
    pub fn new(size: u64) -> Self {
        Self {
            size,
            ..Default::default()
        }
    }

    /// Compressed byte length, after layout.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Byte offset within the heap, after layout.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// SHA-1 of the compressed bytes, after layout.
    pub fn archived_checksum(&self) -> Option<Checksum> {
        self.archived_checksum
    }

    /// SHA-1 of the uncompressed bytes, after layout.
    pub fn extracted_checksum(&self) -> Option<Checksum> {
        self.extracted_checksum
    }

    /// Whether this entry already has offset, length, and checksums set,
    /// either from a prior layout pass or from
    /// [`FileEntry::with_precomputed_layout`].
    pub fn is_laid_out(&self) -> bool {
        self.laid_out
    }

    /// Take the preset compressed payload, if this entry was built via
    /// [`FileEntry::with_precomputed_layout`] and hasn't been emitted yet.
    pub(crate) fn take_preset_payload(&mut self) -> Option<Vec<u8>> {
        self.preset_payload.take()
    }
}

/// Depth-first walk over a forest of roots, yielding `(source_path, node)`
/// pairs in the order files would be compressed and written (before id
/// assignment reorders file payloads by id).
pub fn walk(roots: &[FileNode]) -> Vec<(&Path, &FileNode)> {
    let mut out = Vec::new();
    walk_into(roots, &mut out);
    out
}

fn walk_into<'a>(nodes: &'a [FileNode], out: &mut Vec<(&'a Path, &'a FileNode)>) {
    for node in nodes {
        out.push((node.src_path(), node));
        if let FileNode::Directory(dir) = node {
            walk_into(&dir.children, out);
        }
    }
}

/// Maximum pre-assigned id across the forest (0 if none are assigned).
pub(crate) fn max_assigned_id(roots: &[FileNode]) -> u64 {
    let mut max_id = 0;
    fn visit(nodes: &[FileNode], max_id: &mut u64) {
        for node in nodes {
            if let Some(id) = node.id() {
                *max_id = (*max_id).max(id);
            }
            if let FileNode::Directory(dir) = node {
                visit(&dir.children, max_id);
            }
        }
    }
    visit(roots, &mut max_id);
    max_id
}

/// Assign ids to every node lacking one, in depth-first traversal order,
/// starting one past the highest pre-assigned id.
pub(crate) fn assign_ids(roots: &mut [FileNode]) {
    let mut next_id = max_assigned_id(roots) + 1;
    fn visit(nodes: &mut [FileNode], next_id: &mut u64) {
        for node in nodes {
            if node.id().is_none() {
                node.set_id(*next_id);
                *next_id += 1;
            }
            if let FileNode::Directory(dir) = node {
                visit(&mut dir.children, next_id);
            }
        }
    }
    visit(roots, &mut next_id);
}

/// Collect mutable references to every file entry in the forest, in
/// depth-first traversal order.
pub(crate) fn collect_file_entries_mut(roots: &mut [FileNode]) -> Vec<&mut FileEntry> {
    fn visit<'a>(nodes: &'a mut [FileNode], out: &mut Vec<&'a mut FileEntry>) {
        for node in nodes {
            match node {
                FileNode::File(entry) => out.push(entry),
                FileNode::Directory(dir) => visit(&mut dir.children, out),
            }
        }
    }
    let mut out = Vec::new();
    visit(roots, &mut out);
    out
}
