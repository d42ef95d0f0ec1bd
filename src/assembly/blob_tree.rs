//! BlobTree: a line-oriented manifest of hex oids, split with a cheap
//! rolling hash over raw bytes (no fixed window, unlike the BBlob chunker).
//! Grounded on `write_blob_tree_fd`/`read_blob_tree` in
//! `original_source/blob-tree.c`.

use crate::errors::{Error, Result};
use crate::hash::ObjectId;
use crate::object::ObjectKind;
use crate::store::{LooseObjectStore, StoreOptions};

const SPLIT_MASK: u32 = 0x1fff;
const MAX_CHUNK: usize = 65536;

/// Splits `data` on a rolling hash `h' = (h << 5) ^ byte`, masked to its low
/// 32 bits, cutting whenever the low 13 bits are all set or the running
/// chunk exceeds `MAX_CHUNK` bytes. Unlike the BBlob chunker this has no
/// fixed window: the hash folds in the whole chunk seen so far.
fn split_blob_tree(data: &[u8]) -> Vec<std::ops::Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0usize;
    let mut h: u32 = 0;

    for (i, &byte) in data.iter().enumerate() {
        h = h.wrapping_shl(5) ^ (byte as u32);
        if (h & SPLIT_MASK) == SPLIT_MASK || i - start + 1 > MAX_CHUNK {
            ranges.push(start..i + 1);
            start = i + 1;
            h = 0;
        }
    }

    if start < data.len() {
        ranges.push(start..data.len());
    }

    ranges
}

/// Writes `data` as a sequence of leaf Blobs, one hex oid per line in the
/// manifest, in order. The manifest itself is stored as a `BlobTree` object.
pub fn write_blob_tree(store: &LooseObjectStore, data: &[u8]) -> Result<ObjectId> {
    let mut manifest = String::new();
    for r in split_blob_tree(data) {
        let oid =
            store.store_with_options(&ObjectKind::Blob, &data[r], StoreOptions { no_chunk: true })?;
        manifest.push_str(&oid.to_hex());
        manifest.push('\n');
    }
    store.store_with_options(&ObjectKind::BlobTree, manifest.as_bytes(), StoreOptions { no_chunk: true })
}

/// Reads a `BlobTree` object back into bytes by reading each listed leaf
/// Blob in order and concatenating.
pub fn read_blob_tree(store: &LooseObjectStore, oid: &ObjectId) -> Result<Vec<u8>> {
    let obj = store.read(oid)?;
    if obj.kind != ObjectKind::BlobTree {
        return Err(Error::CorruptType {
            oid: oid.clone(),
            expected: "blob-tree",
            found: obj.kind.name().to_string(),
        });
    }

    let text = std::str::from_utf8(&obj.payload)
        .map_err(|e| Error::InvalidFormat(e.to_string()))?;

    let mut out = Vec::new();
    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        let leaf_oid = ObjectId::from_hex(oid.algo(), line)?;
        let leaf = store.read(&leaf_oid)?;
        if leaf.kind != ObjectKind::Blob {
            return Err(Error::CorruptType {
                oid: leaf_oid,
                expected: "blob",
                found: leaf.kind.name().to_string(),
            });
        }
        out.extend_from_slice(&leaf.payload);
    }
    Ok(out)
}
