//! BBlob recursive fanout tree: a balanced 64-ary tree of leaf Blobs.
//! Grounded on `write_bblob`/`write_bblob_tree`/`read_bblob`/`bblob_size` in
//! `original_source/bblob.c`.

use crate::chunk::split_bblob;
use crate::errors::{Error, Result};
use crate::hash::ObjectId;
use crate::object::ObjectKind;
use crate::store::{LooseObjectStore, StoreOptions};

pub const FANOUT: usize = 64;

/// Chunks `data` with the BBlob chunker and writes the resulting leaves and
/// fanout tree, returning the root oid. Leaves below `CHUNK_GOAL` only
/// occur as the final leaf of the stream.
pub fn write_bblob(store: &LooseObjectStore, data: &[u8]) -> Result<ObjectId> {
    let algo = store.algo();
    let ranges = split_bblob(data, algo);

    let mut leaf_oids = Vec::with_capacity(ranges.len());
    for r in ranges {
        // `no_chunk`: these are the leaves themselves, writing them must not
        // re-trigger chunking (spec.md §9's per-call recursion fence).
        let oid =
            store.store_with_options(&ObjectKind::Blob, &data[r], StoreOptions { no_chunk: true })?;
        leaf_oids.push(oid);
    }

    write_bblob_tree(store, &leaf_oids)
}

/// Writes one level of the fanout tree for `oids`, recursing until the
/// group count fits in a single `FANOUT`-wide node. Depth is `ceil(log64 n)`.
pub fn write_bblob_tree(store: &LooseObjectStore, oids: &[ObjectId]) -> Result<ObjectId> {
    let rawsz = store.algo().rawsz();

    if oids.len() <= FANOUT {
        let mut raw = vec![0u8; FANOUT * rawsz];
        for (i, oid) in oids.iter().enumerate() {
            raw[i * rawsz..(i + 1) * rawsz].copy_from_slice(oid.as_bytes());
        }
        return store.store_with_options(&ObjectKind::BBlob, &raw, StoreOptions { no_chunk: true });
    }

    let mut group_oids = Vec::with_capacity(oids.len().div_ceil(FANOUT));
    for group in oids.chunks(FANOUT) {
        group_oids.push(write_bblob_tree(store, group)?);
    }
    write_bblob_tree(store, &group_oids)
}

/// Reads an oid back into bytes, recursing through BBlob nodes and
/// concatenating leaf Blobs in order. Null slots are skipped.
pub fn read_bblob(store: &LooseObjectStore, oid: &ObjectId) -> Result<Vec<u8>> {
    let obj = store.read(oid)?;
    match obj.kind {
        ObjectKind::Blob => Ok(obj.payload.to_vec()),
        ObjectKind::BBlob => {
            let rawsz = oid.rawsz();
            let algo = oid.algo();
            let mut out = Vec::new();
            for slot in obj.payload.chunks(rawsz) {
                if slot.len() != rawsz {
                    return Err(Error::InvalidFormat(
                        "bblob node payload not a multiple of rawsz".into(),
                    ));
                }
                let child = ObjectId::from_raw(algo, slot.to_vec())?;
                if child.is_null() {
                    continue;
                }
                out.extend(read_bblob(store, &child)?);
            }
            Ok(out)
        }
        other => Err(Error::CorruptType {
            oid: oid.clone(),
            expected: "blob or bblob",
            found: other.name().to_string(),
        }),
    }
}

/// Same traversal as [`read_bblob`] but summing sizes only, without
/// allocating a concatenation buffer.
pub fn size_bblob(store: &LooseObjectStore, oid: &ObjectId) -> Result<u64> {
    let obj = store.read(oid)?;
    match obj.kind {
        ObjectKind::Blob => Ok(obj.payload.len() as u64),
        ObjectKind::BBlob => {
            let rawsz = oid.rawsz();
            let algo = oid.algo();
            let mut total = 0u64;
            for slot in obj.payload.chunks(rawsz) {
                if slot.len() != rawsz {
                    return Err(Error::InvalidFormat(
                        "bblob node payload not a multiple of rawsz".into(),
                    ));
                }
                let child = ObjectId::from_raw(algo, slot.to_vec())?;
                if child.is_null() {
                    continue;
                }
                total += size_bblob(store, &child)?;
            }
            Ok(total)
        }
        other => Err(Error::CorruptType {
            oid: oid.clone(),
            expected: "blob or bblob",
            found: other.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgo;
    use tempfile::tempdir;

    #[test]
    fn small_blob_single_leaf_root() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha256).unwrap();

        let data = vec![0xAAu8; 100];
        let root = write_bblob(&store, &data).unwrap();

        let obj = store.read(&root).unwrap();
        assert_eq!(obj.kind, ObjectKind::BBlob);
        assert_eq!(obj.payload.len(), FANOUT * store.algo().rawsz());

        let rawsz = store.algo().rawsz();
        let slot0 = &obj.payload[0..rawsz];
        assert_ne!(slot0, vec![0u8; rawsz].as_slice());
        for slot in obj.payload.chunks(rawsz).skip(1) {
            assert_eq!(slot, vec![0u8; rawsz].as_slice());
        }

        let roundtripped = read_bblob(&store, &root).unwrap();
        assert_eq!(roundtripped, data);
        assert_eq!(size_bblob(&store, &root).unwrap(), 100);
    }

    #[test]
    fn empty_stream_is_all_null_root() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha1).unwrap();
        let root = write_bblob(&store, &[]).unwrap();
        assert_eq!(read_bblob(&store, &root).unwrap(), Vec::<u8>::new());
        assert_eq!(size_bblob(&store, &root).unwrap(), 0);
    }

    #[test]
    fn larger_stream_roundtrips_exactly() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha256).unwrap();

        let mut data = vec![0u8; 10_000];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i * 31 + 7) as u8;
        }

        let root = write_bblob(&store, &data).unwrap();
        assert_eq!(read_bblob(&store, &root).unwrap(), data);
        assert_eq!(size_bblob(&store, &root).unwrap(), data.len() as u64);
    }

    #[test]
    fn deep_tree_roundtrips() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha1).unwrap();

        // force many leaves so the fanout tree needs more than one level.
        let oids: Vec<ObjectId> = (0..5000u32)
            .map(|i| ObjectId::hash_object(HashAlgo::Sha1, "blob", &i.to_le_bytes()))
            .collect();
        let root = write_bblob_tree(&store, &oids).unwrap();
        let obj = store.read(&root).unwrap();
        assert_eq!(obj.kind, ObjectKind::BBlob);
    }

    #[test]
    fn corrupt_type_on_non_blob_non_bblob() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha1).unwrap();
        let oid = store
            .store(&ObjectKind::Other("commit".into()), b"not a blob")
            .unwrap();
        assert!(read_bblob(&store, &oid).is_err());
    }
}
