//! BupChunk manifest: `"BUPCHUNK\n"` + hex whole-stream oid + `\n` +
//! zero-or-more hex chunk oids joined by `\n` with no trailing newline.
//! Grounded on the chunking rule in `original_source/bup-chunk.c`; the
//! manifest framing (magic, whole-stream oid, no-trailing-newline tail) is
//! this subsystem's richer successor format and isn't present in the
//! legacy C source, so it's built directly from the documented grammar.

use crate::chunk::split_bup;
use crate::errors::{Error, Result};
use crate::hash::ObjectId;
use crate::object::ObjectKind;
use crate::store::{LooseObjectStore, StoreOptions};

const MAGIC: &str = "BUPCHUNK\n";

/// Writes `data` chunked with the bup rolling checksum, plus a manifest
/// Blob recording the whole-stream oid and the ordered chunk oids. Returns
/// the manifest's oid.
pub fn write_bupchunk(store: &LooseObjectStore, data: &[u8]) -> Result<ObjectId> {
    let algo = store.algo();
    let whole_oid = ObjectId::hash_object(algo, "blob", data);

    let mut manifest = String::from(MAGIC);
    manifest.push_str(&whole_oid.to_hex());
    manifest.push('\n');

    let mut first = true;
    for r in split_bup(data) {
        let chunk_oid =
            store.store_with_options(&ObjectKind::Blob, &data[r], StoreOptions { no_chunk: true })?;
        if !first {
            manifest.push('\n');
        }
        manifest.push_str(&chunk_oid.to_hex());
        first = false;
    }

    store.store_with_options(&ObjectKind::Blob, manifest.as_bytes(), StoreOptions { no_chunk: true })
}

/// Parses a manifest body (without re-reading from the store), returning
/// the whole-stream oid hex and the ordered chunk oid hexes. `None` if
/// `payload` isn't a well-formed BupChunk manifest for `hexsz`.
fn parse_bupchunk(payload: &[u8], hexsz: usize) -> Option<(String, Vec<String>)> {
    let text = std::str::from_utf8(payload).ok()?;
    let rest = text.strip_prefix(MAGIC)?;
    if rest.len() < hexsz {
        return None;
    }

    let (whole_hex, after_whole) = rest.split_at(hexsz);
    if !is_hex(whole_hex) {
        return None;
    }
    let mut remainder = after_whole.strip_prefix('\n')?;

    if remainder.is_empty() {
        return Some((whole_hex.to_string(), Vec::new()));
    }

    let mut chunks = Vec::new();
    loop {
        if remainder.len() < hexsz {
            return None;
        }
        let (hex, tail) = remainder.split_at(hexsz);
        if !is_hex(hex) {
            return None;
        }
        chunks.push(hex.to_string());

        if tail.is_empty() {
            break;
        }
        remainder = tail.strip_prefix('\n')?;
        if remainder.is_empty() {
            // a trailing newline after the final chunk oid is malformed.
            return None;
        }
    }

    Some((whole_hex.to_string(), chunks))
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Detects whether a Blob's payload is a BupChunk manifest under `algo`.
pub fn is_bupchunk(payload: &[u8], algo: crate::hash::HashAlgo) -> bool {
    parse_bupchunk(payload, algo.hexsz()).is_some()
}

/// Reads a BupChunk manifest, verifying the concatenation of its listed
/// chunks hashes to the recorded whole-stream oid.
pub fn read_bupchunk(store: &LooseObjectStore, oid: &ObjectId) -> Result<Vec<u8>> {
    let obj = store.read(oid)?;
    if obj.kind != ObjectKind::Blob {
        return Err(Error::CorruptType {
            oid: oid.clone(),
            expected: "blob",
            found: obj.kind.name().to_string(),
        });
    }

    let algo = oid.algo();
    let (whole_hex, chunk_hexes) = parse_bupchunk(&obj.payload, algo.hexsz())
        .ok_or_else(|| Error::InvalidFormat("not a bupchunk manifest".into()))?;
    let expected = ObjectId::from_hex(algo, &whole_hex)?;

    let mut concat = Vec::new();
    for hex in &chunk_hexes {
        let chunk_oid = ObjectId::from_hex(algo, hex)?;
        let chunk = store.read(&chunk_oid)?;
        if chunk.kind != ObjectKind::Blob {
            return Err(Error::CorruptType {
                oid: chunk_oid,
                expected: "blob",
                found: chunk.kind.name().to_string(),
            });
        }
        concat.extend_from_slice(&chunk.payload);
    }

    let actual = ObjectId::hash_object(algo, "blob", &concat);
    if actual != expected {
        return Err(Error::VerificationFailed { expected, actual });
    }

    Ok(concat)
}

/// Streams the chunk oids of a manifest to `callback` without verifying or
/// concatenating payloads, for callers that only need to walk references
/// (e.g. reachability/offload enumeration). A nonzero return aborts with
/// [`Error::CallbackAborted`].
pub fn iterate_bupchunk<F>(store: &LooseObjectStore, oid: &ObjectId, mut callback: F) -> Result<()>
where
    F: FnMut(&ObjectId) -> i32,
{
    let obj = store.read(oid)?;
    let algo = oid.algo();
    let (_, chunk_hexes) = parse_bupchunk(&obj.payload, algo.hexsz())
        .ok_or_else(|| Error::InvalidFormat("not a bupchunk manifest".into()))?;

    for hex in chunk_hexes {
        let chunk_oid = ObjectId::from_hex(algo, &hex)?;
        if callback(&chunk_oid) != 0 {
            return Err(Error::CallbackAborted);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashAlgo;
    use tempfile::tempdir;

    #[test]
    fn empty_stream_manifest_has_no_chunk_lines() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha256).unwrap();
        let oid = write_bupchunk(&store, &[]).unwrap();

        let obj = store.read(&oid).unwrap();
        assert!(is_bupchunk(&obj.payload, HashAlgo::Sha256));

        assert_eq!(read_bupchunk(&store, &oid).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn roundtrips_multi_chunk_stream() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha1).unwrap();

        let mut data = vec![0u8; 3 * 1024 * 1024];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i * 48271 % 256) as u8;
        }

        let oid = write_bupchunk(&store, &data).unwrap();
        assert_eq!(read_bupchunk(&store, &oid).unwrap(), data);
    }

    #[test]
    fn non_bupchunk_blob_is_not_detected() {
        assert!(!is_bupchunk(b"just a regular blob", HashAlgo::Sha256));
    }

    #[test]
    fn tampered_chunk_list_fails_verification() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha256).unwrap();

        let data = vec![5u8; 10_000];
        let oid = write_bupchunk(&store, &data).unwrap();
        let obj = store.read(&oid).unwrap();

        let other_chunk = store.store(&ObjectKind::Blob, b"substituted bytes").unwrap();
        let (whole_hex, mut chunk_hexes) =
            parse_bupchunk(&obj.payload, HashAlgo::Sha256.hexsz()).unwrap();
        chunk_hexes[0] = other_chunk.to_hex();

        let mut tampered = String::from(MAGIC);
        tampered.push_str(&whole_hex);
        tampered.push('\n');
        tampered.push_str(&chunk_hexes.join("\n"));

        let tampered_oid = store
            .store_with_options(&ObjectKind::Blob, tampered.as_bytes(), StoreOptions { no_chunk: true })
            .unwrap();

        assert!(matches!(
            read_bupchunk(&store, &tampered_oid),
            Err(Error::VerificationFailed { .. })
        ));
    }

    #[test]
    fn iterate_visits_chunks_in_order_and_honors_abort() {
        let dir = tempdir().unwrap();
        let store = LooseObjectStore::prepare(dir.path(), HashAlgo::Sha1).unwrap();

        let mut data = vec![0u8; 2 * 1024 * 1024];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i * 97 + 13) as u8;
        }
        let oid = write_bupchunk(&store, &data).unwrap();

        let mut seen = Vec::new();
        iterate_bupchunk(&store, &oid, |chunk_oid| {
            seen.push(chunk_oid.clone());
            0
        })
        .unwrap();
        assert!(!seen.is_empty());

        let mut count = 0;
        let result = iterate_bupchunk(&store, &oid, |_| {
            count += 1;
            1
        });
        assert!(matches!(result, Err(Error::CallbackAborted)));
        assert_eq!(count, 1);
    }

    #[test]
    fn rejects_trailing_newline_after_final_chunk() {
        let hexsz = HashAlgo::Sha256.hexsz();
        let whole = "a".repeat(hexsz);
        let chunk = "b".repeat(hexsz);
        let malformed = format!("{MAGIC}{whole}\n{chunk}\n");
        assert!(parse_bupchunk(malformed.as_bytes(), hexsz).is_none());
    }
}
