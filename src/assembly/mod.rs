//! Assembly formats: three ways to represent a large blob as a tree of
//! smaller stored objects. `bblob` and `blob_tree` are both reachable via
//! their own object kind at write time; `bupchunk` instead hides inside an
//! ordinary Blob and is recognized by sniffing its payload (see
//! [`maybe_dechunk`]).

pub mod bblob;
pub mod blob_tree;
pub mod bupchunk;

pub use bblob::{read_bblob, size_bblob, write_bblob};
pub use blob_tree::{read_blob_tree, write_blob_tree};
pub use bupchunk::{is_bupchunk, iterate_bupchunk, read_bupchunk, write_bupchunk};

use crate::errors::Result;
use crate::hash::ObjectId;
use crate::object::ObjectKind;
use crate::store::LooseObjectStore;

/// Outcome of probing a read blob for a hidden BupChunk manifest.
#[derive(Debug)]
pub enum DechunkOutcome {
    /// Not a Blob, or a Blob whose payload doesn't look like a manifest:
    /// callers should treat the object's payload as opaque bytes.
    NotApplicable,
    /// A BupChunk manifest that verified successfully.
    Dechunked(Vec<u8>),
}

/// The dispatch point a reader calls after fetching any Blob: decides
/// whether it's actually a BupChunk manifest in disguise and, if so,
/// reassembles and verifies it. A manifest-shaped payload that fails
/// verification is still an error, not [`DechunkOutcome::NotApplicable`] —
/// that distinction is what lets callers tell "not chunked" apart from
/// "chunked but corrupt".
pub fn maybe_dechunk(store: &LooseObjectStore, oid: &ObjectId, kind: &ObjectKind, payload: &[u8]) -> Result<DechunkOutcome> {
    if *kind != ObjectKind::Blob || !is_bupchunk(payload, oid.algo()) {
        return Ok(DechunkOutcome::NotApplicable);
    }
    read_bupchunk(store, oid).map(DechunkOutcome::Dechunked)
}
