//! Offload: routing qualifying blobs to an alternate remote store and
//! removing the local loose copy, grounded on `original_source/lop-offload.c`.

pub mod orchestrator;
pub mod policy;

pub use orchestrator::{run_push, OffloadContext, OffloadStats};
pub use policy::{FilterSpec, OffloadPolicy, PromisorRemoteSpec};

use crate::hash::ObjectId;

/// What the offload orchestrator needs to know about a candidate blob,
/// mirroring `struct lop_blob_info` in `lop-offload.c`.
#[derive(Debug, Clone)]
pub struct BlobInfo {
    pub oid: ObjectId,
    pub size: u64,
    pub path: Option<String>,
}
