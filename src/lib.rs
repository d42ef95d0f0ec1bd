//! Content-addressed large-blob subsystem: content-defined chunking, loose
//! object storage, two assembly formats for reassembling a blob from its
//! chunks, and a policy-driven offload path to alternate remote stores.
//!
//! The pieces compose bottom-up: [`chunk`] finds split points in a byte
//! stream, [`assembly`] turns those split points into stored objects and
//! back, [`store`] is where objects actually live (locally and on
//! alternates), and [`offload`] decides which blobs leave the local store
//! after a push.

pub mod assembly;
pub mod chunk;
pub mod config;
pub mod errors;
pub mod hash;
pub mod logging;
pub mod newblobs;
pub mod object;
pub mod offload;
pub mod store;

pub use errors::{Error, Result};
pub use hash::{HashAlgo, ObjectId};
pub use object::{Object, ObjectKind};
