//! Content-defined chunking: two deterministic strategies for finding split
//! points in a byte stream, grounded on `original_source/bblob.c` and
//! `original_source/bup-chunk.c`. Each chunker only computes byte ranges;
//! turning those ranges into stored objects is the assembly layer's job
//! (`crate::assembly`).

pub mod bblob;
pub mod bup;

pub use bblob::split_bblob;
pub use bup::split_bup;
