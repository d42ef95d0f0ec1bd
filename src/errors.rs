use thiserror::Error;

use crate::hash::ObjectId;

/// Errors produced by the large-blob subsystem.
///
/// These map 1:1 onto the error kinds a host VCS needs to distinguish:
/// a corrupt read is not the same failure as a network-unreachable
/// alternate, and callers branch on which one they got.
#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object {oid} has unexpected type: expected {expected}, found {found}")]
    CorruptType {
        oid: ObjectId,
        expected: &'static str,
        found: String,
    },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("bupchunk verification failed: expected {expected}, got {actual}")]
    VerificationFailed { expected: ObjectId, actual: ObjectId },

    #[error("oid mismatch on write: expected {expected}, got {actual}")]
    OidMismatch { expected: ObjectId, actual: ObjectId },

    #[error("alternate store uses an incompatible hash algorithm")]
    IncompatibleHash,

    #[error("unsupported remote url: {0}")]
    UnsupportedUrl(String),

    #[error("offload policy error: {0}")]
    PolicyError(String),

    #[error("callback aborted the operation")]
    CallbackAborted,

    #[error("local unlink raced with another process: {0}")]
    ReadRemovedRace(std::io::Error),

    #[error("invalid digest length: {0}")]
    InvalidDigestLen(usize),
}

pub type Result<T> = std::result::Result<T, Error>;
