//! Abstraction over "enumerate the new blobs introduced between two
//! revisions", the one place this crate used to shell out to a separate
//! reference-traversal process. Per `spec.md` §9's redesign note, that
//! subprocess boundary becomes an in-process trait a host implements once
//! against its own object graph; this crate only needs callbacks.

use crate::errors::Result;
use crate::offload::BlobInfo;

/// Enumerates blobs newly reachable in the range `(old, new]`, in whatever
/// order the host's graph traversal naturally produces them. `R` is the
/// host's revision marker type (a commit id, a ref name, etc.) — this
/// crate never interprets it.
pub trait NewBlobSource<R> {
    fn for_each_new_blob(
        &self,
        old: &R,
        new: &R,
        callback: &mut dyn FnMut(&BlobInfo) -> Result<()>,
    ) -> Result<()>;
}

/// An in-memory stand-in for tests and examples: yields a fixed list of
/// blobs regardless of the requested range.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobSource {
    blobs: Vec<BlobInfo>,
}

impl InMemoryBlobSource {
    pub fn new(blobs: Vec<BlobInfo>) -> Self {
        InMemoryBlobSource { blobs }
    }
}

impl<R> NewBlobSource<R> for InMemoryBlobSource {
    fn for_each_new_blob(
        &self,
        _old: &R,
        _new: &R,
        callback: &mut dyn FnMut(&BlobInfo) -> Result<()>,
    ) -> Result<()> {
        for blob in &self.blobs {
            callback(blob)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::{HashAlgo, ObjectId};

    #[test]
    fn visits_every_blob_in_order() {
        let blobs = vec![
            BlobInfo { oid: ObjectId::hash_object(HashAlgo::Sha1, "blob", b"a"), size: 1, path: None },
            BlobInfo { oid: ObjectId::hash_object(HashAlgo::Sha1, "blob", b"b"), size: 1, path: None },
        ];
        let source = InMemoryBlobSource::new(blobs.clone());

        let mut seen = Vec::new();
        source
            .for_each_new_blob(&"old".to_string(), &"new".to_string(), &mut |blob| {
                seen.push(blob.oid.clone());
                Ok(())
            })
            .unwrap();

        assert_eq!(seen, blobs.iter().map(|b| b.oid.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn callback_error_aborts_the_walk() {
        let blobs = vec![
            BlobInfo { oid: ObjectId::hash_object(HashAlgo::Sha1, "blob", b"a"), size: 1, path: None },
            BlobInfo { oid: ObjectId::hash_object(HashAlgo::Sha1, "blob", b"b"), size: 1, path: None },
        ];
        let source = InMemoryBlobSource::new(blobs);

        let mut count = 0;
        let result = source.for_each_new_blob(&"old".to_string(), &"new".to_string(), &mut |_| {
            count += 1;
            Err(crate::errors::Error::CallbackAborted)
        });

        assert!(result.is_err());
        assert_eq!(count, 1);
    }
}
