//! Object kinds, per the data model in `spec.md` §3: every object stored
//! by this subsystem is tagged with a kind name that becomes part of its
//! hashed header.

use bytes::Bytes;

/// Tag identifying what an object's payload means. `Other` carries through
/// object kinds this subsystem doesn't interpret (e.g. a host VCS's commit
/// or tag objects) so they can still be read back byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
    BlobTree,
    BBlob,
    Other(String),
}

impl ObjectKind {
    pub fn name(&self) -> &str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::BlobTree => "blob-tree",
            ObjectKind::BBlob => "bblob",
            ObjectKind::Other(name) => name,
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "blob" => ObjectKind::Blob,
            "tree" => ObjectKind::Tree,
            "blob-tree" => ObjectKind::BlobTree,
            "bblob" => ObjectKind::BBlob,
            other => ObjectKind::Other(other.to_string()),
        }
    }
}

/// An object as read back from a store: its kind plus the raw (already
/// inflated) payload.
#[derive(Debug, Clone)]
pub struct Object {
    pub kind: ObjectKind,
    pub payload: Bytes,
}

impl Object {
    pub fn new(kind: ObjectKind, payload: impl Into<Bytes>) -> Self {
        Object {
            kind,
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_name_roundtrip() {
        for kind in [
            ObjectKind::Blob,
            ObjectKind::Tree,
            ObjectKind::BlobTree,
            ObjectKind::BBlob,
        ] {
            assert_eq!(ObjectKind::parse(kind.name()), kind);
        }
    }

    #[test]
    fn unknown_kind_becomes_other() {
        assert_eq!(ObjectKind::parse("commit"), ObjectKind::Other("commit".into()));
    }
}
