//! Hash & oid facade: the one place this crate knows about concrete hash
//! algorithms. Everything above this module works in terms of [`ObjectId`]
//! and [`HashAlgo`], never `Sha1`/`Sha256` directly — mirrors the way
//! `tvix_castore::B3Digest` isolates blake3 behind a newtype, generalized to
//! the two hash algorithms a real object store must support side by side.

use bytes::Bytes;
use data_encoding::HEXLOWER;
use digest::Digest;

use crate::errors::{Error, Result};

/// Active hash algorithm for an object store. `rawsz`/`hexsz` come straight
/// from `spec.md`'s data model: 20/40 for sha1, 32/64 for sha256.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgo {
    Sha1,
    Sha256,
}

impl HashAlgo {
    pub const fn rawsz(self) -> usize {
        match self {
            HashAlgo::Sha1 => 20,
            HashAlgo::Sha256 => 32,
        }
    }

    pub const fn hexsz(self) -> usize {
        self.rawsz() * 2
    }

    /// The name persisted in an object store's on-disk algorithm marker
    /// (`extensions.objectformat`'s value in the original).
    pub const fn name(self) -> &'static str {
        match self {
            HashAlgo::Sha1 => "sha1",
            HashAlgo::Sha256 => "sha256",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "sha1" => Some(HashAlgo::Sha1),
            "sha256" => Some(HashAlgo::Sha256),
            _ => None,
        }
    }

    pub fn new_context(self) -> HashContext {
        match self {
            HashAlgo::Sha1 => HashContext::Sha1(Box::new(sha1::Sha1::new())),
            HashAlgo::Sha256 => HashContext::Sha256(Box::new(sha2::Sha256::new())),
        }
    }
}

/// A streaming hash context: `init` is [`HashAlgo::new_context`], `update`
/// and `final` are below.
pub enum HashContext {
    Sha1(Box<sha1::Sha1>),
    Sha256(Box<sha2::Sha256>),
}

impl HashContext {
    pub fn algo(&self) -> HashAlgo {
        match self {
            HashContext::Sha1(_) => HashAlgo::Sha1,
            HashContext::Sha256(_) => HashAlgo::Sha256,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            HashContext::Sha1(h) => Digest::update(h.as_mut(), data),
            HashContext::Sha256(h) => Digest::update(h.as_mut(), data),
        }
    }

    pub fn finalize(self) -> ObjectId {
        let algo = self.algo();
        let bytes = match self {
            HashContext::Sha1(h) => h.finalize().to_vec(),
            HashContext::Sha256(h) => h.finalize().to_vec(),
        };
        ObjectId {
            algo,
            bytes: Bytes::from(bytes),
        }
    }
}

/// Fixed-width content hash identifying an object, plus the algorithm it was
/// computed with. The zero oid ("null") is the sentinel for "absent child"
/// in a BBlob slot.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectId {
    algo: HashAlgo,
    bytes: Bytes,
}

impl ObjectId {
    pub fn algo(&self) -> HashAlgo {
        self.algo
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn rawsz(&self) -> usize {
        self.algo.rawsz()
    }

    /// The all-zero sentinel oid for `algo`, meaning "absent child" in a
    /// BBlob slot.
    pub fn null(algo: HashAlgo) -> Self {
        ObjectId {
            algo,
            bytes: Bytes::from(vec![0u8; algo.rawsz()]),
        }
    }

    pub fn is_null(&self) -> bool {
        self.bytes.iter().all(|&b| b == 0)
    }

    pub fn from_raw(algo: HashAlgo, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != algo.rawsz() {
            return Err(Error::InvalidDigestLen(bytes.len()));
        }
        Ok(ObjectId {
            algo,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn from_hex(algo: HashAlgo, hex: &str) -> Result<Self> {
        if hex.len() != algo.hexsz() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidFormat(format!("invalid hex oid: {hex:?}")));
        }
        let bytes = HEXLOWER
            .decode(hex.to_ascii_lowercase().as_bytes())
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        ObjectId::from_raw(algo, bytes)
    }

    pub fn to_hex(&self) -> String {
        HEXLOWER.encode(&self.bytes)
    }

    /// Computes `H("<kind-name> <len>\0" ++ payload)` under `algo`. This is
    /// the single definition of "what is an object's oid" for the whole
    /// crate — the loose store, the offload path, and every assembly format
    /// call through here.
    pub fn hash_object(algo: HashAlgo, kind_name: &str, payload: &[u8]) -> Self {
        let mut ctx = algo.new_context();
        ctx.update(kind_name.as_bytes());
        ctx.update(b" ");
        ctx.update(payload.len().to_string().as_bytes());
        ctx.update(b"\0");
        ctx.update(payload);
        ctx.finalize()
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_oid_is_all_zero_and_right_length() {
        let oid = ObjectId::null(HashAlgo::Sha256);
        assert!(oid.is_null());
        assert_eq!(oid.as_bytes().len(), 32);
    }

    #[test]
    fn hex_roundtrip() {
        let oid = ObjectId::hash_object(HashAlgo::Sha1, "blob", b"hello");
        let hex = oid.to_hex();
        assert_eq!(hex.len(), HashAlgo::Sha1.hexsz());
        let back = ObjectId::from_hex(HashAlgo::Sha1, &hex).unwrap();
        assert_eq!(oid, back);
    }

    #[test]
    fn rejects_wrong_length_hex() {
        assert!(ObjectId::from_hex(HashAlgo::Sha256, "abcd").is_err());
    }

    #[test]
    fn algo_name_roundtrip() {
        for algo in [HashAlgo::Sha1, HashAlgo::Sha256] {
            assert_eq!(HashAlgo::parse(algo.name()), Some(algo));
        }
        assert_eq!(HashAlgo::parse("blake3"), None);
    }

    #[test]
    fn header_format_is_type_space_len_nul() {
        // git's header convention: "<type> <decimal-length>\0" then payload.
        let mut ctx = HashAlgo::Sha1.new_context();
        ctx.update(b"blob 5\0hello");
        let expected = ctx.finalize();
        let actual = ObjectId::hash_object(HashAlgo::Sha1, "blob", b"hello");
        assert_eq!(expected, actual);
    }
}
