//! Alternate (remote) store registry: a cache of remote-named external
//! stores, each a [`LooseObjectStore`] rooted at the remote's local path.
//!
//! Grounded on `original_source/promisor-odb.c` (`lop_odb_get`,
//! `lop_odb_create`, `lop_odb_write_blob`). Per `spec.md` §9 / DESIGN.md,
//! the registry here is an explicit struct constructed per push rather than
//! the original's process-wide `lop_odb_cache` global — the same
//! "registry, not global" shift the teacher's `composition::Registry`
//! models for service construction.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::instrument;

use crate::errors::{Error, Result};
use crate::hash::{HashAlgo, ObjectId};
use crate::object::ObjectKind;
use crate::store::loose::LooseObjectStore;

/// Resolves a remote name to a `file://`/absolute-path URL. Hosts plug in
/// whatever remote-registry lookup they already have (spec §1 excludes
/// remote-transfer protocols as external collaborators); this crate only
/// needs the URL string back.
pub trait RemoteUrlResolver {
    fn resolve_url(&self, remote_name: &str) -> Option<String>;
}

/// Outcome of [`AlternateStoreRegistry::write_blob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    AlreadyExists,
}

/// Parses a remote URL into a local filesystem path, per
/// `lop_parse_file_url`: `file://path`, `file:/abs`, or a bare absolute
/// path are accepted; anything else is `UnsupportedUrl`.
pub fn parse_file_url(url: &str) -> Result<PathBuf> {
    if let Some(rest) = url.strip_prefix("file://") {
        return Ok(PathBuf::from(rest));
    }
    if let Some(rest) = url.strip_prefix("file:") {
        if rest.starts_with('/') {
            return Ok(PathBuf::from(rest));
        }
        return Err(Error::UnsupportedUrl(url.to_string()));
    }
    let path = PathBuf::from(url);
    if path.is_absolute() {
        return Ok(path);
    }
    Err(Error::UnsupportedUrl(url.to_string()))
}

struct AlternateEntry {
    store: LooseObjectStore,
}

/// Cache of remote-named [`LooseObjectStore`]s, valid for the lifetime of
/// one push.
pub struct AlternateStoreRegistry<R: RemoteUrlResolver> {
    resolver: R,
    primary_algo: HashAlgo,
    entries: HashMap<String, AlternateEntry>,
}

impl<R: RemoteUrlResolver> AlternateStoreRegistry<R> {
    pub fn new(resolver: R, primary_algo: HashAlgo) -> Self {
        AlternateStoreRegistry {
            resolver,
            primary_algo,
            entries: HashMap::new(),
        }
    }

    /// `get`: looks up `remote_name` in the cache, or resolves + opens it.
    /// Before opening, independently discovers whatever hash algorithm the
    /// remote was already initialized under (if any) and compares it
    /// against `primary_algo`, the way `lop_odb_prepare_source` compares
    /// `entry->repo.hash_algo` against `the_repository->hash_algo` — a
    /// brand new remote has no persisted algorithm yet and is initialized
    /// under `primary_algo`.
    #[instrument(skip(self), fields(remote = remote_name), err)]
    pub fn get(&mut self, remote_name: &str) -> Result<&LooseObjectStore> {
        if !self.entries.contains_key(remote_name) {
            let url = self.resolver.resolve_url(remote_name).ok_or_else(|| {
                Error::PolicyError(format!("unknown offload remote '{remote_name}'"))
            })?;
            let path = parse_file_url(&url)?;

            let remote_algo = LooseObjectStore::detect_algo(&path)?.unwrap_or(self.primary_algo);
            if remote_algo != self.primary_algo {
                return Err(Error::IncompatibleHash);
            }
            let store = LooseObjectStore::prepare(path, remote_algo)?;

            self.entries
                .insert(remote_name.to_string(), AlternateEntry { store });
        }

        Ok(&self.entries[remote_name].store)
    }

    /// `write_blob`: writes `bytes` (already known to hash to `oid` in the
    /// primary store's algorithm) to the remote named `remote_name`.
    /// Idempotent: an existing object short-circuits to `AlreadyExists`.
    #[instrument(skip(self, bytes), fields(remote = remote_name, oid = %oid, len = bytes.len()), err)]
    pub fn write_blob(
        &mut self,
        remote_name: &str,
        oid: &ObjectId,
        bytes: &[u8],
    ) -> Result<WriteOutcome> {
        let store = self.get(remote_name)?;

        if store.has(oid)? {
            return Ok(WriteOutcome::AlreadyExists);
        }

        let written = store.store(&ObjectKind::Blob, bytes)?;
        if &written != oid {
            return Err(Error::OidMismatch {
                expected: oid.clone(),
                actual: written,
            });
        }

        Ok(WriteOutcome::Written)
    }
}
