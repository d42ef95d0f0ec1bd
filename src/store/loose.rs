//! Write-through loose object store: a two-character shard directory,
//! zlib-deflated payloads, atomic temp-file-then-rename publish.
//!
//! Grounded on `original_source/simple-odb.c` (`simple_odb_prepare`,
//! `simple_odb_store_buffer`) and, for the on-disk sharding/staging shape,
//! on the teacher's `tvix_castore::blobservice::SimpleFilesystemBlobService`
//! — rewritten blocking/synchronous per `spec.md` §5.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::instrument;

use crate::errors::{Error, Result};
use crate::hash::{HashAlgo, ObjectId};
use crate::object::{Object, ObjectKind};

/// Options threaded through a single `store` call. `no_chunk` is the
/// per-call replacement for the original's process-wide
/// `disable_bblob_conversion` counter (`spec.md` §9): callers writing a
/// chunk's own leaf blob set it so that a higher-level "auto-chunk new
/// blobs" facade doesn't try to chunk it again.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreOptions {
    pub no_chunk: bool,
}

/// Permission policy applied to a loose object file once it's published,
/// the caller-configurable analogue of `adjust_shared_perm`/
/// `core.sharedRepository`. General multi-user sharing policy is a
/// host-VCS config concern (spec §1's excluded collaborators), so this
/// crate exposes it as an explicit hook rather than parsing config itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShareMode {
    /// `core.sharedRepository = umask` (default): read-only, `0o444`.
    #[default]
    Umask,
    /// `core.sharedRepository = group`: group-writable, `0o660`.
    Group,
    /// `core.sharedRepository = all`: group- and world-writable, `0o664`.
    All,
    /// `core.sharedRepository = 0xxx`: an explicit octal mode.
    Custom(u32),
}

impl ShareMode {
    fn file_mode(self) -> u32 {
        match self {
            ShareMode::Umask => 0o444,
            ShareMode::Group => 0o660,
            ShareMode::All => 0o664,
            ShareMode::Custom(mode) => mode,
        }
    }
}

pub struct LooseObjectStore {
    root: PathBuf,
    objects_dir: PathBuf,
    algo: HashAlgo,
    compression: Compression,
    share_mode: ShareMode,
}

impl LooseObjectStore {
    /// `prepare`: creates `<root>/objects`, `.../info`, `.../pack`
    /// (idempotent), and canonicalizes `root` via `fs::canonicalize`
    /// (the Rust equivalent of `strbuf_realpath`). Also records the store's
    /// hash algorithm in an on-disk marker the first time it's prepared, so
    /// a later caller (e.g. the alternate-store registry) can discover it
    /// independently instead of trusting whatever algorithm it's asked for.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err)]
    pub fn prepare(path: impl AsRef<Path>, algo: HashAlgo) -> Result<Self> {
        let path = path.as_ref();
        make_dir_all(path)?;
        let root = fs::canonicalize(path)?;

        let objects_dir = root.join("objects");
        make_dir_all(&objects_dir)?;
        make_dir_all(objects_dir.join("info"))?;
        make_dir_all(objects_dir.join("pack"))?;
        write_algo_marker_if_absent(&objects_dir, algo)?;

        Ok(LooseObjectStore {
            root,
            objects_dir,
            algo,
            compression: Compression::default(),
            share_mode: ShareMode::default(),
        })
    }

    /// Reads the hash algorithm a store at `path` was already initialized
    /// with, without creating anything. `Ok(None)` if `path` has no store
    /// yet (a fresh alternate, say, about to be `prepare`d for the first
    /// time).
    pub fn detect_algo(path: impl AsRef<Path>) -> Result<Option<HashAlgo>> {
        let marker = path.as_ref().join("objects").join("info").join("algorithm");
        match fs::read_to_string(&marker) {
            Ok(content) => {
                let name = content.trim();
                HashAlgo::parse(name).map(Some).ok_or_else(|| {
                    Error::InvalidFormat(format!("unrecognized hash algorithm marker: {name:?}"))
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn algo(&self) -> HashAlgo {
        self.algo
    }

    /// Sets the permission policy applied to loose object files from this
    /// point on; objects already on disk are unaffected.
    pub fn set_share_mode(&mut self, mode: ShareMode) {
        self.share_mode = mode;
    }

    pub fn with_compression_level(mut self, level: Compression) -> Self {
        self.compression = level;
        self
    }

    fn loose_path(&self, oid: &ObjectId) -> PathBuf {
        let hex = oid.to_hex();
        self.objects_dir.join(&hex[0..2]).join(&hex[2..])
    }

    /// `store`: computes `oid = H("<type> <len>\0" ++ bytes)`, deflates the
    /// header+payload, and atomically publishes it. Idempotent: if the
    /// target already exists, returns success without rewriting it.
    #[instrument(skip(self, payload), fields(kind = kind.name(), len = payload.len()), err)]
    pub fn store(&self, kind: &ObjectKind, payload: &[u8]) -> Result<ObjectId> {
        self.store_with_options(kind, payload, StoreOptions::default())
    }

    pub fn store_with_options(
        &self,
        kind: &ObjectKind,
        payload: &[u8],
        _opts: StoreOptions,
    ) -> Result<ObjectId> {
        let oid = ObjectId::hash_object(self.algo, kind.name(), payload);
        let dest = self.loose_path(&oid);

        if dest.exists() {
            return Ok(oid);
        }

        let mut header = format!("{} {}\0", kind.name(), payload.len()).into_bytes();
        header.extend_from_slice(payload);

        let mut encoder = ZlibEncoder::new(Vec::new(), self.compression);
        encoder.write_all(&header)?;
        let compressed = encoder.finish()?;

        if let Some(dir) = dest.parent() {
            make_dir_all(dir)?;
        }

        let tmp_path = self.objects_dir.join(format!(
            ".tmp-{}-{}",
            std::process::id(),
            oid.to_hex()
        ));
        let write_result = (|| -> Result<()> {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&compressed)?;
            tmp.sync_all()?;
            drop(tmp);
            apply_share_mode(&tmp_path, self.share_mode)?;
            match fs::rename(&tmp_path, &dest) {
                Ok(()) => Ok(()),
                Err(e) if dest.exists() => {
                    // Lost a race with another writer for the same content;
                    // that's fine, the object is content-addressed.
                    let _ = e;
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })();

        if write_result.is_err() {
            let _ = fs::remove_file(&tmp_path);
        }
        write_result?;

        Ok(oid)
    }

    #[instrument(skip(self), fields(oid = %oid), err)]
    pub fn has(&self, oid: &ObjectId) -> Result<bool> {
        Ok(self.loose_path(oid).exists())
    }

    /// Reads and inflates a loose object, returning its kind and payload.
    #[instrument(skip(self), fields(oid = %oid), err)]
    pub fn read(&self, oid: &ObjectId) -> Result<Object> {
        let path = self.loose_path(oid);
        let compressed = fs::read(&path)?;

        let mut decoder = flate2::read::ZlibDecoder::new(&compressed[..]);
        let mut raw = Vec::new();
        decoder.read_to_end(&mut raw)?;

        let nul = raw
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::InvalidFormat("loose object missing NUL header terminator".into()))?;
        let header = std::str::from_utf8(&raw[..nul])
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        let (type_name, len_str) = header
            .split_once(' ')
            .ok_or_else(|| Error::InvalidFormat(format!("malformed object header: {header:?}")))?;
        let declared_len: usize = len_str
            .parse()
            .map_err(|_| Error::InvalidFormat(format!("non-numeric length in header: {len_str:?}")))?;

        let payload = raw[nul + 1..].to_vec();
        if payload.len() != declared_len {
            return Err(Error::InvalidFormat(format!(
                "object {oid} declares length {declared_len} but has {}",
                payload.len()
            )));
        }

        Ok(Object::new(ObjectKind::parse(type_name), payload))
    }

    /// Path-removal primitive for the offload cleanup step (`spec.md`
    /// §4.7). Returns `Ok(true)` if a file was actually removed, `Ok(false)`
    /// if it was already absent (`ENOENT` is success, per spec).
    pub fn remove_loose(&self, oid: &ObjectId) -> Result<bool> {
        self.remove_loose_with_overrides(oid, false)
    }

    /// Same as [`remove_loose`](Self::remove_loose), but `force_dir_warn`
    /// (the `GIT_TEST_LOP_FORCE_DIR_WARN` test seam, `spec.md` §6) skips
    /// the real `remove_dir` attempt and always takes the "shard directory
    /// left behind" warning branch, so that path is exercisable without
    /// needing to contrive a genuine non-ENOTEMPTY rmdir failure.
    pub fn remove_loose_with_overrides(&self, oid: &ObjectId, force_dir_warn: bool) -> Result<bool> {
        let path = self.loose_path(oid);
        match fs::remove_file(&path) {
            Ok(()) => {
                if let Some(dir) = path.parent() {
                    if force_dir_warn {
                        tracing::warn!(dir = %dir.display(), "failed to remove shard directory (forced)");
                    } else if let Err(e) = fs::remove_dir(dir) {
                        // ENOENT/ENOTEMPTY are not errors here; anything else is
                        // downgraded to a warning per spec §4.7/§7.
                        if e.kind() != std::io::ErrorKind::NotFound && !is_dir_not_empty(&e) {
                            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove shard directory");
                        }
                    }
                }
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::ReadRemovedRace(e)),
        }
    }

    pub fn loose_path_for(&self, oid: &ObjectId) -> PathBuf {
        self.loose_path(oid)
    }
}

fn is_dir_not_empty(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::ENOTEMPTY)
}

fn make_dir_all(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(&path)?;
    Ok(())
}

fn write_algo_marker_if_absent(objects_dir: &Path, algo: HashAlgo) -> Result<()> {
    let marker = objects_dir.join("info").join("algorithm");
    if !marker.exists() {
        fs::write(&marker, algo.name())?;
    }
    Ok(())
}

#[cfg(unix)]
fn apply_share_mode(path: &Path, mode: ShareMode) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(mode.file_mode());
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn apply_share_mode(_path: &Path, _mode: ShareMode) -> Result<()> {
    Ok(())
}
