//! Offload orchestrator: drives one push's worth of blob offloads against a
//! compiled [`OffloadPolicy`], accumulating per-remote stats and sticky
//! errors. Grounded on `lop_offload_start`/`lop_offload_blob_cb`/
//! `lop_offload_finish`/`lop_offload_abort` in `lop-offload.c`.

use std::collections::HashMap;

use tracing::instrument;

use super::{BlobInfo, OffloadPolicy};
use crate::errors::Result;
use crate::object::ObjectKind;
use crate::store::{AlternateStoreRegistry, LooseObjectStore, RemoteUrlResolver};

/// Per-remote running totals, reported at [`OffloadContext::finish`] the
/// way the original emits `trace2` events per remote.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffloadStats {
    pub blob_count: u64,
    pub total_bytes: u64,
}

/// Test-only fault injection, the Rust analogue of the original's
/// `GIT_TEST_LOP_FORCE_*` environment knobs (`lop_remove_local_blob`,
/// `lop_offload_blob_cb`). Left at all-`false` in production use; see
/// `crate::config::test_overrides_from_env` for the env-var-driven
/// constructor.
#[derive(Debug, Clone, Copy, Default)]
pub struct TestOverrides {
    pub force_read_fail: bool,
    pub force_non_blob: bool,
    pub force_remove_fail: bool,
    /// `GIT_TEST_LOP_FORCE_DIR_WARN`: skip the real shard-directory removal
    /// and always take the "directory left behind" warning branch.
    pub force_dir_warn: bool,
    /// `GIT_TEST_LOP_FORCE_READONLY`: reject the remote write up front, as
    /// if the remote's object store weren't writable
    /// (`lop_odb_prepare_source`'s `GIT_TEST_LOP_FORCE_READONLY` check).
    pub force_readonly_remote: bool,
}

/// One push's offload run. `start` returns `None` when offload is disabled
/// or has no compiled routes, mirroring `lop_offload_start` returning a
/// null context (callers should treat that as "nothing to do").
pub struct OffloadContext<R: RemoteUrlResolver> {
    policy: OffloadPolicy,
    registry: AlternateStoreRegistry<R>,
    overrides: TestOverrides,
    stats: HashMap<String, OffloadStats>,
    had_error: bool,
    error: Option<String>,
}

impl<R: RemoteUrlResolver> OffloadContext<R> {
    pub fn start(policy: OffloadPolicy, registry: AlternateStoreRegistry<R>) -> Option<Self> {
        Self::start_with_overrides(policy, registry, TestOverrides::default())
    }

    pub fn start_with_overrides(
        policy: OffloadPolicy,
        registry: AlternateStoreRegistry<R>,
        overrides: TestOverrides,
    ) -> Option<Self> {
        if !policy.is_enabled() || !policy.has_routes() {
            return None;
        }
        Some(OffloadContext {
            policy,
            registry,
            overrides,
            stats: HashMap::new(),
            had_error: false,
            error: None,
        })
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn fail(&mut self, msg: String) {
        self.had_error = true;
        match &mut self.error {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&msg);
            }
            None => self.error = Some(msg),
        }
    }

    /// Processes one candidate blob: matches it against the policy, and if
    /// routed, reads it, writes it to the remote, removes the local copy,
    /// and records stats. Errors are both returned and recorded as the
    /// context's sticky error — callers that keep iterating after an error
    /// (as `lop_offload_blob_cb`'s caller does, collecting one error at a
    /// time) still get correct cumulative `had_error`/`error_message`.
    #[instrument(skip(self, store, blob), fields(oid = %blob.oid, size = blob.size), err)]
    pub fn offload_blob(&mut self, store: &LooseObjectStore, blob: &BlobInfo) -> Result<()> {
        let Some(remote_name) = self.policy.match_blob(blob).map(str::to_string) else {
            return Ok(());
        };

        if self.overrides.force_read_fail {
            let err = crate::errors::Error::InvalidFormat(format!(
                "unable to read blob {}",
                blob.oid
            ));
            self.fail(err.to_string());
            return Err(err);
        }

        let obj = match store.read(&blob.oid) {
            Ok(obj) => obj,
            Err(e) => {
                self.fail(e.to_string());
                return Err(e);
            }
        };

        let kind = if self.overrides.force_non_blob {
            ObjectKind::Tree
        } else {
            obj.kind.clone()
        };
        if kind != ObjectKind::Blob {
            return Ok(());
        }

        if self.overrides.force_readonly_remote {
            let err = crate::errors::Error::PolicyError(format!(
                "lop remote '{remote_name}' does not have a writable object store"
            ));
            self.fail(err.to_string());
            return Err(err);
        }

        if let Err(e) = self.registry.write_blob(&remote_name, &blob.oid, &obj.payload) {
            self.fail(e.to_string());
            return Err(e);
        }

        if self.overrides.force_remove_fail {
            let err = crate::errors::Error::ReadRemovedRace(std::io::Error::other(
                "forced local removal failure",
            ));
            self.fail(err.to_string());
            return Err(err);
        }

        if let Err(e) = store.remove_loose_with_overrides(&blob.oid, self.overrides.force_dir_warn) {
            self.fail(e.to_string());
            return Err(e);
        }

        let stats = self.stats.entry(remote_name).or_default();
        stats.blob_count += 1;
        stats.total_bytes += obj.payload.len() as u64;
        Ok(())
    }

    /// Logs per-remote totals and returns them. Consumes the context, like
    /// `lop_offload_finish` freeing its context.
    pub fn finish(self) -> HashMap<String, OffloadStats> {
        for (remote, stats) in &self.stats {
            tracing::info!(
                remote,
                blob_count = stats.blob_count,
                total_bytes = stats.total_bytes,
                "offload finished"
            );
        }
        self.stats
    }

    /// Discards accumulated stats without reporting them, for the
    /// push-aborted path (`lop_offload_abort`).
    pub fn abort(self) {
        tracing::warn!(had_error = self.had_error, "offload aborted");
    }
}

/// Drives one whole push: enumerates the blobs newly reachable in
/// `(old, new]` via `source`, deduplicates them by oid (a blob can be
/// reachable through more than one path), and offloads each one through
/// `ctx`. If any blob's offload fails, the context is aborted and the
/// error returned; otherwise the run finishes normally and returns the
/// per-remote stats. Mirrors how the original drives `lop_offload_blob_cb`
/// from its new-blob walk and calls `lop_offload_abort`/`lop_offload_finish`
/// depending on outcome (`spec.md` §4.6).
pub fn run_push<R, Rev>(
    mut ctx: OffloadContext<R>,
    store: &LooseObjectStore,
    source: &impl crate::newblobs::NewBlobSource<Rev>,
    old: &Rev,
    new: &Rev,
) -> Result<HashMap<String, OffloadStats>>
where
    R: RemoteUrlResolver,
{
    let mut seen = std::collections::HashSet::new();

    let walk_result = source.for_each_new_blob(old, new, &mut |blob| {
        if !seen.insert(blob.oid.clone()) {
            return Ok(());
        }
        ctx.offload_blob(store, blob)
    });

    match walk_result {
        Ok(()) => Ok(ctx.finish()),
        Err(e) => {
            ctx.abort();
            Err(e)
        }
    }
}
