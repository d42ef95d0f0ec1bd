//! Offload routing policy: compiles each enabled promisor remote's filter
//! into a route rule, then matches candidate blobs against those rules in
//! order. Grounded on `lop_policy_reload_routes`/`lop_route_rule_apply_filter`/
//! `lop_match_blob` in `original_source/lop-offload.c`.

use super::BlobInfo;

/// A partial-clone filter spec, modeled directly as the small set of shapes
/// this subsystem cares about rather than a full
/// `list-objects-filter`-style grammar — that parser is an excluded
/// external collaborator (`spec.md` §1; see `SPEC_FULL.md` §4.5).
#[derive(Debug, Clone)]
pub enum FilterSpec {
    /// `blob:none` — matches every blob.
    None,
    /// `blob:limit=N` — matches blobs of at least `N` bytes.
    Limit(u64),
    /// `combine:...` — union of sub-filters.
    Combine(Vec<FilterSpec>),
    /// Any filter kind this subsystem doesn't route on.
    Other,
}

/// One promisor remote as seen by policy compilation: its name, whether the
/// host considers it a promisor (`remote.<name>.promisor` or the repo's
/// configured partial-clone remote), and its filter spec, if any.
#[derive(Debug, Clone)]
pub struct PromisorRemoteSpec {
    pub name: String,
    pub is_promisor: bool,
    pub filter: Option<FilterSpec>,
}

#[derive(Debug, Clone)]
struct RouteRule {
    remote: String,
    match_all: bool,
    size_above: Option<u64>,
}

fn apply_filter(rule: &mut RouteRule, spec: &FilterSpec) {
    match spec {
        FilterSpec::None => rule.match_all = true,
        FilterSpec::Limit(limit) => {
            if *limit == u64::MAX {
                rule.match_all = true;
            } else {
                rule.size_above = Some(*limit);
            }
        }
        FilterSpec::Combine(subs) => {
            for sub in subs {
                apply_filter(rule, sub);
            }
        }
        FilterSpec::Other => {}
    }
}

fn route_matches(rule: &RouteRule, blob: &BlobInfo) -> bool {
    if rule.match_all {
        return true;
    }
    match rule.size_above {
        Some(threshold) => blob.size >= threshold,
        None => false,
    }
}

/// Compiled routing policy for one push. Never a global: constructed fresh
/// from the current set of promisor remotes each time (`spec.md` §9).
#[derive(Debug, Clone)]
pub struct OffloadPolicy {
    enabled: bool,
    routes: Vec<RouteRule>,
}

impl OffloadPolicy {
    /// Compiles routes for every `remotes` entry that is both a promisor
    /// and carries a filter that resolves to at least one routable rule.
    /// A disabled policy compiles to no routes regardless of `remotes`.
    pub fn compile(enabled: bool, remotes: &[PromisorRemoteSpec]) -> Self {
        let mut routes = Vec::new();

        if enabled {
            for remote in remotes {
                if !remote.is_promisor {
                    continue;
                }
                let Some(filter) = &remote.filter else {
                    continue;
                };

                let mut rule = RouteRule {
                    remote: remote.name.clone(),
                    match_all: false,
                    size_above: None,
                };
                apply_filter(&mut rule, filter);

                if !rule.match_all && rule.size_above.is_none() {
                    continue;
                }
                routes.push(rule);
            }
        }

        OffloadPolicy { enabled, routes }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn has_routes(&self) -> bool {
        !self.routes.is_empty()
    }

    /// First route whose rule matches `blob`, in configured order — mirrors
    /// `lop_match_blob`'s linear scan, first match wins.
    pub fn match_blob(&self, blob: &BlobInfo) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.routes
            .iter()
            .find(|rule| route_matches(rule, blob))
            .map(|rule| rule.remote.as_str())
    }
}
