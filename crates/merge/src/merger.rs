//! Whole-archive merge.
//!
//! Walks the union of entry paths of the client and server archives and
//! applies a fixed per-entry policy, in order:
//!
//! 1. compiled type outside the program namespace: dropped (one variant
//!    bundles third-party classes the other lacks; they must not leak
//!    into the output);
//! 2. present on both sides, byte-identical: client copy, untagged;
//! 3. present on both, compiled type, differing bytes: class merge,
//!    stamped with a fixed modification time for reproducible output;
//! 4. present on both, non-type data, differing bytes: no structural
//!    merge exists; governed by `ResourcePolicy`;
//! 5. present on one side: emitted, side-tagged if it is an in-namespace
//!    compiled type.

use serde::Serialize;

use crate::archive::{Archive, ArchiveEntry};
use crate::artifact::ArtifactCodec;
use crate::class::ClassMerger;
use crate::{MergeError, Side};

/// File suffix of compiled-type entries.
pub const TYPE_SUFFIX: &str = ".class";

/// Modification time stamped onto semantically merged entries.
pub const MERGED_MTIME: u64 = 0;

/// What to do when a non-type entry differs between the variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourcePolicy {
    /// Keep the client copy and record the divergence. Heuristic.
    #[default]
    ClientWins,
    /// Treat the divergence as a hard error.
    Error,
}

/// Archive merge configuration, threaded by value.
#[derive(Debug, Clone)]
pub struct ArchiveMergePolicy {
    /// Path prefix of the program's own namespace, e.g. `com/example/`.
    /// Entries without any directory component always count as in-namespace.
    pub namespace: String,
    pub resources: ResourcePolicy,
}

impl ArchiveMergePolicy {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            resources: ResourcePolicy::default(),
        }
    }

    fn in_namespace(&self, path: &str) -> bool {
        path.starts_with(&self.namespace) || !path.contains('/')
    }
}

/// Counts per policy case, surfaced in the CLI report.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MergeStats {
    pub identical: usize,
    pub merged_types: usize,
    pub tagged_client: usize,
    pub tagged_server: usize,
    pub dropped_foreign: usize,
    /// Paths of divergent non-type entries kept client-side.
    pub divergent_resources: Vec<String>,
}

/// Merges two archives entry by entry.
pub struct ArchiveMerger<'a, C: ArtifactCodec> {
    classes: ClassMerger<'a, C>,
    policy: ArchiveMergePolicy,
}

impl<'a, C: ArtifactCodec> ArchiveMerger<'a, C> {
    pub fn new(codec: &'a C, policy: ArchiveMergePolicy) -> Self {
        Self {
            classes: ClassMerger::new(codec),
            policy,
        }
    }

    /// Produces the merged archive plus per-case statistics. The output
    /// is fully materialized; nothing is observable before it returns.
    pub fn merge(
        &self,
        client: &Archive,
        server: &Archive,
    ) -> Result<(Archive, MergeStats), MergeError> {
        let mut out = Archive::new();
        let mut stats = MergeStats::default();

        for path in union_paths(client, server) {
            let is_type = path.ends_with(TYPE_SUFFIX);
            let in_namespace = self.policy.in_namespace(path);

            if is_type && !in_namespace {
                stats.dropped_foreign += 1;
                continue;
            }

            match (client.get(path), server.get(path)) {
                (Some(c), Some(s)) => {
                    if c.data == s.data {
                        stats.identical += 1;
                        out.insert(c.clone());
                    } else if is_type {
                        let merged = self.classes.merge(&c.data, &s.data)?;
                        stats.merged_types += 1;
                        out.insert(ArchiveEntry {
                            path: path.to_string(),
                            mtime: MERGED_MTIME,
                            data: merged,
                        });
                    } else {
                        match self.policy.resources {
                            ResourcePolicy::ClientWins => {
                                stats.divergent_resources.push(path.to_string());
                                out.insert(c.clone());
                            }
                            ResourcePolicy::Error => {
                                return Err(MergeError::DivergentResource(path.to_string()));
                            }
                        }
                    }
                }
                (Some(entry), None) => {
                    out.insert(self.exclusive(entry, Side::Client, is_type, &mut stats)?);
                }
                (None, Some(entry)) => {
                    out.insert(self.exclusive(entry, Side::Server, is_type, &mut stats)?);
                }
                (None, None) => unreachable!("path from neither archive"),
            }
        }

        Ok((out, stats))
    }

    fn exclusive(
        &self,
        entry: &ArchiveEntry,
        side: Side,
        is_type: bool,
        stats: &mut MergeStats,
    ) -> Result<ArchiveEntry, MergeError> {
        // Side-tag only compiled types; plain resources pass through.
        // Namespace was already checked: foreign types never reach here.
        if !is_type {
            return Ok(entry.clone());
        }
        match side {
            Side::Client => stats.tagged_client += 1,
            Side::Server => stats.tagged_server += 1,
        }
        Ok(ArchiveEntry {
            path: entry.path.clone(),
            mtime: entry.mtime,
            data: self.classes.add_side_information(&entry.data, side)?,
        })
    }
}

/// Sorted union of the entry paths of both archives.
fn union_paths<'m>(client: &'m Archive, server: &'m Archive) -> Vec<&'m str> {
    let mut paths: Vec<&str> = client.paths().chain(server.paths()).collect();
    paths.sort_unstable();
    paths.dedup();
    paths
}
