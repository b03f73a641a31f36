//! Target co-occurrence: how many unordered target pairs share at least
//! `min_shared` qualifying diseases.
//!
//! The scan is O(T²) in the number of distinct targets. Pair evaluations are
//! independent, so the pair index space `[0, T·(T-1)/2)` is cut into
//! contiguous chunks and handed to a dedicated rayon pool of `workers` threads.
//! Each chunk reads the shared disease sets and returns a partial count; the
//! partial counts are summed. Nothing is written during the scan, so the total
//! is the same for any worker count or scheduling order.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use evidex_common::{AggregatedPair, AssociationKey, EvidexError, Result};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::aggregate::AggregatedPairs;

pub const DEFAULT_MIN_SHARED: usize = 2;

/// Chunks handed out per worker thread, so that a slow chunk does not leave
/// the other threads idle at the end of the scan.
const CHUNKS_PER_WORKER: usize = 4;

// ── Qualifying association policy ─────────────────────────────────────────────

/// Decides which aggregated pairs count as a real association.
///
/// A pair qualifies when its median is strictly greater than `median_above`
/// (default `0.0`): a non-positive median is taken to mean no association.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualifyingAssociation {
    pub median_above: f64,
}

impl Default for QualifyingAssociation {
    fn default() -> Self {
        Self { median_above: 0.0 }
    }
}

impl QualifyingAssociation {
    pub fn new(median_above: f64) -> Self {
        Self { median_above }
    }

    pub fn qualifies(&self, pair: &AggregatedPair) -> bool {
        pair.median > self.median_above
    }
}

// ── Disease sets ──────────────────────────────────────────────────────────────

/// Qualifying disease set of every target, indexed by position.
///
/// Target ids are deduplicated and sorted. Disease ids are interned to `u32`
/// and each set is kept sorted, so intersections are a linear merge.
#[derive(Debug, Clone, Default)]
pub struct DiseaseSets {
    target_ids: Vec<String>,
    sets: Vec<Vec<u32>>,
}

impl DiseaseSets {
    /// Build from `(targetId, diseaseId)` qualifying associations.
    ///
    /// `all_target_ids` defines the pair universe: targets without any
    /// qualifying disease still take part in the scan (with an empty set), and
    /// associations of targets outside it are ignored.
    pub fn from_associations<'a>(
        qualifying: impl IntoIterator<Item = (&'a str, &'a str)>,
        all_target_ids: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let unique: BTreeSet<&str> = all_target_ids.into_iter().collect();
        let target_index: HashMap<&str, usize> =
            unique.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut sets: Vec<Vec<u32>> = vec![Vec::new(); unique.len()];
        let mut disease_ids: HashMap<&str, u32> = HashMap::new();
        let mut ignored = 0usize;

        for (target_id, disease_id) in qualifying {
            let Some(&ti) = target_index.get(target_id) else {
                ignored += 1;
                continue;
            };
            let next = disease_ids.len() as u32;
            let di = *disease_ids.entry(disease_id).or_insert(next);
            sets[ti].push(di);
        }
        for set in &mut sets {
            set.sort_unstable();
            set.dedup();
        }

        if ignored > 0 {
            debug!(ignored, "Qualifying associations outside the target universe ignored");
        }

        Self {
            target_ids: unique.into_iter().map(str::to_string).collect(),
            sets,
        }
    }

    /// Build from aggregated pairs, keeping those that pass `policy`.
    pub fn from_pairs<'a>(
        pairs: &'a AggregatedPairs,
        all_target_ids: impl IntoIterator<Item = &'a str>,
        policy: QualifyingAssociation,
    ) -> Self {
        Self::from_associations(
            pairs
                .values()
                .filter(|p| policy.qualifies(p))
                .map(|p| (p.target_id.as_str(), p.disease_id.as_str())),
            all_target_ids,
        )
    }

    /// Build from an explicit `(targetId, diseaseId) -> qualifies` mapping.
    pub fn from_flags<'a>(
        flags: &'a BTreeMap<AssociationKey, bool>,
        all_target_ids: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::from_associations(
            flags
                .iter()
                .filter(|(_, qualifies)| **qualifies)
                .map(|(key, _)| (key.target_id.as_str(), key.disease_id.as_str())),
            all_target_ids,
        )
    }

    /// Number of distinct targets.
    pub fn len(&self) -> usize {
        self.target_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.target_ids.is_empty()
    }

    pub fn target_ids(&self) -> &[String] {
        &self.target_ids
    }

    /// Number of qualifying diseases of a target, if the target is known.
    pub fn disease_count(&self, target_id: &str) -> Option<usize> {
        self.target_ids
            .binary_search_by(|id| id.as_str().cmp(target_id))
            .ok()
            .map(|i| self.sets[i].len())
    }
}

// ── Pair index space ──────────────────────────────────────────────────────────

/// A contiguous run of pair indices, `[start, start + len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairChunk {
    pub start: u64,
    pub len: u64,
}

/// Number of unordered pairs of `n` distinct items.
pub fn pair_count(n: usize) -> u64 {
    let n = n as u64;
    n * n.saturating_sub(1) / 2
}

/// Split the pair index space of `n` targets into at most `parts` disjoint,
/// contiguous chunks of near-equal length that together cover every pair once.
pub fn partition_pairs(n: usize, parts: usize) -> Vec<PairChunk> {
    let total = pair_count(n);
    if total == 0 {
        return Vec::new();
    }
    let parts = (parts.max(1) as u64).min(total);
    let base = total / parts;
    let extra = total % parts;

    let mut chunks = Vec::with_capacity(parts as usize);
    let mut start = 0u64;
    for p in 0..parts {
        let len = base + u64::from(p < extra);
        chunks.push(PairChunk { start, len });
        start += len;
    }
    chunks
}

/// Index of the first pair whose first element is `i`.
fn row_offset(i: u64, n: u64) -> u64 {
    i * (2 * n - i - 1) / 2
}

/// Map pair index `k` to the pair `(i, j)`, `i < j`, in lexicographic order.
pub fn unrank_pair(k: u64, n: usize) -> (usize, usize) {
    let n64 = n as u64;
    // Largest row i with row_offset(i) <= k.
    let (mut lo, mut hi) = (0u64, n64.saturating_sub(2));
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        if row_offset(mid, n64) <= k {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let i = lo;
    let j = i + 1 + (k - row_offset(i, n64));
    (i as usize, j as usize)
}

/// Whether two sorted sets have at least `min_shared` elements in common.
fn shares_at_least(a: &[u32], b: &[u32], min_shared: usize) -> bool {
    if min_shared == 0 {
        return true;
    }
    if a.len() < min_shared || b.len() < min_shared {
        return false;
    }
    let (mut x, mut y, mut shared) = (0, 0, 0);
    while x < a.len() && y < b.len() {
        match a[x].cmp(&b[y]) {
            std::cmp::Ordering::Less => x += 1,
            std::cmp::Ordering::Greater => y += 1,
            std::cmp::Ordering::Equal => {
                shared += 1;
                if shared >= min_shared {
                    return true;
                }
                x += 1;
                y += 1;
            }
        }
    }
    false
}

/// Evaluate every pair of one chunk and return how many satisfied `eval`.
fn count_chunk<F>(chunk: PairChunk, n: usize, eval: &F) -> u64
where
    F: Fn(usize, usize) -> bool,
{
    let (mut i, mut j) = unrank_pair(chunk.start, n);
    let mut count = 0;
    for _ in 0..chunk.len {
        if eval(i, j) {
            count += 1;
        }
        j += 1;
        if j == n {
            i += 1;
            j = i + 1;
        }
    }
    count
}

// ── Counter ───────────────────────────────────────────────────────────────────

/// Fan-out/fan-in counter of target pairs with shared qualifying diseases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoOccurrenceCounter {
    workers: usize,
    min_shared: usize,
}

impl Default for CoOccurrenceCounter {
    fn default() -> Self {
        Self::new(1, DEFAULT_MIN_SHARED)
    }
}

impl CoOccurrenceCounter {
    /// `workers` is clamped to at least one thread.
    pub fn new(workers: usize, min_shared: usize) -> Self {
        Self {
            workers: workers.max(1),
            min_shared,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn min_shared(&self) -> usize {
        self.min_shared
    }

    /// Count unordered target pairs sharing at least `min_shared` diseases.
    pub fn count(&self, sets: &DiseaseSets) -> Result<u64> {
        let started = Instant::now();
        let min_shared = self.min_shared;
        let disease_sets = &sets.sets;

        let count = self.scan(sets.len(), |i, j| {
            shares_at_least(&disease_sets[i], &disease_sets[j], min_shared)
        })?;

        info!(
            targets = sets.len(),
            pairs = pair_count(sets.len()),
            workers = self.workers,
            min_shared,
            count,
            duration_ms = started.elapsed().as_millis() as u64,
            "Counted target pairs with shared diseases"
        );
        Ok(count)
    }

    /// Run `eval` over every unordered pair of `n` items on the worker pool.
    ///
    /// A panic in any chunk fails the whole scan with `WorkerFailure`; the
    /// partial sums of the other chunks are discarded.
    fn scan<F>(&self, n: usize, eval: F) -> Result<u64>
    where
        F: Fn(usize, usize) -> bool + Sync,
    {
        let chunks = partition_pairs(n, self.workers * CHUNKS_PER_WORKER);
        if chunks.is_empty() {
            return Ok(0);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("evidex-pairs-{i}"))
            .build()
            .map_err(|e| EvidexError::WorkerFailure(format!("could not start worker pool: {e}")))?;

        debug!(chunks = chunks.len(), workers = self.workers, "Dispatching pair chunks");

        panic::catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| {
                chunks
                    .par_iter()
                    .map(|chunk| count_chunk(*chunk, n, &eval))
                    .sum::<u64>()
            })
        }))
        .map_err(|payload| EvidexError::WorkerFailure(panic_message(payload.as_ref())))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
