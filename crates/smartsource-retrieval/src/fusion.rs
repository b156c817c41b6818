//! Reciprocal Rank Fusion.
//!
//! Combines ranked lists from multiple sources using:
//! score = sum(1 / (k + rank_i))
//!
//! Documents are identified by id alone, so the same document returned by
//! two indexes or two modes is boosted additively.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use smartsource_protocols::{HitMetadata, RawHit, SourceContribution};

use crate::executor::SourceHits;

/// Default RRF smoothing constant.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// A document after fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub doc_id: String,
    pub fused_score: f64,
    /// Index of the best-ranked contributing hit.
    pub index: String,
    /// One entry per contributing source, in source id order.
    pub sources: Vec<SourceContribution>,
    pub metadata: HitMetadata,
}

/// RRF over per-source hit lists.
#[derive(Debug, Clone, Copy)]
pub struct RankFusion {
    k: f64,
}

impl Default for RankFusion {
    fn default() -> Self {
        Self { k: DEFAULT_RRF_K }
    }
}

impl RankFusion {
    pub fn new(k: f64) -> Self {
        Self { k }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Contribution of a single 1-indexed rank.
    pub fn contribution(&self, rank: usize) -> f64 {
        1.0 / (self.k + rank as f64)
    }

    /// Fuse hit lists into one globally ordered candidate list.
    pub fn fuse(&self, hits: &SourceHits) -> Vec<FusedCandidate> {
        // (doc id) -> (source id) -> best hit from that source
        let mut by_doc: BTreeMap<&str, BTreeMap<&str, &RawHit>> = BTreeMap::new();
        for (source_id, list) in hits {
            for hit in list {
                let sources = by_doc.entry(hit.doc_id.as_str()).or_default();
                let best = sources.entry(source_id.as_str()).or_insert(hit);
                if hit.rank < best.rank {
                    *best = hit;
                }
            }
        }

        let mut candidates: Vec<FusedCandidate> = by_doc
            .into_iter()
            .map(|(doc_id, sources)| self.candidate(doc_id, sources))
            .collect();

        candidates.sort_by(|a, b| {
            rank_order(
                (a.fused_score, a.sources.len(), a.doc_id.as_str()),
                (b.fused_score, b.sources.len(), b.doc_id.as_str()),
            )
        });
        candidates
    }

    fn candidate(&self, doc_id: &str, sources: BTreeMap<&str, &RawHit>) -> FusedCandidate {
        // BTreeMap iteration gives the canonical (source id) summation order.
        let mut fused_score = 0.0;
        let mut contributions = Vec::with_capacity(sources.len());
        for hit in sources.values() {
            let contribution = self.contribution(hit.rank);
            fused_score += contribution;
            contributions.push(SourceContribution {
                index: hit.index.clone(),
                mode: hit.mode,
                rank: hit.rank,
                contribution,
            });
        }

        let mut ordered: Vec<&RawHit> = sources.values().copied().collect();
        ordered.sort_by_key(|hit| hit.rank);
        let best = ordered[0];

        let mut metadata = best.metadata.clone();
        for hit in &ordered[1..] {
            for (key, value) in &hit.metadata {
                metadata.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }

        FusedCandidate {
            doc_id: doc_id.to_string(),
            fused_score,
            index: best.index.clone(),
            sources: contributions,
            metadata,
        }
    }
}

/// Global result order: score descending, then contributing source count
/// descending, then document id ascending.
pub fn rank_order(a: (f64, usize, &str), b: (f64, usize, &str)) -> Ordering {
    b.0.total_cmp(&a.0)
        .then_with(|| b.1.cmp(&a.1))
        .then_with(|| a.2.cmp(b.2))
}

#[cfg(test)]
#[path = "fusion_tests.rs"]
mod tests;
