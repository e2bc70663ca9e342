//! Candidate blocking over reference keys.
//!
//! Signature = (first character of key, key length / bucket_width). A query
//! collects every reference row with the same first character whose key
//! length is within the tolerance of the query key's length. Rows whose
//! first character differs from the query (e.g. first and last name
//! transposed) are never candidates while blocking is active.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::config::{BlockingConfig, BlockingFallback};
use crate::key::NormalizedKey;
use crate::model::CandidateScope;

/// Candidates for one query. `indices == None` means every reference row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    pub scope: CandidateScope,
    indices: Option<Vec<usize>>,
}

impl CandidateSet {
    fn all(scope: CandidateScope) -> Self {
        Self {
            scope,
            indices: None,
        }
    }

    /// Candidate reference rows in reference order.
    pub fn indices(&self) -> Option<&[usize]> {
        self.indices.as_deref()
    }

    pub fn len(&self, reference_len: usize) -> usize {
        match self.indices {
            Some(ref v) => v.len(),
            None => reference_len,
        }
    }

    pub fn is_empty(&self, reference_len: usize) -> bool {
        self.len(reference_len) == 0
    }
}

/// Immutable after [`BlockingIndex::build`]; shared read-only across workers.
#[derive(Debug)]
pub struct BlockingIndex {
    lengths: Vec<usize>,
    buckets: HashMap<char, BTreeMap<usize, Vec<usize>>>,
    config: BlockingConfig,
}

impl BlockingIndex {
    pub fn build(keys: &[NormalizedKey], config: &BlockingConfig) -> Self {
        let mut buckets: HashMap<char, BTreeMap<usize, Vec<usize>>> = HashMap::new();
        let mut lengths = Vec::with_capacity(keys.len());

        for (i, key) in keys.iter().enumerate() {
            let len = key.char_len();
            lengths.push(len);
            if let Some(first) = key.first_char() {
                buckets
                    .entry(first)
                    .or_default()
                    .entry(len / config.bucket_width)
                    .or_default()
                    .push(i);
            }
        }

        Self {
            lengths,
            buckets,
            config: config.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// True when queries go through the buckets rather than a full scan.
    pub fn is_active(&self) -> bool {
        self.len() > self.config.min_reference_size
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.values().map(|bands| bands.len()).sum()
    }

    pub fn query(&self, key: &NormalizedKey) -> CandidateSet {
        if !self.is_active() {
            return CandidateSet::all(CandidateScope::Full);
        }

        let len = key.char_len();
        let tolerance = ((len as f64 * self.config.length_tolerance).floor() as usize).max(1);
        let lo = len.saturating_sub(tolerance);
        let hi = len + tolerance;

        let mut hits: Vec<usize> = Vec::new();
        if let Some(bands) = key.first_char().and_then(|c| self.buckets.get(&c)) {
            let width = self.config.bucket_width;
            for members in bands.range(lo / width..=hi / width).map(|(_, m)| m) {
                hits.extend(
                    members
                        .iter()
                        .copied()
                        .filter(|&i| (lo..=hi).contains(&self.lengths[i])),
                );
            }
        }

        if hits.is_empty() {
            debug!("no blocking candidates for '{key}'");
            return match self.config.fallback {
                BlockingFallback::FullScan => CandidateSet::all(CandidateScope::Fallback),
                BlockingFallback::Strict => CandidateSet {
                    scope: CandidateScope::Empty,
                    indices: Some(Vec::new()),
                },
            };
        }

        // Bands are visited in length order; restore reference order
        hits.sort_unstable();
        CandidateSet {
            scope: CandidateScope::Blocked,
            indices: Some(hits),
        }
    }
}
