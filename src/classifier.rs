use std::collections::HashMap;
use std::collections::HashSet;

/// Per-function bookkeeping driving the low/medium/high use classification.
///
/// `classified_low` and `classified_medium` only ever transition false to
/// true: once a function is flagged, later activity never un-flags it.
#[derive(Debug, Clone, Default)]
pub struct FunctionRecord {
    pub invocations: u64,
    pub misses: u64,
    pub total_misses: u64,
    pub unique_blocks: HashSet<u64>,
    pub classified_low: bool,
    pub classified_medium: bool,
}

/// Tracks per-callee statistics and latches the low/medium/high use
/// classification used by the use-aware replacement policy.
pub struct FunctionUseClassifier {
    records: HashMap<u64, FunctionRecord>,
    degree_high: f64,
    degree_medium: f64,
    miss_threshold: u64,
}

impl FunctionUseClassifier {
    pub fn new(degree_high: f64, degree_medium: f64, miss_threshold: u64) -> Self {
        FunctionUseClassifier { records: HashMap::new(), degree_high, degree_medium, miss_threshold }
    }

    pub fn get(&self, callee: u64) -> Option<&FunctionRecord> {
        self.records.get(&callee)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &FunctionRecord)> {
        self.records.iter()
    }

    pub fn note_unique_block(&mut self, callee: u64, block_addr: u64) {
        self.records.entry(callee).or_default().unique_blocks.insert(block_addr);
    }

    /// Applies the counter-update rule: invocations only advance on a
    /// post-call fetch; `misses` counts only first-line misses of a call,
    /// `total_misses` counts every miss.
    pub fn record_fetch(&mut self, callee: u64, is_post_call: bool, hit: bool) {
        let record = self.records.entry(callee).or_default();
        if !hit {
            if is_post_call {
                record.invocations += 1;
                record.misses += 1;
            }
            record.total_misses += 1;
        } else if is_post_call {
            record.invocations += 1;
        }
    }

    /// Re-evaluates `callee`'s degree-of-use ratio against the thresholds,
    /// latching `classified_low`/`classified_medium` if this is the moment
    /// they first cross, and returns the `(degree_high, degree_medium)` pair
    /// to hand the cache for the fetch currently being attributed to it.
    pub fn classify(&mut self, callee: u64) -> (bool, bool) {
        let record = self.records.entry(callee).or_default();
        let ratio = record.invocations as f64 / record.misses.max(1) as f64;

        if ratio <= self.degree_high && record.misses >= self.miss_threshold && !record.classified_low {
            record.classified_low = true;
            if ratio > self.degree_medium {
                record.classified_medium = true;
            }
        }

        let degree_high = !record.classified_low || record.misses < self.miss_threshold;
        let degree_medium = record.classified_medium;
        (degree_high, degree_medium)
    }
}
