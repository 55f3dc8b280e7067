//! FDR (C9): Benjamini-Hochberg multiple-testing correction, applied
//! per-counter across the full flat sequence of `AnnotatorResult`s.

use crate::result::AnnotatorResult;

/// Correction method tag recognized by the `fdr` configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdrMethod {
    BenjaminiHochberg,
}

impl FdrMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BH" | "BENJAMINI-HOCHBERG" | "BENJAMINI_HOCHBERG" => Some(Self::BenjaminiHochberg),
            _ => None,
        }
    }
}

/// Assign `qvalue` on every result, grouping by `counter` (BH correction is
/// applied within each counter's family of tests, matching the original's
/// per-counter output files).
pub fn apply(results: &mut [AnnotatorResult], method: FdrMethod) {
    let mut counters: Vec<String> = results.iter().map(|r| r.counter.clone()).collect();
    counters.sort();
    counters.dedup();

    for counter in counters {
        let mut idx: Vec<usize> = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.counter == counter)
            .map(|(i, _)| i)
            .collect();
        idx.sort_by(|&a, &b| results[a].pvalue.partial_cmp(&results[b].pvalue).unwrap());

        match method {
            FdrMethod::BenjaminiHochberg => benjamini_hochberg(results, &idx),
        }
    }
}

/// `q_i = min_{j >= i}(p_j * m / j)`, clamped to at most 1, where `idx` lists
/// result indices sorted by ascending p-value (rank order).
fn benjamini_hochberg(results: &mut [AnnotatorResult], idx: &[usize]) {
    let m = idx.len();
    if m == 0 {
        return;
    }
    let mut raw = vec![0.0f64; m];
    for (rank, &i) in idx.iter().enumerate() {
        let rank_1based = (rank + 1) as f64;
        raw[rank] = (results[i].pvalue * m as f64 / rank_1based).min(1.0);
    }
    // running minimum from the tail
    let mut running_min = f64::INFINITY;
    let mut q = vec![0.0f64; m];
    for rank in (0..m).rev() {
        running_min = running_min.min(raw[rank]);
        q[rank] = running_min;
    }
    for (rank, &i) in idx.iter().enumerate() {
        results[i].qvalue = Some(q[rank]);
    }
}
