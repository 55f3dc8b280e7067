//! AnnotatorResult (C8): per-(track, annotation, counter) summary of an
//! empirical null distribution against an observed count.

/// One row of the output table, plus the raw null vector that produced it.
#[derive(Debug, Clone)]
pub struct AnnotatorResult {
    pub track: String,
    pub annotation: String,
    pub counter: String,
    pub observed: f64,
    pub expected: f64,
    pub lower95: f64,
    pub upper95: f64,
    pub stddev: f64,
    pub fold: f64,
    pub pvalue: f64,
    /// Filled in later by the FDR pass (C9); `None` until then.
    pub qvalue: Option<f64>,
    /// Null distribution samples, in `sample_id` order.
    pub samples: Vec<f64>,
}

impl AnnotatorResult {
    /// Build a result from an observed count and a null vector, per §4.8.
    /// If `reference` is given, the test is re-centered on it: p-values and
    /// fold-change measure divergence of `observed` from the reference's
    /// own observed/expected relationship rather than from this run's `S`.
    pub fn new(
        track: impl Into<String>,
        annotation: impl Into<String>,
        counter: impl Into<String>,
        observed: f64,
        samples: Vec<f64>,
        pseudo_count: f64,
        reference: Option<&AnnotatorResult>,
    ) -> Self {
        let expected = mean(&samples);
        let stddev = population_stddev(&samples, expected);
        let (lower95, upper95) = if samples.is_empty() {
            (0.0, 0.0)
        } else {
            (percentile(&samples, 0.025), percentile(&samples, 0.975))
        };

        let (centered_observed, centering_base) = match reference {
            Some(r) => (observed - r.observed, r.expected),
            None => (observed, expected),
        };

        let fold = (centered_observed + pseudo_count) / (centering_base + pseudo_count);
        let pvalue = empirical_two_sided_pvalue(&samples, centered_observed, pseudo_count);

        Self {
            track: track.into(),
            annotation: annotation.into(),
            counter: counter.into(),
            observed,
            expected,
            lower95,
            upper95,
            stddev,
            fold,
            pvalue,
            qvalue: None,
            samples,
        }
    }

    /// A result for a track/annotation pair whose conditioned workspace
    /// collapsed to nothing (§8 S5): `expected = 0`, `pvalue = 1`.
    pub fn empty(track: impl Into<String>, annotation: impl Into<String>, counter: impl Into<String>) -> Self {
        Self {
            track: track.into(),
            annotation: annotation.into(),
            counter: counter.into(),
            observed: 0.0,
            expected: 0.0,
            lower95: 0.0,
            upper95: 0.0,
            stddev: 0.0,
            fold: 1.0,
            pvalue: 1.0,
            qvalue: None,
            samples: Vec::new(),
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn population_stddev(values: &[f64], mean_value: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance =
        values.iter().map(|v| (v - mean_value).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linear-interpolation percentile over a copy of `values`, `q` in `[0, 1]`.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = rank - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

/// Two-sided empirical tail probability with pseudo-count, per §4.8:
/// `p = max(min(#{s >= observed}, #{s <= observed}) + eps, eps) / (|S| + eps)`,
/// doubled and clamped to at most 1.
pub fn empirical_two_sided_pvalue(samples: &[f64], observed: f64, pseudo_count: f64) -> f64 {
    if samples.is_empty() {
        return 1.0;
    }
    let ge = samples.iter().filter(|&&s| s >= observed).count() as f64;
    let le = samples.iter().filter(|&&s| s <= observed).count() as f64;
    let numerator = (ge.min(le) + pseudo_count).max(pseudo_count);
    let p = numerator / (samples.len() as f64 + pseudo_count);
    (p * 2.0).min(1.0)
}
