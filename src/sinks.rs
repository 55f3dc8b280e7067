//! Output sinks (§6): sample-stats TSV, sample-dump, and counts-dump
//! writers/reader, matching the file formats the original tool produces.

use crate::result::{mean, percentile, population_stddev};
use crate::segment_list::SegmentList;
use std::io::{self, BufRead, Write};

/// Writes the `sample\tisochore\tnsegments\tnnucleotides\tmean\tstd\tmin\tq1\t
/// median\tq3\tmax` table (§6), one row per isochore per sample, plus a
/// trailing `isochore="all"` row summarizing every isochore of that sample.
pub struct SampleStatsSink {
    writer: Box<dyn Write + Send>,
    pending_lengths: Vec<f64>,
    current_sample: Option<usize>,
}

impl SampleStatsSink {
    pub fn new(mut writer: Box<dyn Write + Send>) -> io::Result<Self> {
        writeln!(
            writer,
            "sample\tisochore\tnsegments\tnnucleotides\tmean\tstd\tmin\tq1\tmedian\tq3\tmax"
        )?;
        Ok(Self {
            writer,
            pending_lengths: Vec::new(),
            current_sample: None,
        })
    }

    fn row(&mut self, sample_id: usize, isochore: &str, lengths: &[f64]) {
        let row = stats_row(sample_id, isochore, lengths);
        let _ = writeln!(self.writer, "{row}");
    }

    /// Record one isochore's sample and accumulate it into the running
    /// per-`sample_id` total used by [`Self::write_summary_row`].
    pub fn write_isochore(&mut self, sample_id: usize, isochore: &str, sample: &mut SegmentList) {
        if self.current_sample != Some(sample_id) {
            self.pending_lengths.clear();
            self.current_sample = Some(sample_id);
        }
        let lengths: Vec<f64> = sample.as_lengths().into_iter().map(|l| l as f64).collect();
        self.pending_lengths.extend(lengths.iter().copied());
        self.row(sample_id, isochore, &lengths);
    }

    /// Emit the `isochore="all"` row summarizing everything accumulated for
    /// `sample_id` since the last call, then reset the accumulator.
    pub fn write_summary_row(&mut self, sample_id: usize) {
        let lengths = std::mem::take(&mut self.pending_lengths);
        self.row(sample_id, "all", &lengths);
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

fn stats_row(sample_id: usize, isochore: &str, lengths: &[f64]) -> String {
    if lengths.is_empty() {
        return format!("{sample_id}\t{isochore}\t0\t0\t0\t0\t0\t0\t0\t0\t0");
    }
    let nsegments = lengths.len();
    let nnucleotides: f64 = lengths.iter().sum();
    let m = mean(lengths);
    let std = population_stddev(lengths, m);
    let min = percentile(lengths, 0.0);
    let q1 = percentile(lengths, 0.25);
    let median = percentile(lengths, 0.5);
    let q3 = percentile(lengths, 0.75);
    let max = percentile(lengths, 1.0);
    format!(
        "{sample_id}\t{isochore}\t{nsegments}\t{nnucleotides}\t{m:.4}\t{std:.4}\t{min:.4}\t{q1:.4}\t{median:.4}\t{q3:.4}\t{max:.4}"
    )
}

/// Writes the `track name=<sample_id>` / `isochore\tstart\tend` sample-dump
/// format (§6), readable back by [`crate::sample_store::PreGeneratedFromFiles`].
pub struct SampleDumpSink {
    writer: Box<dyn Write + Send>,
    current_sample: Option<usize>,
}

impl SampleDumpSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            current_sample: None,
        }
    }

    pub fn write_sample(&mut self, sample_id: usize, isochore: &str, sample: &mut SegmentList) {
        if self.current_sample != Some(sample_id) {
            let _ = writeln!(self.writer, "track name={sample_id}");
            self.current_sample = Some(sample_id);
        }
        let mut int_buf = itoa::Buffer::new();
        for &(start, end) in sample.spans() {
            let start = int_buf.format(start).to_string();
            let end_formatted = int_buf.format(end);
            let _ = writeln!(self.writer, "{isochore}\t{start}\t{end_formatted}");
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Writes the `track\tannotation\tobserved\tcounts` counts-dump table: one
/// row per `AnnotatorResult`, with the null vector as a comma-joined
/// integer-or-float list in `sample_id` order. One file per counter (see
/// `commands/run.rs`'s `by_counter` grouping), so the counter itself is
/// carried by the filename's `%s` substitution, not a column.
pub fn write_counts_dump(
    writer: &mut dyn Write,
    results: &[crate::result::AnnotatorResult],
) -> io::Result<()> {
    writeln!(writer, "track\tannotation\tobserved\tcounts")?;
    let mut buf = ryu::Buffer::new();
    for r in results {
        let mut counts = String::with_capacity(r.samples.len() * 8);
        for (i, v) in r.samples.iter().enumerate() {
            if i > 0 {
                counts.push(',');
            }
            counts.push_str(buf.format(*v));
        }
        writeln!(writer, "{}\t{}\t{}\t{}", r.track, r.annotation, r.observed, counts)?;
    }
    Ok(())
}

/// One row parsed back out of a counts-dump file: enough to reconstruct an
/// `AnnotatorResult` via `AnnotatorResult::new`, the inverse of
/// [`write_counts_dump`] (the original's `fromCounts`). Carries no counter —
/// the file doesn't record one — so callers fill it in from context (or
/// fall back to the original's `"na"` placeholder when there is none).
pub struct CountsDumpRow {
    pub track: String,
    pub annotation: String,
    pub observed: f64,
    pub samples: Vec<f64>,
}

pub fn read_counts_dump(reader: impl BufRead) -> io::Result<Vec<CountsDumpRow>> {
    let mut lines = reader.lines();
    let header = lines.next().transpose()?;
    if header.as_deref() != Some("track\tannotation\tobserved\tcounts") {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "unexpected counts-dump header",
        ));
    }

    let mut rows = Vec::new();
    for line in lines {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let mut parts = line.splitn(4, '\t');
        let (Some(track), Some(annotation), Some(observed), Some(counts)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "malformed counts-dump row"));
        };
        let observed: f64 = observed
            .parse()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad observed value"))?;
        let samples: Vec<f64> = if counts.is_empty() {
            Vec::new()
        } else {
            counts
                .split(',')
                .map(|s| {
                    s.parse()
                        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "bad sample value"))
                })
                .collect::<io::Result<Vec<f64>>>()?
        };
        rows.push(CountsDumpRow {
            track: track.to_string(),
            annotation: annotation.to_string(),
            observed,
            samples,
        });
    }
    Ok(rows)
}
