//! Boundary interval parser (§6): reads BED3(+) files into
//! [`IntervalCollection`]s, tolerating comment/track/browser lines the way
//! genome browsers emit them.

use crate::collection::IntervalCollection;
use crate::error::{EngineError, InputError};
use crate::segment_list::SegmentList;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Splits a tab-delimited line into fields using `memchr` to locate each
/// separator, rather than `str::split`'s byte-by-byte scan — the hot path
/// for every record in a multi-million-line BED file.
fn split_tab_fields(line: &str) -> impl Iterator<Item = &str> {
    let bytes = line.as_bytes();
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos > bytes.len() {
            return None;
        }
        match memchr::memchr(b'\t', &bytes[pos..]) {
            Some(offset) => {
                let field = &line[pos..pos + offset];
                pos += offset + 1;
                Some(field)
            }
            None => {
                let field = &line[pos..];
                pos = bytes.len() + 1;
                Some(field)
            }
        }
    })
}

/// One parsed BED line, before being folded into a [`SegmentList`] per contig.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryRecord {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    pub name: Option<String>,
}

/// Streaming reader over a BED-like boundary file. Only the first three
/// columns (contig, start, end) and an optional fourth (name) matter here —
/// the engine has no use for score/strand/thick-start fields.
pub struct BoundaryReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl BoundaryReader<File> {
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::error::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> BoundaryReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    pub fn read_record(&mut self) -> crate::error::Result<Option<BoundaryRecord>> {
        loop {
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            return self.parse_line(line).map(Some);
        }
    }

    fn parse_line(&self, line: &str) -> crate::error::Result<BoundaryRecord> {
        let mut fields = split_tab_fields(line);
        let contig = fields.next().ok_or_else(|| self.parse_error("missing contig"))?;
        let start = fields
            .next()
            .ok_or_else(|| self.parse_error("missing start"))
            .and_then(|s| self.parse_position(s, "start"))?;
        let end = fields
            .next()
            .ok_or_else(|| self.parse_error("missing end"))
            .and_then(|s| self.parse_position(s, "end"))?;

        if start > end {
            return Err(self.parse_error(&format!("start ({start}) > end ({end})")));
        }

        let name = fields.next().map(|s| s.to_string());

        Ok(BoundaryRecord {
            contig: contig.to_string(),
            start,
            end,
            name,
        })
    }

    fn parse_position(&self, s: &str, field_name: &str) -> crate::error::Result<u64> {
        s.parse()
            .map_err(|_| self.parse_error(&format!("invalid {field_name} position: '{s}'")))
    }

    fn parse_error(&self, message: &str) -> EngineError {
        EngineError::Input(InputError::Parse {
            line: self.line_number,
            message: message.to_string(),
        })
    }

    pub fn records(self) -> BoundaryRecordIter<R> {
        BoundaryRecordIter { reader: self }
    }
}

pub struct BoundaryRecordIter<R: Read> {
    reader: BoundaryReader<R>,
}

impl<R: Read> Iterator for BoundaryRecordIter<R> {
    type Item = crate::error::Result<BoundaryRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read a boundary file and fold it into `collection` under `track`, one
/// [`SegmentList`] per contig encountered.
pub fn load_into_collection<P: AsRef<Path>>(
    path: P,
    track: &str,
    collection: &mut IntervalCollection,
) -> crate::error::Result<()> {
    let reader = BoundaryReader::from_path(path)?;
    let mut by_contig: FxHashMap<String, SegmentList> = FxHashMap::default();
    for record in reader.records() {
        let record = record?;
        by_contig.entry(record.contig).or_default().add(record.start, record.end);
    }
    for (contig, segs) in by_contig {
        collection.add(track, contig, segs);
    }
    Ok(())
}

/// Read a multi-track boundary file (BED4, name column distinguishes
/// tracks) into `collection`, one [`SegmentList`] per `(name, contig)` pair.
/// Records with no name column are folded into `default_track`.
pub fn load_multi_track<P: AsRef<Path>>(
    path: P,
    default_track: &str,
    collection: &mut IntervalCollection,
) -> crate::error::Result<()> {
    let reader = BoundaryReader::from_path(path)?;
    let mut by_track_contig: FxHashMap<(String, String), SegmentList> = FxHashMap::default();
    for record in reader.records() {
        let record = record?;
        let track = record.name.unwrap_or_else(|| default_track.to_string());
        by_track_contig
            .entry((track, record.contig))
            .or_default()
            .add(record.start, record.end);
    }
    for ((track, contig), segs) in by_track_contig {
        collection.add(track, contig, segs);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_tab_fields_handles_trailing_and_missing_columns() {
        assert_eq!(
            split_tab_fields("chr1\t100\t200\tname").collect::<Vec<_>>(),
            vec!["chr1", "100", "200", "name"]
        );
        assert_eq!(split_tab_fields("chr1\t100\t200").collect::<Vec<_>>(), vec!["chr1", "100", "200"]);
        assert_eq!(split_tab_fields("chr1").collect::<Vec<_>>(), vec!["chr1"]);
    }

    #[test]
    fn parses_bed3_lines() {
        let content = "chr1\t100\t200\nchr1\t300\t400\n";
        let reader = BoundaryReader::new(content.as_bytes());
        let records: Vec<_> = reader.records().collect::<crate::error::Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].contig, "chr1");
        assert_eq!(records[0].start, 100);
        assert_eq!(records[0].end, 200);
    }

    #[test]
    fn skips_comment_and_track_and_browser_lines() {
        let content = "# comment\ntrack name=foo\nbrowser position chr1:1-1000\nchr1\t10\t20\n";
        let reader = BoundaryReader::new(content.as_bytes());
        let records: Vec<_> = reader.records().collect::<crate::error::Result<_>>().unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn rejects_start_after_end() {
        let content = "chr1\t200\t100\n";
        let reader = BoundaryReader::new(content.as_bytes());
        let result: crate::error::Result<Vec<_>> = reader.records().collect();
        assert!(result.is_err());
    }

    #[test]
    fn load_into_collection_groups_by_contig() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segs.bed");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "chr1\t0\t10\nchr1\t20\t30\nchr2\t0\t5\n").unwrap();

        let mut collection = IntervalCollection::new();
        load_into_collection(&path, "segs", &mut collection).unwrap();

        let tracks: Vec<&String> = collection.tracks().collect();
        assert_eq!(tracks, vec!["segs"]);
        let mut chr1 = collection.get("segs").unwrap().get("chr1").unwrap().clone();
        assert_eq!(chr1.spans(), &[(0, 10), (20, 30)]);
    }

    #[test]
    fn load_multi_track_splits_on_name_column() {
        use std::io::Write;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("isochores.bed");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "chr1\t0\t500\tlo\nchr1\t500\t1000\thi\n").unwrap();

        let mut collection = IntervalCollection::new();
        load_multi_track(&path, "default", &mut collection).unwrap();

        let mut tracks: Vec<&String> = collection.tracks().collect();
        tracks.sort();
        assert_eq!(tracks, vec!["hi", "lo"]);
    }
}
