/// Replayable record source over BLAST tabular output
///
/// Expected columns (BLAST `-outfmt "6 qseqid qlen stitle slen evalue qstart
/// qend sstart send qframe sframe"`), tab separated. Consecutive lines with
/// the same query id form one record, consecutive lines of a record with the
/// same subject title form one alignment, and HSPs keep line order.
use crate::records::{Alignment, Hsp, Record, RecordIter, RecordSource};
use anyhow::{bail, Context, Result};
use noodles::bgzf;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::iter::Peekable;
use std::path::{Path, PathBuf};

const N_COLUMNS: usize = 11;

/// Open a file and auto-detect bgzip compression, returning a boxed BufRead
pub fn open_tabular_input<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    // Check by file extension (faster than reading magic bytes)
    let is_compressed = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext == "gz" || ext == "bgz")
        .unwrap_or(false);

    if is_compressed {
        Ok(Box::new(BufReader::new(bgzf::io::reader::Reader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// One parsed line
#[derive(Debug, Clone, PartialEq)]
struct TabularLine {
    query_id: String,
    query_length: usize,
    title: String,
    subject_length: usize,
    hsp: Hsp,
}

fn parse_line(line: &str, line_number: usize) -> Result<TabularLine> {
    let fields: Vec<&str> = line.trim_end_matches(['\n', '\r']).split('\t').collect();

    if fields.len() < N_COLUMNS {
        bail!(
            "Line {line_number} has {} fields, expected {N_COLUMNS}",
            fields.len()
        );
    }

    let context = |name: &str| format!("Invalid {name} on line {line_number}");

    Ok(TabularLine {
        query_id: fields[0].to_string(),
        query_length: fields[1].parse().with_context(|| context("query length"))?,
        title: fields[2].to_string(),
        subject_length: fields[3].parse().with_context(|| context("subject length"))?,
        hsp: Hsp {
            score: fields[4].parse().with_context(|| context("e-value"))?,
            query_start: fields[5].parse().with_context(|| context("query start"))?,
            query_end: fields[6].parse().with_context(|| context("query end"))?,
            subject_start: fields[7].parse().with_context(|| context("subject start"))?,
            subject_end: fields[8].parse().with_context(|| context("subject end"))?,
            query_frame: fields[9].parse().with_context(|| context("query frame"))?,
            subject_frame: fields[10].parse().with_context(|| context("subject frame"))?,
        },
    })
}

/// Streams parsed lines, skipping blanks and `#` comments
struct LineReader {
    lines: Lines<Box<dyn BufRead>>,
    line_number: usize,
}

impl Iterator for LineReader {
    type Item = Result<TabularLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_number += 1;

            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(parse_line(&line, self.line_number));
        }
    }
}

/// Groups consecutive lines into records
struct RecordGrouper {
    lines: Peekable<LineReader>,
    remaining: Option<usize>,
}

impl RecordGrouper {
    fn next_record(&mut self) -> Result<Option<Record>> {
        let first = match self.lines.next() {
            Some(line) => line?,
            None => return Ok(None),
        };

        let mut record = Record::new(first.query_id.clone(), first.query_length);
        push_hsp(&mut record, first);

        loop {
            let same_query = match self.lines.peek() {
                Some(Ok(line)) => line.query_id == record.query_id,
                // Errors surface from the record being built.
                Some(Err(_)) => true,
                None => false,
            };
            if !same_query {
                break;
            }
            if let Some(line) = self.lines.next() {
                push_hsp(&mut record, line?);
            }
        }

        Ok(Some(record))
    }
}

fn push_hsp(record: &mut Record, line: TabularLine) {
    match record.alignments.last_mut() {
        Some(alignment) if alignment.title == line.title => alignment.hsps.push(line.hsp),
        _ => record.alignments.push(Alignment {
            title: line.title,
            length: line.subject_length,
            hsps: vec![line.hsp],
        }),
    }
}

impl Iterator for RecordGrouper {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }
        self.next_record().transpose()
    }
}

/// Tabular BLAST output on disk, re-read on every pass
#[derive(Debug, Clone)]
pub struct TabularRecords {
    path: PathBuf,
    limit: Option<usize>,
}

impl TabularRecords {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        TabularRecords {
            path: path.as_ref().to_path_buf(),
            limit: None,
        }
    }

    /// Stop every pass after `limit` records
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for TabularRecords {
    fn records(&self) -> Result<RecordIter<'_>> {
        let input = open_tabular_input(&self.path)?;
        let lines = LineReader {
            lines: input.lines(),
            line_number: 0,
        };
        Ok(Box::new(RecordGrouper {
            lines: lines.peekable(),
            remaining: self.limit,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let line = "read1\t150\tgi|1 Some virus\t9000\t1e-30\t1\t150\t201\t350\t1\t-1";
        let parsed = parse_line(line, 1).unwrap();

        assert_eq!(parsed.query_id, "read1");
        assert_eq!(parsed.query_length, 150);
        assert_eq!(parsed.title, "gi|1 Some virus");
        assert_eq!(parsed.subject_length, 9000);
        assert_eq!(parsed.hsp.score, 1e-30);
        assert_eq!(parsed.hsp.subject_end, 350);
        assert_eq!(parsed.hsp.subject_frame, -1);
    }

    #[test]
    fn test_parse_line_too_few_fields() {
        let err = parse_line("read1\t150\tsubject", 7).unwrap_err();
        assert!(err.to_string().contains("Line 7"));
    }

    #[test]
    fn test_parse_line_bad_number() {
        let line = "read1\tNaNish\tsubject\t9000\t1e-30\t1\t150\t201\t350\t1\t1";
        let err = parse_line(line, 3).unwrap_err();
        assert!(err.to_string().contains("query length"));
    }
}
