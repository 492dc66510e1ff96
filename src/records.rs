/// Search result data model and the record source contract
///
/// A record source must be replayable: aggregation reads it once and plot
/// computation reads it again, so every call to `records()` starts a fresh,
/// independent pass in the same order.
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use std::io::BufRead;

/// One local match region between a query and a subject.
///
/// Offsets are BLAST style: 1-based and inclusive, with start > end on a
/// side whose frame is negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Hsp {
    /// Match quality, lower is better (an e-value)
    pub score: f64,
    pub query_start: u64,
    pub query_end: u64,
    pub subject_start: u64,
    pub subject_end: u64,
    pub query_frame: i8,
    pub subject_frame: i8,
}

/// A candidate subject match for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    /// Subject title, the grouping key for aggregation
    pub title: String,
    /// Subject length
    pub length: usize,
    /// HSPs, best first
    pub hsps: Vec<Hsp>,
}

/// One query sequence's search result.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub query_id: String,
    pub query_length: usize,
    pub alignments: Vec<Alignment>,
}

impl Record {
    pub fn new(query_id: impl Into<String>, query_length: usize) -> Self {
        Record {
            query_id: query_id.into(),
            query_length,
            alignments: Vec::new(),
        }
    }
}

pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record>> + 'a>;

/// A finite, ordered and replayable sequence of records.
pub trait RecordSource {
    /// Start a new pass over all records.
    fn records(&self) -> Result<RecordIter<'_>>;
}

/// Records cached in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecords {
    records: Vec<Record>,
}

impl InMemoryRecords {
    pub fn new(records: Vec<Record>) -> Self {
        InMemoryRecords { records }
    }

    /// Materialize every record of another source
    pub fn collect_from(source: &dyn RecordSource) -> Result<Self> {
        let records = source.records()?.collect::<Result<Vec<_>>>()?;
        Ok(InMemoryRecords { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn as_slice(&self) -> &[Record] {
        &self.records
    }
}

impl RecordSource for InMemoryRecords {
    fn records(&self) -> Result<RecordIter<'_>> {
        Ok(Box::new(self.records.iter().cloned().map(Ok)))
    }
}

/// Reference lengths for queries.
///
/// A positional reference has one entry per record and reports its size
/// through `count`. A keyed reference looks queries up by id, may hold
/// queries that produced no record, and returns `None` from `count`.
pub trait QueryLengths {
    /// Number of entries of a positional reference
    fn count(&self) -> Option<usize>;

    fn query_length(&self, index: usize, query_id: &str) -> Option<usize>;
}

impl QueryLengths for [usize] {
    fn count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn query_length(&self, index: usize, _query_id: &str) -> Option<usize> {
        self.get(index).copied()
    }
}

impl QueryLengths for Vec<usize> {
    fn count(&self) -> Option<usize> {
        Some(self.len())
    }

    fn query_length(&self, index: usize, _query_id: &str) -> Option<usize> {
        self.get(index).copied()
    }
}

/// Query lengths keyed by sequence name, as listed in a FASTA index
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FaiLengths {
    lengths: IndexMap<String, usize>,
}

impl FaiLengths {
    /// Read `.fai` lines: name, then length, then columns that are ignored.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lengths = IndexMap::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let name = fields.next().unwrap_or_default();
            let length: usize = fields
                .next()
                .with_context(|| format!("Missing length column on FASTA index line {}", i + 1))?
                .trim()
                .parse()
                .with_context(|| format!("Invalid length on FASTA index line {}", i + 1))?;
            if lengths.insert(name.to_string(), length).is_some() {
                bail!("Sequence {name:?} listed twice in FASTA index");
            }
        }

        Ok(FaiLengths { lengths })
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<usize> {
        self.lengths.get(name).copied()
    }
}

impl QueryLengths for FaiLengths {
    fn count(&self) -> Option<usize> {
        None
    }

    fn query_length(&self, _index: usize, query_id: &str) -> Option<usize> {
        self.get(query_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Record {
        let mut record = Record::new(id, 100);
        record.alignments.push(Alignment {
            title: "subject".to_string(),
            length: 1000,
            hsps: vec![Hsp {
                score: 1e-5,
                query_start: 1,
                query_end: 100,
                subject_start: 11,
                subject_end: 110,
                query_frame: 1,
                subject_frame: 1,
            }],
        });
        record
    }

    #[test]
    fn test_in_memory_replay() {
        let source = InMemoryRecords::new(vec![record("q1"), record("q2")]);

        let first: Vec<String> = source
            .records()
            .unwrap()
            .map(|r| r.unwrap().query_id)
            .collect();
        let second: Vec<String> = source
            .records()
            .unwrap()
            .map(|r| r.unwrap().query_id)
            .collect();

        assert_eq!(first, vec!["q1", "q2"]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_collect_from_source() {
        let source = InMemoryRecords::new(vec![record("q1")]);
        let cached = InMemoryRecords::collect_from(&source).unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.as_slice()[0].alignments[0].hsps.len(), 1);
    }

    #[test]
    fn test_query_lengths_slice() {
        let lengths = vec![10usize, 20, 30];
        assert_eq!(lengths.count(), Some(3));
        assert_eq!(lengths.query_length(1, "ignored"), Some(20));
        assert_eq!(lengths.query_length(3, "ignored"), None);
        assert_eq!(lengths.as_slice().query_length(0, "ignored"), Some(10));
    }

    #[test]
    fn test_fai_lengths_by_name() {
        let fai = "read0\t150\t7\t60\t61\nread1\t90\t166\t60\t61\n\nread2\t120\t265\t60\t61\n";
        let lengths = FaiLengths::from_reader(fai.as_bytes()).unwrap();

        assert_eq!(lengths.len(), 3);
        assert_eq!(lengths.count(), None);
        assert_eq!(lengths.query_length(0, "read2"), Some(120));
        assert_eq!(lengths.query_length(2, "read0"), Some(150));
        assert_eq!(lengths.query_length(0, "read9"), None);
    }

    #[test]
    fn test_fai_lengths_errors() {
        let err = FaiLengths::from_reader("read0\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 1"));

        let err = FaiLengths::from_reader("read0\tlong\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Invalid length"));

        let err = FaiLengths::from_reader("read0\t10\nread0\t12\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }
}
