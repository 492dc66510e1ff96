use crate::error::{Result, SummaryError};
use crate::hsp::NormalizedHsp;
use crate::intervals::{IntervalKind, IntervalSet};

/// Default logarithm base for compressing empty stretches of the X axis
pub const DEFAULT_LOG_BASE: f64 = 1.1;

/// One walked segment with its position on the compressed axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    start: u64,
    end: u64,
    adjusted_start: f64,
    adjusted_end: f64,
}

impl Segment {
    fn scale(&self) -> f64 {
        (self.adjusted_end - self.adjusted_start) / (self.end - self.start) as f64
    }
}

/// Maps subject offsets onto a log-linear axis.
///
/// Covered stretches keep their width and an empty stretch of width `w` is
/// squeezed to `log_base(w + 1)`. Offsets inside a segment are interpolated
/// linearly, offsets left of zero are unchanged, and offsets past the end
/// keep their distance from the compressed end.
#[derive(Debug, Clone)]
pub struct OffsetAdjuster {
    base: f64,
    length: u64,
    segments: Vec<Segment>,
}

impl OffsetAdjuster {
    pub fn new(intervals: &IntervalSet, base: f64) -> Result<Self> {
        if !(base.is_finite() && base > 1.0) {
            return Err(SummaryError::Config(format!(
                "log base must be greater than 1, got {base}"
            )));
        }

        let log_base = base.ln();
        let mut segments = Vec::new();
        let mut adjusted = 0.0;

        for (kind, (start, end)) in intervals.walk() {
            let width = (end - start) as f64;
            let adjusted_width = match kind {
                IntervalKind::Covered => width,
                IntervalKind::Empty => (width + 1.0).ln() / log_base,
            };
            segments.push(Segment {
                start,
                end,
                adjusted_start: adjusted,
                adjusted_end: adjusted + adjusted_width,
            });
            adjusted += adjusted_width;
        }

        Ok(OffsetAdjuster {
            base,
            length: intervals.length(),
            segments,
        })
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    /// Length of the compressed axis
    pub fn adjusted_length(&self) -> f64 {
        self.segments.last().map(|s| s.adjusted_end).unwrap_or(0.0)
    }

    pub fn adjust_offset(&self, offset: f64) -> f64 {
        let Some(last) = self.segments.last() else {
            return offset;
        };

        if offset <= 0.0 {
            return offset;
        }
        if offset >= self.length as f64 {
            return last.adjusted_end + (offset - self.length as f64);
        }

        let idx = self
            .segments
            .partition_point(|segment| (segment.end as f64) <= offset);
        let segment = &self.segments[idx];
        segment.adjusted_start + (offset - segment.start as f64) * segment.scale()
    }

    /// Adjust every coordinate of a normalized HSP
    pub fn adjust_normalized_hsp(&self, hsp: &NormalizedHsp) -> NormalizedHsp {
        NormalizedHsp {
            query_start: self.adjust_offset(hsp.query_start),
            query_end: self.adjust_offset(hsp.query_end),
            subject_start: self.adjust_offset(hsp.subject_start),
            subject_end: self.adjust_offset(hsp.subject_end),
        }
    }
}
