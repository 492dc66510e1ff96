/// Strand-independent HSP coordinates
use crate::error::HspError;
use crate::records::Hsp;

/// HSP coordinates on the subject axis, 0-based and half-open.
///
/// `subject_start..subject_end` is the matched stretch of the subject.
/// `query_start..query_end` is where the whole query falls when laid against
/// the subject, so it can start before 0 or end past the subject length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedHsp {
    pub query_start: f64,
    pub query_end: f64,
    pub subject_start: f64,
    pub subject_end: f64,
}

/// Check one side's offsets against its frame and return them ascending
fn oriented(side: &'static str, start: u64, end: u64, frame: i8) -> Result<(u64, u64), HspError> {
    if frame == 0 {
        return Err(HspError::ZeroFrame { side });
    }
    if start == 0 || end == 0 {
        return Err(HspError::ZeroOffset { side, start, end });
    }
    let ascending = start <= end;
    let descending = start >= end;
    if (frame > 0 && !ascending) || (frame < 0 && !descending) {
        return Err(HspError::OrientationMismatch {
            side,
            start,
            end,
            frame,
        });
    }
    Ok((start.min(end), start.max(end)))
}

/// Normalize a raw HSP against the length of its query.
pub fn normalize_hsp(hsp: &Hsp, query_length: usize) -> Result<NormalizedHsp, HspError> {
    let (query_low, query_high) = oriented("query", hsp.query_start, hsp.query_end, hsp.query_frame)?;
    let (subject_low, subject_high) = oriented(
        "subject",
        hsp.subject_start,
        hsp.subject_end,
        hsp.subject_frame,
    )?;

    if query_high > query_length as u64 {
        return Err(HspError::BeyondQuery {
            start: hsp.query_start,
            end: hsp.query_end,
            query_length,
        });
    }

    let subject_start = (subject_low - 1) as f64;
    let subject_end = subject_high as f64;
    let query_offset = (query_low - 1) as f64;
    let query_length = query_length as f64;

    // Opposite strands lay the query reversed along the subject
    let (query_start, query_end) = if (hsp.query_frame > 0) == (hsp.subject_frame > 0) {
        let start = subject_start - query_offset;
        (start, start + query_length)
    } else {
        let end = subject_end + query_offset;
        (end - query_length, end)
    };

    Ok(NormalizedHsp {
        query_start,
        query_end,
        subject_start,
        subject_end,
    })
}
