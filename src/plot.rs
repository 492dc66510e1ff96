/// Plot coordinates for the titles retained in a `BlastHits`
///
/// A second pass over the records collects, for every retained title, one
/// item per kept HSP with its converted score and normalized coordinates.
/// Once every record has been seen each title is finalized: scores become
/// ranks or zero scores get synthetic values, and on a log-linear axis all
/// coordinates are remapped.
use crate::error::{Result, SummaryError};
use crate::hits::BlastHits;
use crate::hsp::{normalize_hsp, NormalizedHsp};
use crate::intervals::{IntervalKind, IntervalSet};
use crate::offsets::{OffsetAdjuster, DEFAULT_LOG_BASE};
use crate::records::{QueryLengths, RecordSource};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Width of the range random zero-score values are drawn from
pub const ZERO_SCORE_RANDOM_SPAN: f64 = 150.0;

/// Settings for `BlastHits::compute_plot_info`
#[derive(Debug, Clone, PartialEq)]
pub struct PlotParams {
    /// HSPs scoring at or above this are not plotted
    pub score_cutoff: Option<f64>,
    pub max_hsps_per_hit: Option<usize>,
    /// Queries starting before this subject offset are not plotted
    pub min_start: Option<i64>,
    /// Queries ending after this subject offset are not plotted
    pub max_stop: Option<i64>,
    pub log_linear_axis: bool,
    pub log_base: f64,
    pub randomize_zero_scores: bool,
    pub rank_scores: bool,
    /// Seed for the generator used by `randomize_zero_scores`
    pub random_seed: Option<u64>,
}

impl Default for PlotParams {
    fn default() -> Self {
        PlotParams {
            score_cutoff: None,
            max_hsps_per_hit: None,
            min_start: None,
            max_stop: None,
            log_linear_axis: false,
            log_base: DEFAULT_LOG_BASE,
            randomize_zero_scores: false,
            rank_scores: false,
            random_seed: None,
        }
    }
}

/// Y value of a plot item
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlotScore {
    /// `-log10(score)`
    Converted(f64),
    /// Raw score was exactly zero and has not been resolved yet
    PendingZero,
    /// Raw score was exactly zero, placed above the best converted score
    ResolvedZero(f64),
    /// 1-based rank, 1 being the worst raw score
    Rank(usize),
}

impl PlotScore {
    pub fn value(&self) -> Option<f64> {
        match *self {
            PlotScore::Converted(v) | PlotScore::ResolvedZero(v) => Some(v),
            PlotScore::Rank(rank) => Some(rank as f64),
            PlotScore::PendingZero => None,
        }
    }
}

/// Frames of the query and subject for an HSP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frames {
    pub query: i8,
    pub subject: i8,
}

/// One plotted HSP
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub score: PlotScore,
    pub raw_score: f64,
    pub hsp: NormalizedHsp,
    pub read_index: usize,
    pub query_length: usize,
    pub frame: Frames,
}

/// Plot data for one title
#[derive(Debug, Clone)]
pub struct PlotInfo {
    pub items: Vec<Item>,
    /// Every HSP seen for the title, before caps and filters
    pub hsp_total: usize,
    /// HSPs skipped because they could not be normalized
    pub normalization_failures: usize,
    pub min_score: Option<f64>,
    pub max_score: Option<f64>,
    pub max_score_including_zeros: Option<f64>,
    pub min_x: f64,
    pub max_x: f64,
    pub zero_score_found: bool,
    /// Query coverage, only on a log-linear axis
    pub intervals: Option<IntervalSet>,
    pub offset_adjuster: Option<OffsetAdjuster>,
}

impl PlotInfo {
    fn new(subject_length: usize, params: &PlotParams) -> Self {
        PlotInfo {
            items: Vec::new(),
            hsp_total: 0,
            normalization_failures: 0,
            min_score: None,
            max_score: None,
            max_score_including_zeros: None,
            min_x: params.min_start.unwrap_or(0) as f64,
            max_x: params
                .max_stop
                .map(|stop| stop as f64)
                .unwrap_or(subject_length as f64),
            zero_score_found: false,
            intervals: params
                .log_linear_axis
                .then(|| IntervalSet::new(subject_length as u64)),
            offset_adjuster: None,
        }
    }

    fn push(&mut self, item: Item) {
        match item.score {
            PlotScore::Converted(v) => {
                self.max_score = Some(self.max_score.map_or(v, |max| max.max(v)));
                self.min_score = Some(self.min_score.map_or(v, |min| min.min(v)));
            }
            PlotScore::PendingZero => self.zero_score_found = true,
            PlotScore::ResolvedZero(_) | PlotScore::Rank(_) => {}
        }
        self.min_x = self.min_x.min(item.hsp.query_start);
        self.max_x = self.max_x.max(item.hsp.query_end);
        self.items.push(item);
    }

    /// Replace scores with ranks, lowest converted score first. Ties keep
    /// insertion order and zero scores rank above everything else.
    fn convert_scores_to_ranks(&mut self) {
        let mut order: Vec<usize> = (0..self.items.len())
            .filter(|&i| self.items[i].score != PlotScore::PendingZero)
            .collect();
        order.sort_by_key(|&i| OrderedFloat(self.items[i].score.value().unwrap_or(0.0)));
        order.extend(
            (0..self.items.len()).filter(|&i| self.items[i].score == PlotScore::PendingZero),
        );

        for (rank, idx) in order.into_iter().enumerate() {
            self.items[idx].score = PlotScore::Rank(rank + 1);
        }

        let n = self.items.len();
        if n == 0 {
            self.min_score = None;
            self.max_score = None;
        } else {
            self.min_score = Some(1.0);
            self.max_score = Some(n as f64);
        }
        self.max_score_including_zeros = self.max_score;
        self.zero_score_found = false;
    }

    /// Give zero scores values above the best converted score
    fn resolve_zero_scores<R: Rng>(&mut self, randomize: bool, rng: &mut R) {
        let mut max_including_zeros = self.max_score;
        if self.zero_score_found {
            let base = self.max_score.unwrap_or(0.0);
            let mut next = base;
            for item in self.items.iter_mut() {
                if item.score != PlotScore::PendingZero {
                    continue;
                }
                let value = if randomize {
                    base + 2.0 + rng.gen_range(0.0..ZERO_SCORE_RANDOM_SPAN)
                } else {
                    next += 1.0;
                    next
                };
                item.score = PlotScore::ResolvedZero(value);
                max_including_zeros = Some(max_including_zeros.map_or(value, |max| max.max(value)));
            }
        }
        self.max_score_including_zeros = max_including_zeros;
    }

    /// Remap coordinates onto the log-linear axis
    fn adjust_axis(&mut self, log_base: f64) -> Result<()> {
        let Some(intervals) = self.intervals.as_ref() else {
            return Ok(());
        };
        let adjuster = OffsetAdjuster::new(intervals, log_base)?;

        let mut extent: Option<(f64, f64)> = None;
        for item in self.items.iter_mut() {
            item.hsp = adjuster.adjust_normalized_hsp(&item.hsp);
            let (start, end) = (item.hsp.query_start, item.hsp.query_end);
            extent = Some(extent.map_or((start, end), |(min, max)| (min.min(start), max.max(end))));
        }

        match extent {
            Some((mut min_x, mut max_x)) => {
                // Keep empty stretches at either end of the subject visible
                let segments: Vec<_> = intervals.walk().collect();
                if let Some(&(IntervalKind::Empty, (start, _))) = segments.first() {
                    min_x = min_x.min(adjuster.adjust_offset(start as f64));
                }
                if let Some(&(IntervalKind::Empty, (_, end))) = segments.last() {
                    max_x = max_x.max(adjuster.adjust_offset(end as f64));
                }
                self.min_x = min_x;
                self.max_x = max_x;
            }
            None => {
                self.min_x = adjuster.adjust_offset(self.min_x);
                self.max_x = adjuster.adjust_offset(self.max_x);
            }
        }

        self.offset_adjuster = Some(adjuster);
        Ok(())
    }
}

/// Convert a raw score to a plot score, or `None` if it is not in `[0, 1]`
fn convert_score(score: f64) -> Option<PlotScore> {
    if score == 0.0 {
        Some(PlotScore::PendingZero)
    } else if score > 0.0 && score <= 1.0 {
        Some(PlotScore::Converted(-score.log10()))
    } else {
        None
    }
}

impl BlastHits {
    /// Compute plot info for every retained title from a second pass over
    /// `source`, discarding any previous plot info.
    ///
    /// `lengths`, when given, replaces the query lengths carried by the
    /// records. A positional reference must have one entry per record; a
    /// keyed one must know every query that produced a record.
    pub fn compute_plot_info(
        &mut self,
        source: &dyn RecordSource,
        lengths: Option<&dyn QueryLengths>,
        params: &PlotParams,
    ) -> Result<()> {
        let mut rng = match params.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.compute_plot_info_with_rng(source, lengths, params, &mut rng)
    }

    /// As `compute_plot_info`, drawing random zero scores from `rng`
    pub fn compute_plot_info_with_rng<R: Rng>(
        &mut self,
        source: &dyn RecordSource,
        lengths: Option<&dyn QueryLengths>,
        params: &PlotParams,
        rng: &mut R,
    ) -> Result<()> {
        self.plot_info.clear();
        self.plot_params = None;

        if params.log_linear_axis && !(params.log_base.is_finite() && params.log_base > 1.0) {
            return Err(SummaryError::Config(format!(
                "log base must be greater than 1, got {}",
                params.log_base
            )));
        }
        if let Some(count) = lengths.and_then(|lengths| lengths.count()) {
            if count != self.record_count() {
                return Err(SummaryError::LengthCountMismatch {
                    records: self.record_count(),
                    lengths: count,
                });
            }
        }

        let mut plot_info = self.collect_items(source, lengths, params)?;

        for plot in plot_info.values_mut() {
            if params.rank_scores {
                plot.convert_scores_to_ranks();
            } else {
                plot.resolve_zero_scores(params.randomize_zero_scores, rng);
            }
            if params.log_linear_axis {
                plot.adjust_axis(params.log_base)?;
            }
        }

        self.plot_params = Some(params.clone());
        self.plot_info = plot_info;
        Ok(())
    }

    fn collect_items(
        &self,
        source: &dyn RecordSource,
        lengths: Option<&dyn QueryLengths>,
        params: &PlotParams,
    ) -> Result<IndexMap<String, PlotInfo>> {
        let mut plot_info: IndexMap<String, PlotInfo> = IndexMap::new();
        let mut found = 0;

        for (read_index, record) in source.records()?.enumerate() {
            let record = record?;
            found += 1;

            let query_length = match lengths {
                Some(lengths) => lengths
                    .query_length(read_index, &record.query_id)
                    .ok_or_else(|| match lengths.count() {
                        Some(_) => SummaryError::RecordCountMismatch {
                            expected: self.record_count(),
                            found,
                        },
                        None => SummaryError::MissingQueryLength(record.query_id.clone()),
                    })?,
                None => record.query_length,
            };

            for alignment in &record.alignments {
                let Some(hit_info) = self.hit_info(&alignment.title) else {
                    continue;
                };
                let plot = plot_info
                    .entry(alignment.title.clone())
                    .or_insert_with(|| PlotInfo::new(hit_info.length, params));
                plot.hsp_total += alignment.hsps.len();

                for (hsp_index, hsp) in alignment.hsps.iter().enumerate() {
                    if params.max_hsps_per_hit.is_some_and(|max| hsp_index >= max) {
                        break;
                    }

                    let Ok(normalized) = normalize_hsp(hsp, query_length) else {
                        plot.normalization_failures += 1;
                        continue;
                    };

                    if params
                        .min_start
                        .is_some_and(|start| normalized.query_start < start as f64)
                        || params
                            .max_stop
                            .is_some_and(|stop| normalized.query_end > stop as f64)
                    {
                        continue;
                    }

                    if let Some(intervals) = plot.intervals.as_mut() {
                        intervals.add(normalized.query_start as i64, normalized.query_end as i64);
                    }

                    if params.score_cutoff.is_some_and(|cutoff| hsp.score >= cutoff) {
                        continue;
                    }

                    let score =
                        convert_score(hsp.score).ok_or_else(|| SummaryError::ScoreOutOfRange {
                            title: alignment.title.clone(),
                            score: hsp.score,
                        })?;

                    plot.push(Item {
                        score,
                        raw_score: hsp.score,
                        hsp: normalized,
                        read_index,
                        query_length,
                        frame: Frames {
                            query: hsp.query_frame,
                            subject: hsp.subject_frame,
                        },
                    });
                }
            }
        }

        if found != self.record_count() {
            return Err(SummaryError::RecordCountMismatch {
                expected: self.record_count(),
                found,
            });
        }

        Ok(plot_info)
    }
}
