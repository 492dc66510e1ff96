/// Per-title aggregation of search hits
///
/// `BlastHits::from_records` streams the records once, keeping running
/// per-title state, then reduces each title to summary statistics and
/// applies the statistics filter. Re-filtering an existing `BlastHits` does
/// not touch the records and shares the `HitInfo` values.
use crate::error::{Result, SummaryError};
use crate::hit_info_filter::HitInfoFilter;
use crate::plot::{PlotInfo, PlotParams};
use crate::records::RecordSource;
use crate::title_filter::{TitleDecision, TitleFilter, TitleFilterParams};
use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Summary of every read that hit one subject title
#[derive(Debug, Clone, PartialEq)]
pub struct HitInfo {
    /// Number of alignments (one per read per title) that contributed
    pub read_count: usize,
    /// Indices of the contributing records
    pub read_indices: BTreeSet<usize>,
    /// Subject length, from the first alignment seen for the title
    pub length: usize,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: f64,
}

impl HitInfo {
    /// Reduce per-read best scores to summary statistics.
    ///
    /// Returns `None` for an empty score list.
    pub fn from_scores(
        scores: &[f64],
        read_count: usize,
        read_indices: BTreeSet<usize>,
        length: usize,
    ) -> Option<Self> {
        if scores.is_empty() {
            return None;
        }

        let mean_score = scores.iter().sum::<f64>() / scores.len() as f64;

        let mut sorted = scores.to_vec();
        sorted.sort_by_key(|&score| OrderedFloat(score));
        let mid = sorted.len() / 2;
        let median_score = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(HitInfo {
            read_count,
            read_indices,
            length,
            mean_score,
            median_score,
            min_score: sorted[0],
        })
    }
}

/// Settings for `BlastHits::from_records` and `BlastHits::filter_hits`
#[derive(Debug, Clone, Default)]
pub struct HitFilterParams {
    pub titles: TitleFilterParams,
    pub hit_info: HitInfoFilter,
}

/// Attribute used to order titles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    MinScore,
    MeanScore,
    MedianScore,
    ReadCount,
    Length,
    Title,
}

impl FromStr for SortKey {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "min" | "eMin" => Ok(SortKey::MinScore),
            "mean" | "eMean" => Ok(SortKey::MeanScore),
            "median" | "eMedian" => Ok(SortKey::MedianScore),
            "read-count" | "readCount" => Ok(SortKey::ReadCount),
            "length" => Ok(SortKey::Length),
            "title" => Ok(SortKey::Title),
            other => Err(SummaryError::Config(format!(
                "unknown sort key '{other}', expected one of min, mean, median, read-count, length, title"
            ))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            SortKey::MinScore => "min",
            SortKey::MeanScore => "mean",
            SortKey::MedianScore => "median",
            SortKey::ReadCount => "read-count",
            SortKey::Length => "length",
            SortKey::Title => "title",
        };
        write!(f, "{name}")
    }
}

/// Running state for one title during the record pass
struct TitleAccumulator {
    scores: Vec<f64>,
    read_count: usize,
    read_indices: BTreeSet<usize>,
    length: usize,
    decision: TitleDecision,
}

/// The set of subject titles retained from a search
#[derive(Debug, Clone, Default)]
pub struct BlastHits {
    titles: IndexMap<String, Arc<HitInfo>>,
    record_count: usize,
    pub(crate) plot_info: IndexMap<String, PlotInfo>,
    pub(crate) plot_params: Option<PlotParams>,
}

impl BlastHits {
    /// Empty set for a search with `record_count` records
    pub fn new(record_count: usize) -> Self {
        BlastHits {
            record_count,
            ..Default::default()
        }
    }

    /// Read every record once and keep the titles passing `params`.
    pub fn from_records(source: &dyn RecordSource, params: &HitFilterParams) -> Result<Self> {
        let mut title_filter = TitleFilter::new(&params.titles)?;
        let length_bounds = &params.hit_info;
        let mut accumulators: IndexMap<String, TitleAccumulator> = IndexMap::new();
        let mut record_count = 0;

        for (read_index, record) in source.records()?.enumerate() {
            let record = record?;
            record_count += 1;

            for alignment in &record.alignments {
                let Some(best) = alignment.hsps.first() else {
                    continue;
                };

                let decision = title_filter.accept(&alignment.title);
                if decision == TitleDecision::Reject {
                    continue;
                }

                if !accumulators.contains_key(&alignment.title) {
                    // Length is only checked the first time a title is seen
                    let length = alignment.length;
                    if length_bounds.min_sequence_length.is_some_and(|min| length < min)
                        || length_bounds.max_sequence_length.is_some_and(|max| length > max)
                    {
                        continue;
                    }
                    accumulators.insert(
                        alignment.title.clone(),
                        TitleAccumulator {
                            scores: Vec::new(),
                            read_count: 0,
                            read_indices: BTreeSet::new(),
                            length,
                            decision,
                        },
                    );
                }

                if let Some(accumulator) = accumulators.get_mut(&alignment.title) {
                    accumulator.scores.push(best.score);
                    accumulator.read_count += 1;
                    accumulator.read_indices.insert(read_index);
                }
            }
        }

        let hit_info_filter = params.hit_info.without_length_bounds();
        let mut result = BlastHits::new(record_count);

        for (title, accumulator) in accumulators.drain(..) {
            let Some(hit_info) = HitInfo::from_scores(
                &accumulator.scores,
                accumulator.read_count,
                accumulator.read_indices,
                accumulator.length,
            ) else {
                continue;
            };

            if accumulator.decision == TitleDecision::WhitelistAccept
                || hit_info_filter.accept(&hit_info)
            {
                result.add_hit(title, Arc::new(hit_info))?;
            }
        }

        Ok(result)
    }

    /// Re-filter already aggregated titles.
    ///
    /// The returned set shares `HitInfo` values with `self` and carries no
    /// plot info.
    pub fn filter_hits(&self, params: &HitFilterParams) -> Result<BlastHits> {
        let mut title_filter = TitleFilter::new(&params.titles)?;
        let mut result = BlastHits::new(self.record_count);

        for (title, hit_info) in &self.titles {
            let keep = match title_filter.accept(title) {
                TitleDecision::WhitelistAccept => true,
                TitleDecision::DefaultAccept => params.hit_info.accept(hit_info),
                TitleDecision::Reject => false,
            };
            if keep {
                result.add_hit(title.clone(), Arc::clone(hit_info))?;
            }
        }

        Ok(result)
    }

    pub fn add_hit(&mut self, title: String, hit_info: Arc<HitInfo>) -> Result<()> {
        if self.titles.contains_key(&title) {
            return Err(SummaryError::DuplicateTitle(title));
        }
        self.titles.insert(title, hit_info);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Number of records read by the aggregating pass
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn contains(&self, title: &str) -> bool {
        self.titles.contains_key(title)
    }

    pub fn hit_info(&self, title: &str) -> Option<&Arc<HitInfo>> {
        self.titles.get(title)
    }

    /// Titles with their hit info, in first-seen order
    pub fn titles(&self) -> impl Iterator<Item = (&str, &Arc<HitInfo>)> {
        self.titles.iter().map(|(title, info)| (title.as_str(), info))
    }

    pub fn plot_info(&self, title: &str) -> Option<&PlotInfo> {
        self.plot_info.get(title)
    }

    /// Parameters of the last `compute_plot_info` call
    pub fn plot_params(&self) -> Option<&PlotParams> {
        self.plot_params.as_ref()
    }

    /// Titles ordered by `key`, ties broken by title.
    ///
    /// Scores sort best (lowest) first; read count and length sort largest
    /// first.
    pub fn sort_titles(&self, key: SortKey) -> Vec<&str> {
        let mut titles: Vec<(&str, &HitInfo)> = self
            .titles
            .iter()
            .map(|(title, info)| (title.as_str(), info.as_ref()))
            .collect();

        match key {
            SortKey::MinScore => {
                titles.sort_by_key(|&(title, info)| (OrderedFloat(info.min_score), title))
            }
            SortKey::MeanScore => {
                titles.sort_by_key(|&(title, info)| (OrderedFloat(info.mean_score), title))
            }
            SortKey::MedianScore => {
                titles.sort_by_key(|&(title, info)| (OrderedFloat(info.median_score), title))
            }
            SortKey::ReadCount => titles.sort_by(|a, b| {
                b.1.read_count
                    .cmp(&a.1.read_count)
                    .then_with(|| a.0.cmp(b.0))
            }),
            SortKey::Length => {
                titles.sort_by(|a, b| b.1.length.cmp(&a.1.length).then_with(|| a.0.cmp(b.0)))
            }
            SortKey::Title => titles.sort_by_key(|&(title, _)| title),
        }

        titles.into_iter().map(|(title, _)| title).collect()
    }
}
