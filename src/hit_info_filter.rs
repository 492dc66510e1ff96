use crate::hits::HitInfo;

/// Thresholds on a title's aggregated hit statistics. Unset thresholds do
/// not constrain anything.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HitInfoFilter {
    pub min_sequence_length: Option<usize>,
    pub max_sequence_length: Option<usize>,
    pub min_matching_reads: Option<usize>,
    pub max_mean_score: Option<f64>,
    pub max_median_score: Option<f64>,
    /// At least one read must score at or below this
    pub with_score_better_than: Option<f64>,
}

impl HitInfoFilter {
    pub fn accept(&self, hit_info: &HitInfo) -> bool {
        if let Some(min) = self.min_sequence_length {
            if hit_info.length < min {
                return false;
            }
        }
        if let Some(max) = self.max_sequence_length {
            if hit_info.length > max {
                return false;
            }
        }
        if let Some(min) = self.min_matching_reads {
            if hit_info.read_count < min {
                return false;
            }
        }
        if let Some(max) = self.max_mean_score {
            if hit_info.mean_score > max {
                return false;
            }
        }
        if let Some(max) = self.max_median_score {
            if hit_info.median_score > max {
                return false;
            }
        }
        if let Some(bound) = self.with_score_better_than {
            if hit_info.min_score > bound {
                return false;
            }
        }
        true
    }

    /// Same thresholds without the sequence length bounds
    pub fn without_length_bounds(&self) -> Self {
        HitInfoFilter {
            min_sequence_length: None,
            max_sequence_length: None,
            ..*self
        }
    }
}
