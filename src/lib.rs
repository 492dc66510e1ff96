// Library exports for hitsummary
pub mod error;
pub mod hit_info_filter;
pub mod hits;
pub mod hsp;
pub mod intervals;
pub mod offsets;
pub mod plot;
pub mod records;
pub mod tabular;
pub mod title_filter;

pub use error::{HspError, SummaryError};
pub use hit_info_filter::HitInfoFilter;
pub use hits::{BlastHits, HitFilterParams, HitInfo, SortKey};
pub use plot::{PlotInfo, PlotParams, PlotScore};
pub use records::{
    Alignment, FaiLengths, Hsp, InMemoryRecords, QueryLengths, Record, RecordSource,
};
pub use title_filter::{TitleDecision, TitleFilter, TitleFilterParams};
