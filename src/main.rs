use anyhow::{Context, Result};
use clap::Parser;
use hitsummary::hits::{BlastHits, HitFilterParams, SortKey};
use hitsummary::hit_info_filter::HitInfoFilter;
use hitsummary::plot::PlotParams;
use hitsummary::records::{FaiLengths, QueryLengths};
use hitsummary::tabular::{open_tabular_input, TabularRecords};
use hitsummary::title_filter::TitleFilterParams;
use log::{info, warn};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::time::Instant;

/// Parse a number that may have metric suffix (k/K=1000, m/M=1e6, g/G=1e9)
fn parse_metric_number(s: &str) -> Result<usize, String> {
    if s.is_empty() {
        return Err("Empty string".to_string());
    }

    let (num_part, suffix) = match s.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (&s[..s.len() - c.len_utf8()], Some(c)),
        _ => (s, None),
    };

    let base: f64 = num_part
        .parse()
        .map_err(|e| format!("Invalid number: {e}"))?;

    let multiplier = match suffix {
        Some('k') | Some('K') => 1000.0,
        Some('m') | Some('M') => 1_000_000.0,
        Some('g') | Some('G') => 1_000_000_000.0,
        Some(c) => {
            return Err(format!(
                "Unknown suffix '{c}'. Use k/K (1000), m/M (1e6), or g/G (1e9)"
            ))
        }
        None => 1.0,
    };

    let result = base * multiplier;

    if result < 0.0 || result > usize::MAX as f64 {
        return Err(format!("Value {result} out of range"));
    }

    Ok(result as usize)
}

/// hitsummary - Summarize sequence-similarity search hits per subject
///
/// Reads BLAST tabular output with columns
/// "qseqid qlen stitle slen evalue qstart qend sstart send qframe sframe",
/// keeps the interesting subjects and reports their statistics and plot extents
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Input BLAST tabular file, optionally bgzipped (stdin if not specified)
    #[clap(short = 'i', long = "input")]
    input: Option<String>,

    /// Output TSV file (stdout if not specified)
    #[clap(short = 'o', long = "output")]
    output: Option<String>,

    /// FASTA index (.fai) of the queries; lengths are looked up by query name
    #[clap(long = "fai")]
    fai: Option<String>,

    /// Only read this many query records
    #[clap(long = "limit")]
    limit: Option<usize>,

    /// Subject titles that are always acceptable
    #[clap(long = "whitelist", num_args = 1..)]
    whitelist: Vec<String>,

    /// Subject titles that are never acceptable
    #[clap(long = "blacklist", num_args = 1..)]
    blacklist: Vec<String>,

    /// Regex subject titles must match (case-insensitive)
    #[clap(long = "title-regex")]
    title_regex: Option<String>,

    /// Regex subject titles must not match (case-insensitive)
    #[clap(long = "negative-title-regex")]
    negative_title_regex: Option<String>,

    /// Truncate titles at this string and skip titles whose truncated form was already seen
    #[clap(long = "truncate-titles-after")]
    truncate_titles_after: Option<String>,

    /// Subjects shorter than this are elided
    #[clap(long = "min-sequence-len", value_parser = parse_metric_number)]
    min_sequence_len: Option<usize>,

    /// Subjects longer than this are elided
    #[clap(long = "max-sequence-len", value_parser = parse_metric_number)]
    max_sequence_len: Option<usize>,

    /// Subjects matched by fewer reads are elided
    #[clap(long = "min-matching-reads")]
    min_matching_reads: Option<usize>,

    /// Subjects with a greater mean e-value are elided
    #[clap(long = "max-mean-e-value")]
    max_mean_e_value: Option<f64>,

    /// Subjects with a greater median e-value are elided
    #[clap(long = "max-median-e-value")]
    max_median_e_value: Option<f64>,

    /// Subjects without at least one e-value this good are elided
    #[clap(long = "with-e-better-than")]
    with_e_better_than: Option<f64>,

    /// HSPs with e-values greater than or equal to this are not plotted
    #[clap(long = "e-cutoff", default_value = "1.0")]
    e_cutoff: f64,

    /// Maximum number of HSPs plotted per subject per read
    #[clap(long = "max-hsps-per-hit")]
    max_hsps_per_hit: Option<usize>,

    /// Reads starting before this subject offset are not plotted
    #[clap(long = "min-start")]
    min_start: Option<i64>,

    /// Reads ending after this subject offset are not plotted
    #[clap(long = "max-stop")]
    max_stop: Option<i64>,

    /// Compress subject stretches without reads logarithmically
    #[clap(long = "log-linear-x-axis")]
    log_linear_x_axis: bool,

    /// Logarithm base for --log-linear-x-axis
    #[clap(long = "log-base", default_value = "1.1")]
    log_base: f64,

    /// Give zero e-values random (very good) values instead of successive ones
    #[clap(long = "randomize-zero-e-values")]
    randomize_zero_e_values: bool,

    /// Plot e-value ranks instead of e-values
    #[clap(long = "rank-e-values")]
    rank_e_values: bool,

    /// Seed for --randomize-zero-e-values
    #[clap(long = "seed")]
    seed: Option<u64>,

    /// Order of output rows: min, mean, median, read-count, length, title
    #[clap(long = "sort-on", default_value = "min")]
    sort_on: String,

    /// Only report the retained subjects, without plot extents
    #[clap(long = "early-exit")]
    early_exit: bool,

    /// Quiet mode (warnings and errors only)
    #[clap(long = "quiet")]
    quiet: bool,
}

fn to_set(titles: &[String]) -> Option<HashSet<String>> {
    if titles.is_empty() {
        None
    } else {
        Some(titles.iter().cloned().collect())
    }
}

impl Args {
    fn hit_filter_params(&self) -> HitFilterParams {
        HitFilterParams {
            titles: TitleFilterParams {
                whitelist: to_set(&self.whitelist),
                blacklist: to_set(&self.blacklist),
                positive_regex: self.title_regex.clone(),
                negative_regex: self.negative_title_regex.clone(),
                truncate_after: self.truncate_titles_after.clone(),
            },
            hit_info: HitInfoFilter {
                min_sequence_length: self.min_sequence_len,
                max_sequence_length: self.max_sequence_len,
                min_matching_reads: self.min_matching_reads,
                max_mean_score: self.max_mean_e_value,
                max_median_score: self.max_median_e_value,
                with_score_better_than: self.with_e_better_than,
            },
        }
    }

    fn plot_params(&self) -> PlotParams {
        PlotParams {
            score_cutoff: Some(self.e_cutoff),
            max_hsps_per_hit: self.max_hsps_per_hit,
            min_start: self.min_start,
            max_stop: self.max_stop,
            log_linear_axis: self.log_linear_x_axis,
            log_base: self.log_base,
            randomize_zero_scores: self.randomize_zero_e_values,
            rank_scores: self.rank_e_values,
            random_seed: self.seed,
        }
    }
}

/// Read query lengths, keyed by query name, from a FASTA index
fn read_fai_lengths(path: &str) -> Result<FaiLengths> {
    let reader = open_tabular_input(path)?;
    let lengths =
        FaiLengths::from_reader(reader).with_context(|| format!("Failed to read {path}"))?;
    info!("Read {} query lengths from {path}", lengths.len());
    Ok(lengths)
}

fn write_report(
    out: &mut dyn Write,
    hits: &BlastHits,
    sort_on: SortKey,
    with_plot: bool,
) -> Result<()> {
    if with_plot {
        writeln!(
            out,
            "#title\tlength\treads\tmin_e\tmean_e\tmedian_e\titems\thsps\tskipped\tmin_x\tmax_x\tmax_y"
        )?;
    } else {
        writeln!(out, "#title\tlength\treads\tmin_e\tmean_e\tmedian_e")?;
    }

    for title in hits.sort_titles(sort_on) {
        let Some(info) = hits.hit_info(title) else {
            continue;
        };
        write!(
            out,
            "{title}\t{}\t{}\t{:e}\t{:e}\t{:e}",
            info.length, info.read_count, info.min_score, info.mean_score, info.median_score
        )?;
        if with_plot {
            match hits.plot_info(title) {
                Some(plot) => write!(
                    out,
                    "\t{}\t{}\t{}\t{:.2}\t{:.2}\t{}",
                    plot.items.len(),
                    plot.hsp_total,
                    plot.normalization_failures,
                    plot.min_x,
                    plot.max_x,
                    plot.max_score_including_zeros
                        .map(|y| format!("{y:.2}"))
                        .unwrap_or_else(|| "NA".to_string())
                )?,
                None => write!(out, "\t0\t0\t0\tNA\tNA\tNA")?,
            }
        }
        writeln!(out)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(if args.quiet { "warn" } else { "info" }),
    )
    .init();

    let sort_on: SortKey = args.sort_on.parse()?;

    // Handle input: if stdin, save to temp file for two-pass processing
    let (_input_temp, input_path) = if let Some(ref path) = args.input {
        (None, path.clone())
    } else {
        let mut temp = tempfile::NamedTempFile::new()?;
        {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                writeln!(temp, "{}", line?)?;
            }
            temp.flush()?;
        }
        let path = temp.path().to_string_lossy().into_owned();
        (Some(temp), path)
    };

    let source = TabularRecords::new(&input_path).with_limit(args.limit);

    let start = Instant::now();
    let mut hits = BlastHits::from_records(&source, &args.hit_filter_params())
        .with_context(|| format!("Failed to summarize hits in {input_path}"))?;
    info!(
        "Read {} records, {} interesting subject{} in {:.2?}",
        hits.record_count(),
        hits.len(),
        if hits.len() == 1 { "" } else { "s" },
        start.elapsed()
    );

    if hits.is_empty() {
        warn!("No interesting hits found. Relax your search!");
    }

    let with_plot = !args.early_exit && !hits.is_empty();
    if with_plot {
        let lengths = args.fai.as_deref().map(read_fai_lengths).transpose()?;
        let start = Instant::now();
        hits.compute_plot_info(
            &source,
            lengths.as_ref().map(|l| l as &dyn QueryLengths),
            &args.plot_params(),
        )
        .context("Failed to compute plot info")?;

        let skipped: usize = hits
            .titles()
            .filter_map(|(title, _)| hits.plot_info(title))
            .map(|plot| plot.normalization_failures)
            .sum();
        if skipped > 0 {
            warn!("Skipped {skipped} HSPs with inconsistent coordinates");
        }
        info!("Computed plot info in {:.2?}", start.elapsed());
    }

    let mut output: Box<dyn Write> = if let Some(ref path) = args.output {
        Box::new(io::BufWriter::new(std::fs::File::create(path)?))
    } else {
        Box::new(io::BufWriter::new(io::stdout()))
    };
    write_report(output.as_mut(), &hits, sort_on, with_plot)?;
    output.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric_number() {
        assert_eq!(parse_metric_number("10k"), Ok(10_000));
        assert_eq!(parse_metric_number("2M"), Ok(2_000_000));
        assert_eq!(parse_metric_number("150"), Ok(150));
        assert!(parse_metric_number("").is_err());
        assert!(parse_metric_number("5x").is_err());
        assert!(parse_metric_number("-5").is_err());
    }

    #[test]
    fn test_args_to_params() {
        let args = Args::parse_from([
            "hitsummary",
            "--whitelist",
            "a",
            "b",
            "--min-matching-reads",
            "3",
            "--rank-e-values",
            "--min-sequence-len",
            "1k",
        ]);
        let params = args.hit_filter_params();
        assert_eq!(params.titles.whitelist.map(|w| w.len()), Some(2));
        assert!(params.titles.blacklist.is_none());
        assert_eq!(params.hit_info.min_matching_reads, Some(3));
        assert_eq!(params.hit_info.min_sequence_length, Some(1000));

        let plot = args.plot_params();
        assert!(plot.rank_scores);
        assert_eq!(plot.score_cutoff, Some(1.0));
        assert_eq!(plot.log_base, 1.1);
    }
}
